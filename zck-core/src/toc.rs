use std::collections::BTreeMap;

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{ChunkedError, Result};
use crate::types::{ChunkType, EntryType};

/// TOC dialect written by this crate.
pub const TOC_VERSION: i64 = 1;

fn is_zero(v: &i64) -> bool {
    *v == 0
}

/// Some producers write an empty entry list as `null`.
fn null_as_empty<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<Vec<FileMetadata>, D::Error> {
    Ok(Option::<Vec<FileMetadata>>::deserialize(d)?.unwrap_or_default())
}

/// One archive entry. Field order is the JSON field order.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct FileMetadata {
    #[serde(rename = "type")]
    pub typ: EntryType,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "linkName", default, skip_serializing_if = "String::is_empty")]
    pub linkname: String,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub mode: i64,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub size: i64,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub uid: i64,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub gid: i64,
    #[serde(rename = "modtime", default, skip_serializing_if = "Option::is_none")]
    pub mod_time: Option<DateTime<FixedOffset>>,
    #[serde(rename = "accesstime", default, skip_serializing_if = "Option::is_none")]
    pub access_time: Option<DateTime<FixedOffset>>,
    #[serde(rename = "changetime", default, skip_serializing_if = "Option::is_none")]
    pub change_time: Option<DateTime<FixedOffset>>,
    #[serde(rename = "devMajor", default, skip_serializing_if = "is_zero")]
    pub devmajor: i64,
    #[serde(rename = "devMinor", default, skip_serializing_if = "is_zero")]
    pub devminor: i64,
    // BTreeMap keeps the serialized key order stable.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub xattrs: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub digest: String,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub offset: i64,
    #[serde(rename = "endOffset", default, skip_serializing_if = "is_zero")]
    pub end_offset: i64,

    #[serde(rename = "chunkSize", default, skip_serializing_if = "is_zero")]
    pub chunk_size: i64,
    #[serde(rename = "chunkOffset", default, skip_serializing_if = "is_zero")]
    pub chunk_offset: i64,
    #[serde(rename = "chunkDigest", default, skip_serializing_if = "String::is_empty")]
    pub chunk_digest: String,
    #[serde(rename = "chunkType", default, skip_serializing_if = "ChunkType::is_data")]
    pub chunk_type: ChunkType,
}

impl FileMetadata {
    /// Entry with the given type and name and every optional field empty.
    pub fn new(typ: EntryType, name: impl Into<String>) -> Self {
        FileMetadata {
            typ,
            name: name.into(),
            linkname: String::new(),
            mode: 0,
            size: 0,
            uid: 0,
            gid: 0,
            mod_time: None,
            access_time: None,
            change_time: None,
            devmajor: 0,
            devminor: 0,
            xattrs: BTreeMap::new(),
            digest: String::new(),
            offset: 0,
            end_offset: 0,
            chunk_size: 0,
            chunk_offset: 0,
            chunk_digest: String::new(),
            chunk_type: ChunkType::Data,
        }
    }

    pub fn is_chunk(&self) -> bool {
        self.typ == EntryType::Chunk
    }

    /// True when this entry carries a chunk descriptor (a `chunk` entry, or a
    /// `reg` entry describing its own first chunk).
    fn has_chunk_range(&self) -> bool {
        self.is_chunk() || self.chunk_size != 0
    }
}

/// Table of contents: format version plus entries in archive order.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Toc {
    pub version: i64,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub entries: Vec<FileMetadata>,
}

impl Toc {
    pub fn new(entries: Vec<FileMetadata>) -> Self {
        Toc { version: TOC_VERSION, entries }
    }

    /// Check the version and the chunk layout of every regular file.
    pub fn validate(&self) -> Result<()> {
        if self.version != TOC_VERSION {
            return Err(ChunkedError::UnsupportedTocVersion(self.version));
        }

        // (index of owning reg entry, its size, end of the last chunk seen)
        let mut owner: Option<(usize, i64, i64)> = None;
        for (i, e) in self.entries.iter().enumerate() {
            match e.typ {
                EntryType::Reg => owner = Some((i, e.size, 0)),
                EntryType::Chunk => {
                    if owner.is_none() {
                        return Err(ChunkedError::InvalidToc(format!(
                            "chunk entry {} ({:?}) has no preceding regular file",
                            i, e.name
                        )));
                    }
                }
                _ => {
                    owner = None;
                    continue;
                }
            }
            if !e.has_chunk_range() {
                continue;
            }
            let Some((reg_idx, size, cursor)) = owner.as_mut() else {
                continue;
            };
            if e.chunk_offset < 0 || e.chunk_size < 0 {
                return Err(ChunkedError::InvalidToc(format!(
                    "entry {} ({:?}) has a negative chunk range",
                    i, e.name
                )));
            }
            let end = e.chunk_offset.checked_add(e.chunk_size).ok_or_else(|| {
                ChunkedError::InvalidToc(format!("entry {} ({:?}) chunk range overflows", i, e.name))
            })?;
            if end > *size {
                return Err(ChunkedError::InvalidToc(format!(
                    "entry {} ({:?}) chunk {}+{} exceeds size {} of entry {}",
                    i, e.name, e.chunk_offset, e.chunk_size, size, reg_idx
                )));
            }
            if e.chunk_offset < *cursor {
                return Err(ChunkedError::InvalidToc(format!(
                    "entry {} ({:?}) chunk at {} overlaps previous chunk ending at {}",
                    i, e.name, e.chunk_offset, cursor
                )));
            }
            *cursor = end;
        }
        Ok(())
    }
}

impl Default for Toc {
    fn default() -> Self {
        Toc::new(Vec::new())
    }
}
