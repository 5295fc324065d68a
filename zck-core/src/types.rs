use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{ChunkedError, Result};

// tar typeflag bytes
const TAR_TYPE_REG: u8 = b'0';
const TAR_TYPE_REGA: u8 = b'\0';
const TAR_TYPE_LINK: u8 = b'1';
const TAR_TYPE_SYMLINK: u8 = b'2';
const TAR_TYPE_CHAR: u8 = b'3';
const TAR_TYPE_BLOCK: u8 = b'4';
const TAR_TYPE_DIR: u8 = b'5';
const TAR_TYPE_FIFO: u8 = b'6';

/// Semantic type of a TOC entry, serialized as its lowercase tag.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum EntryType {
    Reg,
    Chunk,
    Hardlink,
    Char,
    Block,
    Dir,
    Fifo,
    Symlink,
}

impl EntryType {
    /// Map a tar typeflag to its entry type. `chunk` has no tar counterpart.
    pub fn from_tar_type(t: u8) -> Result<Self> {
        match t {
            TAR_TYPE_REG | TAR_TYPE_REGA => Ok(EntryType::Reg),
            TAR_TYPE_LINK => Ok(EntryType::Hardlink),
            TAR_TYPE_SYMLINK => Ok(EntryType::Symlink),
            TAR_TYPE_CHAR => Ok(EntryType::Char),
            TAR_TYPE_BLOCK => Ok(EntryType::Block),
            TAR_TYPE_DIR => Ok(EntryType::Dir),
            TAR_TYPE_FIFO => Ok(EntryType::Fifo),
            _ => Err(ChunkedError::UnknownEntryType(t)),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EntryType::Reg => "reg",
            EntryType::Chunk => "chunk",
            EntryType::Hardlink => "hardlink",
            EntryType::Char => "char",
            EntryType::Block => "block",
            EntryType::Dir => "dir",
            EntryType::Fifo => "fifo",
            EntryType::Symlink => "symlink",
        }
    }
}

impl fmt::Display for EntryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Shorthand for [`EntryType::from_tar_type`].
pub fn get_type(t: u8) -> Result<EntryType> {
    EntryType::from_tar_type(t)
}

/// Kind of range a chunk descriptor covers. `Data` is the empty string on the wire.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ChunkType {
    #[default]
    #[serde(rename = "", alias = "data")]
    Data,
    #[serde(rename = "zeros")]
    Zeros,
}

impl ChunkType {
    pub fn is_data(&self) -> bool {
        matches!(self, ChunkType::Data)
    }
}
