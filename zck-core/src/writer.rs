use std::io::Write;

use serde::Serialize;

use crate::annotations::{
    format_manifest_position, format_tar_split_position, Annotations, MANIFEST_CHECKSUM_KEY,
    MANIFEST_INFO_KEY, TAR_SPLIT_CHECKSUM_KEY, TAR_SPLIT_INFO_KEY,
};
use crate::digest::canonical_digest;
use crate::error::{ChunkedError, Result};
use crate::footer::{self, FooterData, MANIFEST_TYPE_CRFS};
use crate::frame::{append_skippable_frame, SKIPPABLE_FRAME_HEADER_LEN};
use crate::toc::{FileMetadata, TOC_VERSION};

/// Tar-split payload handed to the writer, already compressed by the caller.
#[derive(Clone, Debug, Default)]
pub struct TarSplitData {
    pub data: Vec<u8>,
    pub digest: String,
    pub uncompressed_size: u64,
}

/// zstd-compress `data` at `level`.
pub fn compress_with_level(data: &[u8], level: i32) -> Result<Vec<u8>> {
    zstd::stream::encode_all(data, level).map_err(|e| ChunkedError::Serialization(Box::new(e)))
}

/// Borrowed view with the same JSON shape as [`crate::toc::Toc`].
#[derive(Serialize)]
struct TocRef<'a> {
    version: i64,
    entries: &'a [FileMetadata],
}

/// Serialize the TOC for `entries` to its canonical JSON form.
pub fn serialize_toc(entries: &[FileMetadata]) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec(&TocRef { version: TOC_VERSION, entries })?)
}

/// Append the manifest, tar-split and footer frames to `dest`.
///
/// `offset` is the position in the blob where the first frame starts. The
/// annotations needed to locate both payloads without reading the blob tail
/// are stored into `out_annotations`. On error `dest` holds a partial write
/// and must be discarded.
pub fn write_zstd_chunked_manifest<W: Write>(
    dest: &mut W,
    out_annotations: &mut Annotations,
    offset: u64,
    tar_split: &TarSplitData,
    entries: &[FileMetadata],
    level: i32,
) -> Result<()> {
    let manifest_offset = offset + SKIPPABLE_FRAME_HEADER_LEN;

    let manifest = serialize_toc(entries)?;
    let compressed = compress_with_level(&manifest, level)?;
    let manifest_checksum = canonical_digest(&compressed);

    out_annotations.insert(MANIFEST_CHECKSUM_KEY.to_string(), manifest_checksum);
    out_annotations.insert(
        MANIFEST_INFO_KEY.to_string(),
        format_manifest_position(
            manifest_offset,
            compressed.len() as u64,
            manifest.len() as u64,
            MANIFEST_TYPE_CRFS,
        ),
    );
    append_skippable_frame(dest, &compressed)?;
    log::debug!(
        "wrote manifest at {} ({} bytes, {} uncompressed, {} entries)",
        manifest_offset,
        compressed.len(),
        manifest.len(),
        entries.len()
    );

    let tar_split_offset = manifest_offset + compressed.len() as u64 + SKIPPABLE_FRAME_HEADER_LEN;
    out_annotations.insert(TAR_SPLIT_CHECKSUM_KEY.to_string(), tar_split.digest.clone());
    out_annotations.insert(
        TAR_SPLIT_INFO_KEY.to_string(),
        format_tar_split_position(
            tar_split_offset,
            tar_split.data.len() as u64,
            tar_split.uncompressed_size,
        ),
    );
    append_skippable_frame(dest, &tar_split.data)?;
    log::debug!("wrote tar-split at {} ({} bytes)", tar_split_offset, tar_split.data.len());

    let footer = FooterData {
        manifest_type: MANIFEST_TYPE_CRFS,
        offset: manifest_offset,
        length_compressed: compressed.len() as u64,
        length_uncompressed: manifest.len() as u64,
        offset_tar_split: tar_split_offset,
        length_compressed_tar_split: tar_split.data.len() as u64,
        length_uncompressed_tar_split: tar_split.uncompressed_size,
        checksums: None,
    };
    append_skippable_frame(dest, &footer::encode(&footer))
}
