use crate::annotations::{read_footer_from_annotations, Annotations};
use crate::digest::verify_digest;
use crate::error::{ChunkedError, Result};
use crate::footer::{self, FooterData, FOOTER_SIZE_SUPPORTED, MANIFEST_TYPE_CRFS};
use crate::frame::{read_skippable_frame_header, SKIPPABLE_FRAME_HEADER_LEN};
use crate::toc::Toc;

/// Caps applied before allocating or decoding anything a footer points at.
#[derive(Clone, Copy, Debug)]
pub struct ReadLimits {
    pub max_compressed_bytes: u64,
    pub max_uncompressed_bytes: u64,
    pub max_entries: usize,
}

impl Default for ReadLimits {
    fn default() -> Self {
        Self {
            max_compressed_bytes: 64 * 1024 * 1024,
            max_uncompressed_bytes: 256 * 1024 * 1024,
            max_entries: 5_000_000,
        }
    }
}

/// A layer opened from its blob: footer, verified TOC and the raw tar-split.
#[derive(Debug)]
pub struct Layer<'a> {
    pub footer: FooterData,
    pub toc: Toc,
    pub tar_split: Option<&'a [u8]>,
}

/// The last [`FOOTER_SIZE_SUPPORTED`] bytes of `blob`.
pub fn footer_window(blob: &[u8]) -> Result<&[u8]> {
    if blob.len() < FOOTER_SIZE_SUPPORTED {
        return Err(ChunkedError::BlobTooSmall { len: blob.len() });
    }
    Ok(&blob[blob.len() - FOOTER_SIZE_SUPPORTED..])
}

/// Locate and decode the footer stored in the final skippable frame of `blob`.
pub fn read_footer_from_blob(blob: &[u8]) -> Result<FooterData> {
    let frame_len = FOOTER_SIZE_SUPPORTED + SKIPPABLE_FRAME_HEADER_LEN as usize;
    if blob.len() < frame_len {
        return Err(ChunkedError::BlobTooSmall { len: blob.len() });
    }
    let header = &blob[blob.len() - frame_len..blob.len() - FOOTER_SIZE_SUPPORTED];
    match read_skippable_frame_header(header) {
        Some(n) if n as usize == FOOTER_SIZE_SUPPORTED => {}
        _ => return Err(ChunkedError::InvalidMagic),
    }
    let footer = footer::decode(footer_window(blob)?)?;
    log::debug!(
        "footer: manifest at {}+{}, tar-split at {}+{}",
        footer.offset,
        footer.length_compressed,
        footer.offset_tar_split,
        footer.length_compressed_tar_split
    );
    Ok(footer)
}

fn slice_range<'a>(blob: &'a [u8], what: &'static str, offset: u64, length: u64) -> Result<&'a [u8]> {
    let out_of_bounds = || ChunkedError::OutOfBounds { what, offset, length, blob_len: blob.len() };
    let end = offset.checked_add(length).ok_or_else(out_of_bounds)?;
    if end > blob.len() as u64 {
        return Err(out_of_bounds());
    }
    Ok(&blob[offset as usize..end as usize])
}

fn check_limit(what: &'static str, size: u64, limit: u64) -> Result<()> {
    if size > limit {
        return Err(ChunkedError::LimitExceeded { what, size, limit });
    }
    Ok(())
}

/// Extract, verify, decompress and parse the TOC the footer points at.
///
/// The manifest digest is only checked when the footer carries checksums,
/// i.e. when it was rebuilt from annotations.
pub fn read_manifest(blob: &[u8], footer: &FooterData, limits: &ReadLimits) -> Result<Toc> {
    if footer.manifest_type != MANIFEST_TYPE_CRFS {
        return Err(ChunkedError::UnsupportedManifestType(footer.manifest_type));
    }
    check_limit("manifest", footer.length_compressed, limits.max_compressed_bytes)?;
    check_limit("uncompressed manifest", footer.length_uncompressed, limits.max_uncompressed_bytes)?;

    let compressed = slice_range(blob, "manifest", footer.offset, footer.length_compressed)?;
    if let Some(sums) = &footer.checksums {
        verify_digest(&sums.manifest, compressed)?;
    }

    let capacity = usize::try_from(footer.length_uncompressed).map_err(|_| ChunkedError::LimitExceeded {
        what: "uncompressed manifest",
        size: footer.length_uncompressed,
        limit: usize::MAX as u64,
    })?;
    let manifest = zstd::bulk::decompress(compressed, capacity)
        .map_err(|e| ChunkedError::Serialization(Box::new(e)))?;
    if manifest.len() as u64 != footer.length_uncompressed {
        return Err(ChunkedError::InvalidToc(format!(
            "manifest is {} bytes, footer says {}",
            manifest.len(),
            footer.length_uncompressed
        )));
    }

    let toc: Toc = serde_json::from_slice(&manifest)?;
    if toc.entries.len() > limits.max_entries {
        return Err(ChunkedError::LimitExceeded {
            what: "TOC entries",
            size: toc.entries.len() as u64,
            limit: limits.max_entries as u64,
        });
    }
    toc.validate()?;
    Ok(toc)
}

/// The compressed tar-split payload, or `None` if the footer records none.
pub fn read_tar_split<'a>(
    blob: &'a [u8],
    footer: &FooterData,
    limits: &ReadLimits,
) -> Result<Option<&'a [u8]>> {
    if !footer.has_tar_split() {
        return Ok(None);
    }
    check_limit("tar-split", footer.length_compressed_tar_split, limits.max_compressed_bytes)?;
    let data = slice_range(
        blob,
        "tar-split",
        footer.offset_tar_split,
        footer.length_compressed_tar_split,
    )?;
    if let Some(expected) = footer.checksums.as_ref().and_then(|c| c.tar_split.as_deref()) {
        verify_digest(expected, data)?;
    }
    Ok(Some(data))
}

/// Open a layer blob. With annotations the footer is rebuilt from them and
/// digests are verified; otherwise it is read from the blob tail.
pub fn open_layer<'a>(
    blob: &'a [u8],
    annotations: Option<&Annotations>,
    limits: &ReadLimits,
) -> Result<Layer<'a>> {
    let footer = match annotations {
        Some(a) => read_footer_from_annotations(a)?,
        None => read_footer_from_blob(blob)?,
    };
    let toc = read_manifest(blob, &footer, limits)?;
    let tar_split = read_tar_split(blob, &footer, limits)?;
    Ok(Layer { footer, toc, tar_split })
}
