use std::collections::BTreeMap;

use crate::error::{ChunkedError, Result};
use crate::footer::{FooterChecksums, FooterData};

/// String annotations attached to a layer descriptor.
pub type Annotations = BTreeMap<String, String>;

pub const MANIFEST_CHECKSUM_KEY: &str = "io.github.containers.zstd-chunked.manifest-checksum";
pub const MANIFEST_INFO_KEY: &str = "io.github.containers.zstd-chunked.manifest-position";
pub const TAR_SPLIT_CHECKSUM_KEY: &str = "io.github.containers.zstd-chunked.tarsplit-checksum";
pub const TAR_SPLIT_INFO_KEY: &str = "io.github.containers.zstd-chunked.tarsplit-position";

/// `offset:lengthCompressed:lengthUncompressed:manifestType`
pub fn format_manifest_position(offset: u64, compressed: u64, uncompressed: u64, typ: u64) -> String {
    format!("{}:{}:{}:{}", offset, compressed, uncompressed, typ)
}

/// `offset:lengthCompressed:lengthUncompressed`
pub fn format_tar_split_position(offset: u64, compressed: u64, uncompressed: u64) -> String {
    format!("{}:{}:{}", offset, compressed, uncompressed)
}

/// Parse exactly `N` colon-separated unsigned decimal integers.
pub fn parse_position<const N: usize>(key: &str, value: &str) -> Result<[u64; N]> {
    let malformed = || ChunkedError::MalformedAnnotation {
        key: key.to_string(),
        value: value.to_string(),
    };
    let mut out = [0u64; N];
    let mut fields = value.split(':');
    for slot in out.iter_mut() {
        let f = fields.next().ok_or_else(malformed)?;
        if f.is_empty() || !f.bytes().all(|b| b.is_ascii_digit()) {
            return Err(malformed());
        }
        *slot = f.parse().map_err(|_| malformed())?;
    }
    if fields.next().is_some() {
        return Err(malformed());
    }
    Ok(out)
}

/// Rebuild the footer from layer annotations without touching the blob.
///
/// The manifest checksum and position are mandatory. Tar-split position is
/// optional; when present its checksum is picked up if available.
pub fn read_footer_from_annotations(annotations: &Annotations) -> Result<FooterData> {
    let manifest_checksum = match annotations.get(MANIFEST_CHECKSUM_KEY) {
        Some(v) if !v.is_empty() => v.clone(),
        _ => return Err(ChunkedError::MissingChecksum(MANIFEST_CHECKSUM_KEY.to_string())),
    };

    let info = annotations.get(MANIFEST_INFO_KEY).map(String::as_str).unwrap_or("");
    let [offset, length_compressed, length_uncompressed, manifest_type] =
        parse_position::<4>(MANIFEST_INFO_KEY, info)?;

    let mut footer = FooterData {
        manifest_type,
        offset,
        length_compressed,
        length_uncompressed,
        ..FooterData::default()
    };

    let mut tar_split_checksum = None;
    if let Some(info) = annotations.get(TAR_SPLIT_INFO_KEY) {
        let [offset, compressed, uncompressed] = parse_position::<3>(TAR_SPLIT_INFO_KEY, info)?;
        footer.offset_tar_split = offset;
        footer.length_compressed_tar_split = compressed;
        footer.length_uncompressed_tar_split = uncompressed;
        tar_split_checksum = annotations.get(TAR_SPLIT_CHECKSUM_KEY).filter(|v| !v.is_empty()).cloned();
    } else {
        log::debug!("no {} annotation, footer has no tar-split", TAR_SPLIT_INFO_KEY);
    }

    footer.checksums = Some(FooterChecksums { manifest: manifest_checksum, tar_split: tar_split_checksum });
    Ok(footer)
}
