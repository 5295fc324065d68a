//! Fixed 64-byte zstd:chunked footer.
//!
//! Layout, all fields little-endian u64:
//! manifest offset, compressed length, uncompressed length, manifest type,
//! tar-split offset, compressed length, uncompressed length, then the
//! 8-byte [`ZSTD_CHUNKED_FRAME_MAGIC`].

use serde::Serialize;

use crate::error::{ChunkedError, Result};

/// Footer size understood by this implementation. Newer format revisions may
/// grow the footer; anything else is rejected.
pub const FOOTER_SIZE_SUPPORTED: usize = 64;

/// Trailing magic of the footer payload ("GNUlInUx").
pub const ZSTD_CHUNKED_FRAME_MAGIC: [u8; 8] = [0x47, 0x4e, 0x55, 0x6c, 0x49, 0x6e, 0x55, 0x78];

/// Manifest type for a CRFS-compatible TOC.
pub const MANIFEST_TYPE_CRFS: u64 = 1;

/// Digests recovered alongside the footer from layer annotations.
/// The binary footer never stores these.
#[derive(Serialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct FooterChecksums {
    pub manifest: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tar_split: Option<String>,
}

/// Everything recorded by the zstd:chunked footer.
#[derive(Serialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct FooterData {
    pub manifest_type: u64,

    pub offset: u64,
    pub length_compressed: u64,
    pub length_uncompressed: u64,

    pub offset_tar_split: u64,
    pub length_compressed_tar_split: u64,
    pub length_uncompressed_tar_split: u64,

    /// Only set when the footer was rebuilt from annotations.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checksums: Option<FooterChecksums>,
}

impl FooterData {
    /// Copy of the footer without the annotation-only checksums, i.e. exactly
    /// what the binary encoding can represent.
    pub fn without_checksums(&self) -> Self {
        FooterData { checksums: None, ..self.clone() }
    }

    pub fn has_tar_split(&self) -> bool {
        self.length_compressed_tar_split != 0
    }
}

/// Encode the footer into its fixed binary form. Checksums are not stored.
pub fn encode(footer: &FooterData) -> [u8; FOOTER_SIZE_SUPPORTED] {
    let mut out = [0u8; FOOTER_SIZE_SUPPORTED];
    let fields = [
        footer.offset,
        footer.length_compressed,
        footer.length_uncompressed,
        footer.manifest_type,
        footer.offset_tar_split,
        footer.length_compressed_tar_split,
        footer.length_uncompressed_tar_split,
    ];
    for (i, v) in fields.iter().enumerate() {
        out[8 * i..8 * (i + 1)].copy_from_slice(&v.to_le_bytes());
    }
    out[8 * 7..].copy_from_slice(&ZSTD_CHUNKED_FRAME_MAGIC);
    out
}

/// Decode a footer. `footer` must be exactly the footer window: the magic is
/// checked against its last 8 bytes and the fields are read from its start.
pub fn decode(footer: &[u8]) -> Result<FooterData> {
    if footer.len() < FOOTER_SIZE_SUPPORTED {
        return Err(ChunkedError::BlobTooSmall { len: footer.len() });
    }
    if footer[footer.len() - ZSTD_CHUNKED_FRAME_MAGIC.len()..] != ZSTD_CHUNKED_FRAME_MAGIC {
        return Err(ChunkedError::InvalidMagic);
    }
    let field = |i: usize| {
        let mut b = [0u8; 8];
        b.copy_from_slice(&footer[8 * i..8 * (i + 1)]);
        u64::from_le_bytes(b)
    };
    Ok(FooterData {
        offset: field(0),
        length_compressed: field(1),
        length_uncompressed: field(2),
        manifest_type: field(3),
        offset_tar_split: field(4),
        length_compressed_tar_split: field(5),
        length_uncompressed_tar_split: field(6),
        checksums: None,
    })
}
