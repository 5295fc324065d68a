use thiserror::Error;

pub type Result<T, E = ChunkedError> = std::result::Result<T, E>;

#[derive(Error, Debug)]
pub enum ChunkedError {
    #[error("unknown tarball type: {0}")]
    UnknownEntryType(u8),
    #[error("manifest encoding: {0}")]
    Serialization(#[source] Box<dyn std::error::Error + Send + Sync>),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("blob too small: {len} bytes")]
    BlobTooSmall { len: usize },
    #[error("invalid magic number")]
    InvalidMagic,
    #[error("manifest checksum annotation {0:?} not found")]
    MissingChecksum(String),
    #[error("malformed annotation {key:?}: {value:?}")]
    MalformedAnnotation { key: String, value: String },

    #[error("skippable frame payload too large: {0} bytes")]
    FrameTooLarge(usize),
    #[error("digest mismatch: expected {expected}, got {actual}")]
    DigestMismatch { expected: String, actual: String },
    #[error("invalid digest {0:?}")]
    InvalidDigest(String),
    #[error("unsupported manifest type {0}")]
    UnsupportedManifestType(u64),
    #[error("unsupported TOC version {0}")]
    UnsupportedTocVersion(i64),
    #[error("{what} range {offset}+{length} outside blob of {blob_len} bytes")]
    OutOfBounds { what: &'static str, offset: u64, length: u64, blob_len: usize },
    #[error("{what} too large: {size} bytes (limit {limit})")]
    LimitExceeded { what: &'static str, size: u64, limit: u64 },
    #[error("invalid TOC: {0}")]
    InvalidToc(String),
}

impl From<serde_json::Error> for ChunkedError {
    fn from(e: serde_json::Error) -> Self {
        ChunkedError::Serialization(Box::new(e))
    }
}
