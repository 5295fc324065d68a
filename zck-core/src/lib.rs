pub mod annotations;
pub mod digest;
pub mod error;
pub mod footer;
pub mod frame;
pub mod reader;
pub mod toc;
pub mod types;
pub mod writer;

/// zstd level used when the caller has no preference.
pub const DEFAULT_COMPRESSION_LEVEL: i32 = 3;
