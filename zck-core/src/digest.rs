use sha2::{Digest, Sha256};

use crate::error::{ChunkedError, Result};

const SHA256_PREFIX: &str = "sha256:";

/// Canonical digest string (`sha256:<hex>`) of `data`.
pub fn canonical_digest(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    format!("{}{}", SHA256_PREFIX, hex::encode(hasher.finalize()))
}

/// Check `data` against an `algorithm:hex` digest string.
pub fn verify_digest(expected: &str, data: &[u8]) -> Result<()> {
    let Some(encoded) = expected.strip_prefix(SHA256_PREFIX) else {
        return Err(ChunkedError::InvalidDigest(expected.to_string()));
    };
    let mut want = [0u8; 32];
    hex::decode_to_slice(encoded, &mut want)
        .map_err(|_| ChunkedError::InvalidDigest(expected.to_string()))?;
    if encoded.bytes().any(|b| b.is_ascii_uppercase()) {
        return Err(ChunkedError::InvalidDigest(expected.to_string()));
    }
    let got = Sha256::digest(data);
    if got.as_slice() != want.as_slice() {
        return Err(ChunkedError::DigestMismatch {
            expected: expected.to_string(),
            actual: format!("{}{}", SHA256_PREFIX, hex::encode(got)),
        });
    }
    Ok(())
}
