use std::io::Write;

use crate::error::{ChunkedError, Result};

/// Magic of the zstd skippable frame used for every out-of-band payload.
/// Decoders skip any frame in the 0x184D2A5? range using its declared length
/// (RFC 8478, section 3.1.2).
pub const SKIPPABLE_FRAME_MAGIC: [u8; 4] = [0x50, 0x2a, 0x4d, 0x18];

/// Magic (4) + little-endian payload length (4).
pub const SKIPPABLE_FRAME_HEADER_LEN: u64 = 8;

/// Write `data` to `dest` as one skippable frame. The payload is written
/// verbatim; compress it before calling if needed.
pub fn append_skippable_frame<W: Write>(dest: &mut W, data: &[u8]) -> Result<()> {
    let len = u32::try_from(data.len()).map_err(|_| ChunkedError::FrameTooLarge(data.len()))?;
    dest.write_all(&SKIPPABLE_FRAME_MAGIC)?;
    dest.write_all(&len.to_le_bytes())?;
    dest.write_all(data)?;
    Ok(())
}

/// Parse a skippable-frame header, returning the declared payload length.
/// Returns `None` if `header` is short or does not carry the magic.
pub fn read_skippable_frame_header(header: &[u8]) -> Option<u32> {
    if header.len() < SKIPPABLE_FRAME_HEADER_LEN as usize || header[..4] != SKIPPABLE_FRAME_MAGIC {
        return None;
    }
    let mut len4 = [0u8; 4];
    len4.copy_from_slice(&header[4..8]);
    Some(u32::from_le_bytes(len4))
}
