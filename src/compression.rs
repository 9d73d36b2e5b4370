//! Best-effort decompression of tile payloads.
//!
//! Tiles may arrive raw, gzip-wrapped or zlib-wrapped depending on the
//! transport. The codec sniffs the magic bytes and either unwraps the
//! payload or passes it through unchanged. It is stateless and safe to call
//! concurrently on independent inputs.

use std::borrow::Cow;
use std::io::Read;

use flate2::read::{GzDecoder, ZlibDecoder};
use log::debug;

use crate::error::DecodeError;

/// Detects and undoes a deflate-family wrapper around `bytes`.
///
/// Returns the input unchanged (borrowed) when no compression header is
/// present. Fails with [`DecodeError::CorruptStream`] when a header is
/// present but the stream cannot be fully decompressed.
pub fn decompress(bytes: &[u8]) -> Result<Cow<'_, [u8]>, DecodeError> {
    if is_gzip(bytes) {
        debug!("tile payload is gzip compressed ({} bytes)", bytes.len());
        let mut decoder = GzDecoder::new(bytes);
        let mut decompressed = Vec::new();
        decoder.read_to_end(&mut decompressed)?;
        Ok(Cow::Owned(decompressed))
    } else if is_zlib(bytes) {
        debug!("tile payload is zlib compressed ({} bytes)", bytes.len());
        let mut decoder = ZlibDecoder::new(bytes);
        let mut decompressed = Vec::new();
        decoder.read_to_end(&mut decompressed)?;
        Ok(Cow::Owned(decompressed))
    } else {
        Ok(Cow::Borrowed(bytes))
    }
}

fn is_gzip(bytes: &[u8]) -> bool {
    bytes.len() > 2 && bytes[0..2] == [0x1F, 0x8B]
}

fn is_zlib(bytes: &[u8]) -> bool {
    // Deflate with a 32K window; the only variants produced in practice.
    bytes.len() > 2
        && bytes[0] == 0x78
        && matches!(bytes[1], 0x01 | 0x5E | 0x9C | 0xDA)
}
