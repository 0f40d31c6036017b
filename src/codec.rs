use crate::algorithm::Algorithm;
use crate::error::{Error, Result};

/// Number of text characters produced for each raw digest byte.
pub const CHARS_PER_BYTE: usize = 2;

/// encode converts raw digest bytes into lowercase hex.
pub fn encode(raw: &[u8]) -> String {
    hex::encode(raw)
}

/// encoded_len is the text length of a digest of `width` raw bytes.
pub const fn encoded_len(width: usize) -> usize {
    CHARS_PER_BYTE * width
}

/// digest_len is the text length of any digest produced by `algorithm`,
/// known before the digest is computed.
pub const fn digest_len(algorithm: Algorithm) -> usize {
    encoded_len(algorithm.output_width())
}

/// write_terminated copies `text` into `out` followed by a single `0` byte.
///
/// `out` is left untouched when it cannot hold both. Returns the number of
/// text bytes written, terminator excluded.
pub fn write_terminated(text: &str, out: &mut [u8]) -> Result<usize> {
    let required = text.len() + 1;
    if out.len() < required {
        return Err(Error::BufferTooSmall {
            required,
            provided: out.len(),
        });
    }
    out[..text.len()].copy_from_slice(text.as_bytes());
    out[text.len()] = 0;
    Ok(text.len())
}
