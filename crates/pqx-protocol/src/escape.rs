//! Hex escape format for binary (`bytea`) data.
//!
//! The text form is the literal prefix `\x` followed by exactly two hex
//! digits per byte, with no separators. PostgreSQL emits this form for
//! `bytea` values when `bytea_output = 'hex'` and accepts it on input.
//!
//! Encoding always produces lowercase digits. Decoding accepts either case.
//!
//! Every direction comes in three shapes:
//!
//! - a size function, so callers can allocate exactly once;
//! - a caller-supplied buffer variant (`*_to_slice`) and a streaming
//!   [`BufMut`] variant (`*_to_buf`);
//! - an allocating convenience function.
//!
//! ```text
//! raw:     48 65 6c 6c 6f
//! escaped: \x48656c6c6f
//! ```

use bytes::BufMut;

use crate::error::EscapeError;

/// The two-byte prefix that starts every escaped value.
pub const ESCAPE_PREFIX: &[u8; 2] = b"\\x";

const HEX_DIGITS: &[u8; 16] = b"0123456789abcdef";

/// Translate a nibble (`0..16`) to its lowercase hex digit.
#[inline]
const fn hex_digit(nibble: u8) -> u8 {
    HEX_DIGITS[(nibble & 0x0f) as usize]
}

/// Translate a hex digit of either case to its nibble.
#[inline]
const fn nibble(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'a'..=b'f' => Some(10 + (c - b'a')),
        b'A'..=b'F' => Some(10 + (c - b'A')),
        _ => None,
    }
}

/// Buffer size needed by [`esc_bin_to_slice`] for `binary_len` input bytes.
///
/// This counts the prefix, two digits per byte and the trailing terminator
/// byte: `3 + 2 * binary_len`. The text itself is one byte shorter.
#[must_use]
pub const fn size_esc_bin(binary_len: usize) -> usize {
    2 + 2 * binary_len + 1
}

/// Number of bytes produced by decoding an escaped value of `escaped_len`.
///
/// Only meaningful for input that passes validation; shorter inputs yield 0.
#[must_use]
pub const fn size_unesc_bin(escaped_len: usize) -> usize {
    escaped_len.saturating_sub(2) / 2
}

/// Escape `data` into a caller-supplied buffer.
///
/// Writes the prefix, the hex digits and a trailing NUL terminator, and
/// returns the number of bytes written, which is always
/// [`size_esc_bin(data.len())`](size_esc_bin). Bytes past that point are
/// left untouched.
///
/// # Panics
///
/// Panics if `buffer` is shorter than `size_esc_bin(data.len())`.
pub fn esc_bin_to_slice(data: &[u8], buffer: &mut [u8]) -> usize {
    let needed = size_esc_bin(data.len());
    assert!(
        buffer.len() >= needed,
        "escape buffer too small: need {needed} bytes, have {}",
        buffer.len()
    );

    buffer[..2].copy_from_slice(ESCAPE_PREFIX);
    for (pair, &byte) in buffer[2..needed - 1].chunks_exact_mut(2).zip(data) {
        pair[0] = hex_digit(byte >> 4);
        pair[1] = hex_digit(byte & 0x0f);
    }
    buffer[needed - 1] = 0;

    needed
}

/// Escape `data` into any [`BufMut`], without a terminator.
///
/// Exactly `2 + 2 * data.len()` bytes are appended.
pub fn esc_bin_to_buf(data: &[u8], dst: &mut impl BufMut) {
    dst.put_slice(ESCAPE_PREFIX);
    for &byte in data {
        dst.put_u8(hex_digit(byte >> 4));
        dst.put_u8(hex_digit(byte & 0x0f));
    }
}

/// Escape `data` into a new string.
///
/// The result has no terminator and is exactly `2 + 2 * data.len()` bytes.
#[must_use]
pub fn esc_bin(data: &[u8]) -> String {
    let mut text = String::with_capacity(size_esc_bin(data.len()));
    text.push_str("\\x");
    for &byte in data {
        text.push(char::from(hex_digit(byte >> 4)));
        text.push(char::from(hex_digit(byte & 0x0f)));
    }
    text
}

/// Check length, parity and prefix; return the digit section.
fn validate(escaped: &[u8]) -> Result<&[u8], EscapeError> {
    let len = escaped.len();
    if len < 2 {
        return Err(EscapeError::Truncated { len });
    }
    if len % 2 != 0 {
        return Err(EscapeError::InvalidLength { len });
    }
    if &escaped[..2] != ESCAPE_PREFIX {
        return Err(EscapeError::MissingPrefix);
    }
    Ok(&escaped[2..])
}

/// Decode one hex pair starting at `offset` within the escaped input.
#[inline]
fn decode_pair(pair: &[u8], offset: usize) -> Result<u8, EscapeError> {
    let hi = nibble(pair[0]).ok_or(EscapeError::InvalidHexDigit {
        position: offset,
        byte: pair[0],
    })?;
    let lo = nibble(pair[1]).ok_or(EscapeError::InvalidHexDigit {
        position: offset + 1,
        byte: pair[1],
    })?;
    Ok((hi << 4) | lo)
}

/// Decode escaped text into a caller-supplied buffer.
///
/// Returns the number of bytes written, `size_unesc_bin(escaped.len())`.
/// On an invalid digit the buffer may hold a partially decoded prefix.
///
/// # Errors
///
/// Returns [`EscapeError::Truncated`], [`EscapeError::InvalidLength`],
/// [`EscapeError::MissingPrefix`] or [`EscapeError::InvalidHexDigit`] for
/// malformed input (checked in that order), and
/// [`EscapeError::BufferTooSmall`] when `buffer` cannot hold the output.
pub fn unesc_bin_to_slice(escaped: &[u8], buffer: &mut [u8]) -> Result<usize, EscapeError> {
    let digits = validate(escaped)?;
    let needed = digits.len() / 2;
    if buffer.len() < needed {
        return Err(EscapeError::BufferTooSmall {
            needed,
            available: buffer.len(),
        });
    }

    for (i, (pair, out)) in digits.chunks_exact(2).zip(buffer.iter_mut()).enumerate() {
        *out = decode_pair(pair, 2 + 2 * i)?;
    }

    Ok(needed)
}

/// Decode escaped text into any [`BufMut`].
///
/// Returns the number of bytes appended. On an invalid digit, the bytes
/// decoded before it have already been appended.
///
/// # Errors
///
/// Same validation errors as [`unesc_bin_to_slice`], minus
/// `BufferTooSmall`.
pub fn unesc_bin_to_buf(escaped: &[u8], dst: &mut impl BufMut) -> Result<usize, EscapeError> {
    let digits = validate(escaped)?;
    for (i, pair) in digits.chunks_exact(2).enumerate() {
        dst.put_u8(decode_pair(pair, 2 + 2 * i)?);
    }
    Ok(digits.len() / 2)
}

/// Decode escaped text into a new byte vector.
///
/// Accepts anything byte-like, so both `&str` and `&[u8]` work.
///
/// # Errors
///
/// See [`unesc_bin_to_slice`].
pub fn unesc_bin(escaped: impl AsRef<[u8]>) -> Result<Vec<u8>, EscapeError> {
    let escaped = escaped.as_ref();
    let mut out = Vec::with_capacity(size_unesc_bin(escaped.len()));
    unesc_bin_to_buf(escaped, &mut out)?;
    Ok(out)
}
