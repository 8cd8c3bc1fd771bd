//! Escape codec error types.

use thiserror::Error;

/// Errors raised while decoding hex-escaped binary data.
///
/// Validation happens in a fixed order (length, parity, prefix, digits), so
/// a given input always produces the same variant.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum EscapeError {
    /// Input is shorter than the two-character `\x` prefix.
    #[error("binary data appears truncated ({len} bytes)")]
    Truncated {
        /// Length of the escaped input.
        len: usize,
    },

    /// Input length is odd, so it cannot be a prefix plus whole hex pairs.
    #[error("invalid escaped binary length: {len}")]
    InvalidLength {
        /// Length of the escaped input.
        len: usize,
    },

    /// Input does not start with `\x`.
    #[error("escaped binary data did not start with '\\x'")]
    MissingPrefix,

    /// A character after the prefix is not a hex digit.
    #[error("invalid hex digit {byte:#04x} at offset {position}")]
    InvalidHexDigit {
        /// Offset of the offending byte within the escaped input.
        position: usize,
        /// The offending byte.
        byte: u8,
    },

    /// Caller-supplied output buffer cannot hold the decoded bytes.
    #[error("buffer too small: need {needed} bytes, have {available}")]
    BufferTooSmall {
        /// Bytes needed.
        needed: usize,
        /// Bytes available.
        available: usize,
    },
}
