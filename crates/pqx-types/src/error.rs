//! Type conversion error types.

use thiserror::Error;

/// Errors that can occur while converting a Rust value into a parameter.
#[derive(Debug, Error)]
pub enum TypeError {
    /// Value is out of range for the target type.
    #[error("value out of range for {target_type}")]
    OutOfRange {
        /// Target type name.
        target_type: &'static str,
    },

    /// Text contains a NUL byte, which PostgreSQL text values cannot carry.
    #[error("text parameter contains a NUL byte at offset {position}")]
    EmbeddedNul {
        /// Offset of the NUL byte.
        position: usize,
    },
}
