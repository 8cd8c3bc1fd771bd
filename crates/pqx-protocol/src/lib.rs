//! # pqx-protocol
//!
//! IO-agnostic pieces of the PostgreSQL text protocol used by the `pqx`
//! client core.
//!
//! This crate contains no networking logic and makes no assumptions about
//! how bytes reach the server. Higher-level crates build upon it.
//!
//! ## Modules
//!
//! - [`escape`]: the hex `bytea` escape format (`\x` followed by two
//!   lowercase hex digits per byte), with size arithmetic, caller-buffer and
//!   allocating encoders/decoders.
//! - [`copy`]: line framing for the `COPY` sub-protocol.
//!
//! ## Example
//!
//! ```rust
//! use pqx_protocol::escape::{esc_bin, unesc_bin};
//!
//! let text = esc_bin(b"Hello");
//! assert_eq!(text, "\\x48656c6c6f");
//! assert_eq!(unesc_bin(&text).unwrap(), b"Hello");
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod copy;
pub mod error;
pub mod escape;

pub use copy::{COPY_LINE_TERMINATOR, frame_line, strip_line_terminator};
pub use error::EscapeError;
pub use escape::{
    ESCAPE_PREFIX, esc_bin, esc_bin_to_buf, esc_bin_to_slice, size_esc_bin, size_unesc_bin,
    unesc_bin, unesc_bin_to_buf, unesc_bin_to_slice,
};
