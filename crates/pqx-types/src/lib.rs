//! # pqx-types
//!
//! Parameter values passed to the execution backend, and the conversions
//! from Rust types into them.
//!
//! Parameters travel in PostgreSQL text format. Each [`SqlValue`] knows its
//! type OID and how to render itself as text; `bytea` values render through
//! the hex escape codec in `pqx-protocol`.
//!
//! ## Type Mappings
//!
//! | PostgreSQL Type | OID | Rust Type |
//! |-----------------|-----|-----------|
//! | `bool` | 16 | `bool` |
//! | `bytea` | 17 | `&[u8]`, `Vec<u8>`, `Bytes` |
//! | `int8` | 20 | `i64` |
//! | `int2` | 21 | `i16`, `u8` |
//! | `int4` | 23 | `i32` |
//! | `text` | 25 | `&str`, `String` |
//! | `float4` | 700 | `f32` |
//! | `float8` | 701 | `f64` |

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod error;
pub mod to_sql;
pub mod value;

pub use error::TypeError;
pub use to_sql::ToSql;
pub use value::{Oid, SqlValue};
