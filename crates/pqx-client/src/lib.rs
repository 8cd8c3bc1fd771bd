//! # pqx-client
//!
//! Synchronous PostgreSQL client core.
//!
//! This crate mediates between a long-lived session with the server (a
//! [`Connection`]) and the short-lived units of work that run on it
//! ([`Transaction`]s). It does no I/O of its own: everything that reaches
//! the server goes through an execution [`Backend`].
//!
//! ## Features
//!
//! - **One transaction per connection**: enforced by the borrow checker and,
//!   at run time, by the connection's transaction slot
//! - **Guaranteed cleanup**: transactions roll back and unregister on drop;
//!   unregistration cannot fail
//! - **COPY streams**: line-oriented `COPY FROM STDIN` / `COPY TO STDOUT`
//!   with scoped writer and reader guards
//! - **Session variables**: read-through and write-through accessors
//! - **Savepoints** with validated names
//! - **Structured logging** via `tracing`, with statement sanitization
//!
//! ## Lifecycle
//!
//! ```text
//! Connection --begin--> Transaction (registered)
//! Transaction --commit / rollback / drop--> unregistered
//! Transaction --copy_in--> CopyWriter --finish / drop--> end_copy_write
//! Transaction --copy_out--> CopyReader --end of data / drop--> inactive
//! ```
//!
//! ## Example
//!
//! ```rust,ignore
//! use pqx_client::{Config, Connection, Transaction};
//!
//! let config: Config = "name=etl; set search_path=staging".parse()?;
//! let mut conn = Connection::new(backend, config)?;
//!
//! let mut tx = Transaction::begin(&mut conn, "nightly")?;
//! tx.exec_params("DELETE FROM events WHERE day < $1", &[&"2024-01-01"])?;
//!
//! let mut copy = tx.copy_in("COPY events FROM STDIN")?;
//! for line in lines {
//!     copy.write_line(line)?;
//! }
//! let rows = copy.finish()?;
//!
//! tx.commit()?;
//! conn.close()?;
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod backend;
pub mod config;
pub mod connection;
pub mod copy;
pub mod describe;
pub mod error;
pub mod instrumentation;
pub mod registry;
pub mod result;
pub mod transaction;

pub use backend::{Backend, BackendError};
pub use config::Config;
pub use connection::Connection;
pub use copy::CopyState;
pub use describe::{Named, describe};
pub use error::{Error, Result};
pub use instrumentation::SanitizationConfig;
pub use pqx_protocol::{EscapeError, esc_bin, unesc_bin};
pub use pqx_types::{SqlValue, ToSql};
pub use registry::TransactionId;
pub use result::{QueryResult, ResultStatus};
pub use transaction::{CopyReader, CopyWriter, IsolationLevel, SavePoint, Transaction};
