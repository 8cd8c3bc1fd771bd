//! # pqx-testing
//!
//! Test infrastructure for the `pqx` client core.
//!
//! This crate provides an in-memory execution backend that follows a
//! script, so connections, transactions and COPY streams can be tested
//! without a server.
//!
//! ## Features
//!
//! - Scripted responses per statement, with a sensible default for the rest
//! - COPY-in capture and scripted COPY-out data
//! - Session variable map with PostgreSQL-style errors for unknown names
//! - One-shot failure injection for COPY and variable operations
//! - A recorded log of every backend call
//!
//! ## Example
//!
//! ```rust
//! use pqx_client::{Config, Connection, Transaction};
//! use pqx_testing::mock_backend::{MockBackend, MockResponse};
//!
//! let backend = MockBackend::builder()
//!     .with_response("SELECT 1", MockResponse::scalar("1"))
//!     .build();
//! let handle = backend.handle();
//!
//! let mut conn = Connection::new(backend, Config::new()).unwrap();
//! let mut tx = Transaction::begin(&mut conn, "demo").unwrap();
//! let result = tx.exec("SELECT 1").unwrap();
//! assert_eq!(result.get(0, 0), Some("1"));
//! tx.commit().unwrap();
//!
//! assert_eq!(handle.executed(), ["BEGIN", "SELECT 1", "COMMIT"]);
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod fixtures;
pub mod mock_backend;

pub use fixtures::{CopyFixture, connect, connect_with};
pub use mock_backend::{
    MockBackend, MockBackendBuilder, MockFailure, MockHandle, MockResponse, RecordedCall,
};
