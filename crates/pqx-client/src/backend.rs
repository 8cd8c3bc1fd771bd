//! The execution backend boundary.
//!
//! A [`Backend`] is whatever actually talks to the server: a libpq handle,
//! a native protocol implementation, or a scripted mock. The client core
//! never performs I/O itself; every statement, COPY chunk and session
//! variable access goes through this trait.
//!
//! All methods are blocking. Errors are reported as [`BackendError`] and
//! surfaced to callers unchanged.

use bytes::Bytes;
use pqx_types::SqlValue;
use thiserror::Error;

use crate::result::QueryResult;

/// Errors reported by an execution backend.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum BackendError {
    /// The server rejected the request.
    #[error("{severity}: {message} (SQLSTATE {code})")]
    Server {
        /// Severity as reported by the server (`ERROR`, `FATAL`, ...).
        severity: String,
        /// Five-character SQLSTATE code.
        code: String,
        /// Primary error message.
        message: String,
        /// Optional secondary message with more detail.
        detail: Option<String>,
        /// Optional suggestion on what to do about the problem.
        hint: Option<String>,
    },

    /// Transport failure.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The link to the server is gone.
    #[error("connection to server was lost")]
    ConnectionClosed,

    /// Any other backend-specific failure.
    #[error("{0}")]
    Other(String),
}

impl BackendError {
    /// Build a server error with severity `ERROR` and no detail or hint.
    #[must_use]
    pub fn server(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Server {
            severity: "ERROR".to_string(),
            code: code.into(),
            message: message.into(),
            detail: None,
            hint: None,
        }
    }

    /// SQLSTATE code, if the server reported one.
    #[must_use]
    pub fn sqlstate(&self) -> Option<&str> {
        match self {
            Self::Server { code, .. } => Some(code),
            _ => None,
        }
    }
}

/// A blocking link to one server session.
///
/// Implementations report the kind of result each statement produced
/// through [`QueryResult::status`]; a statement that starts a COPY must
/// report [`ResultStatus::CopyIn`](crate::ResultStatus::CopyIn) or
/// [`ResultStatus::CopyOut`](crate::ResultStatus::CopyOut) so the connection
/// can track the stream.
pub trait Backend {
    /// Execute a statement without parameters.
    fn execute(&mut self, query: &str) -> Result<QueryResult, BackendError>;

    /// Execute a statement with positional parameters (`$1`, `$2`, ...).
    fn execute_params(
        &mut self,
        query: &str,
        params: &[SqlValue],
    ) -> Result<QueryResult, BackendError>;

    /// Execute a statement previously prepared on this session.
    fn execute_prepared(
        &mut self,
        statement: &str,
        params: &[SqlValue],
    ) -> Result<QueryResult, BackendError>;

    /// Receive the next chunk of a COPY-out stream.
    ///
    /// Returns `None` once the server has sent all data.
    fn get_copy_data(&mut self) -> Result<Option<Bytes>, BackendError>;

    /// Send one chunk of a COPY-in stream.
    fn put_copy_data(&mut self, data: &[u8]) -> Result<(), BackendError>;

    /// Finish a COPY-in stream.
    ///
    /// With `error` set the server aborts the COPY with that message.
    /// Returns the final command result (`COPY <n>`).
    fn put_copy_end(&mut self, error: Option<&str>) -> Result<QueryResult, BackendError>;

    /// Read a run-time setting (`SHOW <name>`).
    fn get_variable(&mut self, name: &str) -> Result<String, BackendError>;

    /// Change a run-time setting for the rest of the session.
    fn set_variable(&mut self, name: &str, value: &str) -> Result<(), BackendError>;

    /// Release the session.
    fn close(&mut self) -> Result<(), BackendError> {
        Ok(())
    }
}

impl<B: Backend + ?Sized> Backend for Box<B> {
    fn execute(&mut self, query: &str) -> Result<QueryResult, BackendError> {
        (**self).execute(query)
    }

    fn execute_params(
        &mut self,
        query: &str,
        params: &[SqlValue],
    ) -> Result<QueryResult, BackendError> {
        (**self).execute_params(query, params)
    }

    fn execute_prepared(
        &mut self,
        statement: &str,
        params: &[SqlValue],
    ) -> Result<QueryResult, BackendError> {
        (**self).execute_prepared(statement, params)
    }

    fn get_copy_data(&mut self) -> Result<Option<Bytes>, BackendError> {
        (**self).get_copy_data()
    }

    fn put_copy_data(&mut self, data: &[u8]) -> Result<(), BackendError> {
        (**self).put_copy_data(data)
    }

    fn put_copy_end(&mut self, error: Option<&str>) -> Result<QueryResult, BackendError> {
        (**self).put_copy_end(error)
    }

    fn get_variable(&mut self, name: &str) -> Result<String, BackendError> {
        (**self).get_variable(name)
    }

    fn set_variable(&mut self, name: &str, value: &str) -> Result<(), BackendError> {
        (**self).set_variable(name, value)
    }

    fn close(&mut self) -> Result<(), BackendError> {
        (**self).close()
    }
}
