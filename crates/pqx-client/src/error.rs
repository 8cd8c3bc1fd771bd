//! Client error types.

use thiserror::Error;

use crate::backend::BackendError;
use crate::copy::CopyState;
use crate::result::ResultStatus;

/// Errors that can occur during client operations.
///
/// Three families: malformed input ([`Error::Escape`], [`Error::Type`],
/// [`Error::Config`], [`Error::InvalidIdentifier`]), misuse of the
/// connection protocol (see [`Error::is_usage_error`]), and failures
/// reported by the backend, which are passed through unmodified.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// Escaped binary data could not be decoded.
    #[error("escape error: {0}")]
    Escape(#[from] pqx_protocol::EscapeError),

    /// Parameter conversion failed.
    #[error("type error: {0}")]
    Type(#[from] pqx_types::TypeError),

    /// Failure reported by the execution backend.
    #[error(transparent)]
    Backend(#[from] BackendError),

    /// A transaction is already registered on the connection.
    #[error("{attempted} while {active} is still active")]
    TransactionActive {
        /// Description of the registered transaction.
        active: String,
        /// What was attempted.
        attempted: String,
    },

    /// A COPY operation was issued in the wrong stream state.
    #[error("{operation} is not allowed while COPY state is {state}")]
    CopyState {
        /// The COPY operation attempted.
        operation: &'static str,
        /// State the connection was in.
        state: CopyState,
    },

    /// A statement was issued while a COPY stream is open.
    #[error("cannot execute statements while a {state} stream is open")]
    CopyInProgress {
        /// Direction of the open stream.
        state: CopyState,
    },

    /// A statement expected to start a COPY did not.
    #[error("statement did not start {expected} (result status: {status})")]
    NotCopyStatement {
        /// The stream direction that was expected.
        expected: CopyState,
        /// What the statement produced instead.
        status: ResultStatus,
    },

    /// Operation not available on this kind of transaction.
    #[error("{operation} is not supported on {object}")]
    Unsupported {
        /// The operation attempted.
        operation: &'static str,
        /// Description of the object it was attempted on.
        object: String,
    },

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Invalid identifier (potential SQL injection attempt).
    #[error("invalid identifier: {0}")]
    InvalidIdentifier(String),
}

impl Error {
    /// Check if this error is caused by using the API in the wrong order.
    ///
    /// These are programming errors; retrying the same call cannot succeed.
    #[must_use]
    pub fn is_usage_error(&self) -> bool {
        matches!(
            self,
            Self::TransactionActive { .. }
                | Self::CopyState { .. }
                | Self::CopyInProgress { .. }
                | Self::NotCopyStatement { .. }
                | Self::Unsupported { .. }
        )
    }

    /// Check if this error was reported by the backend.
    #[must_use]
    pub fn is_backend_error(&self) -> bool {
        matches!(self, Self::Backend(_))
    }

    /// Check if this error is transient and may succeed on retry.
    ///
    /// Covers lost connections and the SQLSTATE classes for connection
    /// exceptions (`08`) and transaction rollbacks (`40`, which includes
    /// serialization failures and deadlocks). The client itself never
    /// retries.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Backend(BackendError::ConnectionClosed | BackendError::Io(_)) => true,
            Self::Backend(BackendError::Server { code, .. }) => {
                code.starts_with("08") || code.starts_with("40")
            }
            _ => false,
        }
    }

    /// SQLSTATE code of a server error.
    #[must_use]
    pub fn sqlstate(&self) -> Option<&str> {
        match self {
            Self::Backend(err) => err.sqlstate(),
            _ => None,
        }
    }
}

/// Result type for client operations.
pub type Result<T> = std::result::Result<T, Error>;
