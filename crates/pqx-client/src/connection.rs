//! A session with the database server.
//!
//! A [`Connection`] owns one [`Backend`] and the session-private state that
//! goes with it: the transaction slot, the COPY stream state and the session
//! variables this side has read or set. Statement execution and COPY
//! traffic are only reachable through a transaction, via the gateway in
//! the `gate` submodule.

pub(crate) mod gate;

use std::collections::HashMap;

use bytes::Bytes;
use pqx_protocol::{frame_line, strip_line_terminator};
use pqx_types::SqlValue;

use crate::backend::Backend;
use crate::config::Config;
use crate::copy::CopyState;
use crate::describe::Named;
use crate::error::{Error, Result};
use crate::instrumentation::{DB_SYSTEM, extract_operation};
use crate::registry::{Registry, TransactionId};
use crate::result::{QueryResult, ResultStatus};

/// A session with the database server.
///
/// At most one transaction runs on a connection at a time. Dropping a
/// connection while a transaction is still registered, or while a COPY
/// stream is open, is a programming error: it is logged at `error` level.
/// Use [`Connection::close`] to have it reported as an `Err` instead.
pub struct Connection<B: Backend> {
    backend: B,
    config: Config,
    registry: Registry,
    copy: CopyState,
    variables: HashMap<String, String>,
}

impl<B: Backend> Connection<B> {
    /// Wrap a backend session.
    ///
    /// Session variables from `config` are set in order before the
    /// connection is returned.
    pub fn new(backend: B, config: Config) -> Result<Self> {
        let mut conn = Self {
            backend,
            config,
            registry: Registry::default(),
            copy: CopyState::Inactive,
            variables: HashMap::new(),
        };

        tracing::debug!(
            db.system = DB_SYSTEM,
            connection = %conn.description(),
            variables = conn.config.session_variables.len(),
            "connection opened"
        );

        let initial = conn.config.session_variables.clone();
        for (name, value) in &initial {
            conn.set_variable(name, value)?;
        }

        Ok(conn)
    }

    /// The configuration this connection was created with.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Check whether a transaction is registered.
    #[must_use]
    pub fn is_in_transaction(&self) -> bool {
        self.registry.active().is_some()
    }

    /// Description of the registered transaction, if any.
    #[must_use]
    pub fn active_transaction(&self) -> Option<&str> {
        self.registry.active().map(|r| r.description.as_str())
    }

    /// Current COPY stream state.
    #[must_use]
    pub fn copy_state(&self) -> CopyState {
        self.copy
    }

    /// Session variables this connection has read or set, with the last
    /// value seen.
    #[must_use]
    pub fn session_variables(&self) -> &HashMap<String, String> {
        &self.variables
    }

    /// Read a session variable from the server.
    ///
    /// Always asks the backend; the value is not served from
    /// [`session_variables`](Self::session_variables).
    pub fn get_variable(&mut self, name: &str) -> Result<String> {
        self.ensure_no_copy()?;
        let value = self.backend.get_variable(name)?;
        tracing::debug!(variable = name, value = %value, "read session variable");
        self.variables.insert(name.to_string(), value.clone());
        Ok(value)
    }

    /// Set a session variable for the rest of the session.
    ///
    /// Names and values are passed to the backend as given.
    pub fn set_variable(&mut self, name: &str, value: &str) -> Result<()> {
        self.ensure_no_copy()?;
        self.backend.set_variable(name, value)?;
        tracing::debug!(variable = name, value = value, "set session variable");
        self.variables.insert(name.to_string(), value.to_string());
        Ok(())
    }

    /// Close the session.
    ///
    /// Unlike dropping, an outstanding transaction or open COPY stream is
    /// returned as an error. The backend is closed in every case.
    pub fn close(mut self) -> Result<()> {
        let mut outcome = Ok(());

        if let Some(active) = self.registry.take() {
            outcome = Err(Error::TransactionActive {
                active: active.description,
                attempted: format!("closed {}", self.description()),
            });
        }

        let copy = std::mem::take(&mut self.copy);
        if copy.is_active() && outcome.is_ok() {
            outcome = Err(Error::CopyInProgress { state: copy });
        }

        let closed = self.backend.close();
        tracing::debug!(connection = %self.description(), "connection closed");
        outcome?;
        closed?;
        Ok(())
    }

    fn ensure_no_copy(&self) -> Result<()> {
        if self.copy.is_active() {
            return Err(Error::CopyInProgress { state: self.copy });
        }
        Ok(())
    }

    fn log_statement(&self, query: &str) {
        tracing::debug!(
            connection = %self.description(),
            operation = extract_operation(query),
            sql = %self.config.sanitization.sanitize(query),
            "executing statement"
        );
    }

    /// Follow the backend into COPY mode.
    fn track_copy(&mut self, result: &QueryResult) {
        let state = match result.status {
            ResultStatus::CopyIn => CopyState::In,
            ResultStatus::CopyOut => CopyState::Out,
            _ => return,
        };
        tracing::debug!(state = %state, "COPY stream opened");
        self.copy = state;
    }

    fn execute(&mut self, query: &str) -> Result<QueryResult> {
        self.ensure_no_copy()?;
        self.log_statement(query);
        let result = self.backend.execute(query)?;
        self.track_copy(&result);
        Ok(result)
    }

    fn execute_params(&mut self, query: &str, params: &[SqlValue]) -> Result<QueryResult> {
        self.ensure_no_copy()?;
        self.log_statement(query);
        let result = self.backend.execute_params(query, params)?;
        self.track_copy(&result);
        Ok(result)
    }

    fn execute_prepared(&mut self, statement: &str, params: &[SqlValue]) -> Result<QueryResult> {
        self.ensure_no_copy()?;
        tracing::debug!(
            connection = %self.description(),
            statement = statement,
            params = params.len(),
            "executing prepared statement"
        );
        let result = self.backend.execute_prepared(statement, params)?;
        self.track_copy(&result);
        Ok(result)
    }

    fn register(&mut self, id: TransactionId, description: String) -> Result<()> {
        self.registry.register(id, description)
    }

    fn unregister(&mut self, id: TransactionId) {
        self.registry.unregister(id);
    }

    /// Next line of a COPY-out stream, without its terminator.
    ///
    /// `None` marks the end of the stream; the connection is then back to
    /// [`CopyState::Inactive`].
    fn read_copy_line(&mut self) -> Result<Option<Bytes>> {
        if self.copy != CopyState::Out {
            return Err(Error::CopyState {
                operation: "read_copy_line",
                state: self.copy,
            });
        }

        match self.backend.get_copy_data() {
            Ok(Some(chunk)) => {
                let line = strip_line_terminator(chunk);
                tracing::trace!(len = line.len(), "COPY line received");
                Ok(Some(line))
            }
            Ok(None) => {
                self.copy = CopyState::Inactive;
                tracing::debug!("COPY-out stream finished");
                Ok(None)
            }
            Err(e) => {
                // The stream cannot be resumed after a transport failure
                self.copy = CopyState::Inactive;
                Err(e.into())
            }
        }
    }

    fn write_copy_line(&mut self, line: &[u8]) -> Result<()> {
        if self.copy != CopyState::In {
            return Err(Error::CopyState {
                operation: "write_copy_line",
                state: self.copy,
            });
        }

        self.backend.put_copy_data(&frame_line(line))?;
        tracing::trace!(len = line.len(), "COPY line sent");
        Ok(())
    }

    /// Close a COPY-in stream.
    ///
    /// The connection leaves COPY mode even when the backend reports a
    /// failure.
    fn end_copy_write(&mut self) -> Result<QueryResult> {
        if self.copy != CopyState::In {
            return Err(Error::CopyState {
                operation: "end_copy_write",
                state: self.copy,
            });
        }

        self.copy = CopyState::Inactive;
        let result = self.backend.put_copy_end(None)?;
        tracing::debug!(rows = ?result.rows_affected(), "COPY-in stream finished");
        Ok(result)
    }
}

impl<B: Backend> Named for Connection<B> {
    fn classname(&self) -> &'static str {
        "connection"
    }

    fn name(&self) -> &str {
        self.config.name.as_deref().unwrap_or_default()
    }
}

impl<B: Backend> Drop for Connection<B> {
    fn drop(&mut self) {
        if let Some(active) = self.registry.active() {
            tracing::error!(
                connection = %self.description(),
                transaction = %active.description,
                "connection dropped while a transaction is still registered"
            );
        }
        if self.copy.is_active() {
            tracing::error!(
                connection = %self.description(),
                state = %self.copy,
                "connection dropped with an open COPY stream"
            );
        }
    }
}

impl<B: Backend> std::fmt::Debug for Connection<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("name", &self.config.name)
            .field("transaction", &self.active_transaction())
            .field("copy", &self.copy)
            .finish_non_exhaustive()
    }
}
