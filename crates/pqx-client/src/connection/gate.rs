//! The only path from a transaction to the connection's private operations.
//!
//! [`ConnectionTransaction`] borrows a connection for the duration of one
//! call and exposes exactly what a transaction needs: execution, COPY
//! streaming, session variables, and registration. Building one requires a
//! [`Key`], which only transaction code can create.

use bytes::Bytes;
use pqx_types::SqlValue;

use super::Connection;
use crate::backend::Backend;
use crate::error::Result;
use crate::registry::TransactionId;
use crate::result::QueryResult;
use crate::transaction::Key;

/// Capability-scoped view of a [`Connection`] for transaction code.
pub(crate) struct ConnectionTransaction<'a, B: Backend> {
    conn: &'a mut Connection<B>,
}

impl<'a, B: Backend> ConnectionTransaction<'a, B> {
    pub(crate) fn new(conn: &'a mut Connection<B>, _key: Key) -> Self {
        Self { conn }
    }

    /// Execute a statement with no parameters.
    pub(crate) fn execute(&mut self, query: &str) -> Result<QueryResult> {
        self.conn.execute(query)
    }

    /// Execute a statement with positional parameters.
    pub(crate) fn execute_with_params(
        &mut self,
        query: &str,
        params: &[SqlValue],
    ) -> Result<QueryResult> {
        self.conn.execute_params(query, params)
    }

    /// Execute a statement prepared on this connection.
    pub(crate) fn execute_prepared(
        &mut self,
        statement: &str,
        params: &[SqlValue],
    ) -> Result<QueryResult> {
        self.conn.execute_prepared(statement, params)
    }

    pub(crate) fn register(&mut self, id: TransactionId, description: String) -> Result<()> {
        self.conn.register(id, description)
    }

    /// Infallible; safe to call while unwinding.
    pub(crate) fn unregister(&mut self, id: TransactionId) {
        self.conn.unregister(id);
    }

    pub(crate) fn read_copy_line(&mut self) -> Result<Option<Bytes>> {
        self.conn.read_copy_line()
    }

    pub(crate) fn write_copy_line(&mut self, line: &[u8]) -> Result<()> {
        self.conn.write_copy_line(line)
    }

    pub(crate) fn end_copy_write(&mut self) -> Result<QueryResult> {
        self.conn.end_copy_write()
    }

    pub(crate) fn get_session_variable(&mut self, name: &str) -> Result<String> {
        self.conn.get_variable(name)
    }

    pub(crate) fn set_session_variable(&mut self, name: &str, value: &str) -> Result<()> {
        self.conn.set_variable(name, value)
    }
}
