//! Transactions: the units of work that run on a connection.
//!
//! A [`Transaction`] mutably borrows its [`Connection`] for its whole life,
//! so the compiler already rules out a second transaction on the same
//! connection in safe code. The connection's transaction slot enforces the
//! same rule at run time, which also catches transactions leaked with
//! [`std::mem::forget`].
//!
//! Every transaction registers on creation and unregisters exactly once, on
//! drop, whether it committed, rolled back, or was abandoned. Dropping a
//! transaction that was neither committed nor rolled back rolls it back.
//!
//! ```rust,ignore
//! let mut tx = Transaction::begin(&mut conn, "load")?;
//! tx.exec("INSERT INTO t VALUES (1)")?;
//! let sp = tx.savepoint("before_bulk")?;
//!
//! let mut copy = tx.copy_in("COPY t FROM STDIN")?;
//! copy.write_line("2")?;
//! copy.finish()?;
//!
//! tx.release_savepoint(sp)?;
//! tx.commit()?;
//! ```

mod stream;

pub use stream::{CopyReader, CopyWriter};

use std::fmt;

use once_cell::sync::Lazy;
use pqx_types::{SqlValue, ToSql};
use regex::Regex;

use crate::backend::Backend;
use crate::connection::Connection;
use crate::connection::gate::ConnectionTransaction;
use crate::copy::CopyState;
use crate::describe::{Named, describe};
use crate::error::{Error, Result};
use crate::instrumentation::span_names;
use crate::registry::TransactionId;
use crate::result::QueryResult;

/// Proof that the holder is transaction code; required to open the
/// connection gateway.
pub(crate) struct Key(());

/// Transaction isolation level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IsolationLevel {
    /// Read uncommitted. PostgreSQL treats it as read committed.
    ReadUncommitted,

    /// Read committed (PostgreSQL default).
    ///
    /// Each statement sees data committed before it began.
    #[default]
    ReadCommitted,

    /// Repeatable read.
    ///
    /// All statements see a snapshot taken at the first statement of the
    /// transaction.
    RepeatableRead,

    /// Serializable (highest isolation).
    ///
    /// May fail with SQLSTATE `40001`; callers are expected to retry the
    /// whole transaction.
    Serializable,
}

impl IsolationLevel {
    /// Get the statement that starts a transaction at this level.
    #[must_use]
    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::ReadUncommitted => "BEGIN ISOLATION LEVEL READ UNCOMMITTED",
            Self::ReadCommitted => "BEGIN ISOLATION LEVEL READ COMMITTED",
            Self::RepeatableRead => "BEGIN ISOLATION LEVEL REPEATABLE READ",
            Self::Serializable => "BEGIN ISOLATION LEVEL SERIALIZABLE",
        }
    }

    /// Get the isolation level name as used in SQL.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::ReadUncommitted => "READ UNCOMMITTED",
            Self::ReadCommitted => "READ COMMITTED",
            Self::RepeatableRead => "REPEATABLE READ",
            Self::Serializable => "SERIALIZABLE",
        }
    }
}

/// A savepoint within a transaction.
///
/// The name is validated when the savepoint is created, so it can be
/// spliced into `ROLLBACK TO SAVEPOINT` and `RELEASE SAVEPOINT` safely.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavePoint {
    name: String,
}

impl SavePoint {
    /// Get the savepoint name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    /// `BEGIN` ... `COMMIT`; `None` uses the server's default level.
    Database(Option<IsolationLevel>),
    /// Every statement commits on its own.
    Autocommit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Status {
    /// Registered, `BEGIN` not yet acknowledged.
    Starting,
    Active,
    /// Committed or rolled back.
    Finished,
}

/// A unit of work on a [`Connection`].
pub struct Transaction<'c, B: Backend> {
    conn: &'c mut Connection<B>,
    id: TransactionId,
    name: String,
    kind: Kind,
    status: Status,
}

impl<'c, B: Backend> Transaction<'c, B> {
    /// Begin a transaction at the server's default isolation level.
    ///
    /// `name` identifies the transaction in errors and logs; pass `""` for
    /// an unnamed one.
    ///
    /// # Errors
    ///
    /// [`Error::TransactionActive`] if another transaction is registered on
    /// the connection; any backend failure of `BEGIN`.
    pub fn begin(conn: &'c mut Connection<B>, name: &str) -> Result<Self> {
        Self::start(conn, name, Kind::Database(None))
    }

    /// Begin a transaction at an explicit isolation level.
    pub fn begin_with_isolation(
        conn: &'c mut Connection<B>,
        name: &str,
        level: IsolationLevel,
    ) -> Result<Self> {
        Self::start(conn, name, Kind::Database(Some(level)))
    }

    /// Start a unit of work without a server-side transaction.
    ///
    /// Each statement commits as it completes; [`commit`](Self::commit) and
    /// [`rollback`](Self::rollback) have nothing to do. It still occupies
    /// the connection's transaction slot.
    pub fn nontransaction(conn: &'c mut Connection<B>, name: &str) -> Result<Self> {
        Self::start(conn, name, Kind::Autocommit)
    }

    fn start(conn: &'c mut Connection<B>, name: &str, kind: Kind) -> Result<Self> {
        let id = TransactionId::next();
        let mut description = String::new();
        describe(&mut description, kind.classname(), name, 0);

        ConnectionTransaction::new(&mut *conn, Key(())).register(id, description)?;

        // From here on, dropping `tx` unregisters
        let mut tx = Self {
            conn,
            id,
            name: name.to_string(),
            kind,
            status: Status::Starting,
        };

        if let Kind::Database(level) = kind {
            let _span = tracing::debug_span!(
                span_names::BEGIN_TRANSACTION,
                transaction = %tx.description(),
                isolation = level.map_or("default", |l| l.name()),
            )
            .entered();

            let sql = level.map_or("BEGIN", |l| l.as_sql());
            tx.gate().execute(sql)?;
        }

        tx.status = Status::Active;
        tracing::debug!(transaction = %tx.description(), id = %id, "transaction started");
        Ok(tx)
    }

    fn gate(&mut self) -> ConnectionTransaction<'_, B> {
        ConnectionTransaction::new(&mut *self.conn, Key(()))
    }

    /// Identity under which this transaction is registered.
    #[must_use]
    pub fn id(&self) -> TransactionId {
        self.id
    }

    /// Check whether this is a [`nontransaction`](Self::nontransaction).
    #[must_use]
    pub fn is_nontransaction(&self) -> bool {
        self.kind == Kind::Autocommit
    }

    /// Explicit isolation level, if one was requested.
    #[must_use]
    pub fn isolation_level(&self) -> Option<IsolationLevel> {
        match self.kind {
            Kind::Database(level) => level,
            Kind::Autocommit => None,
        }
    }

    /// The connection this transaction runs on.
    #[must_use]
    pub fn connection(&self) -> &Connection<B> {
        &*self.conn
    }

    /// Execute a statement.
    pub fn exec(&mut self, query: &str) -> Result<QueryResult> {
        let _span = tracing::debug_span!(span_names::EXECUTE, transaction = %self.description())
            .entered();
        self.gate().execute(query)
    }

    /// Execute a statement with positional parameters (`$1`, `$2`, ...).
    pub fn exec_params(&mut self, query: &str, params: &[&dyn ToSql]) -> Result<QueryResult> {
        let params = to_values(params)?;
        let _span = tracing::debug_span!(span_names::EXECUTE, transaction = %self.description())
            .entered();
        self.gate().execute_with_params(query, &params)
    }

    /// Execute a statement prepared on this connection.
    ///
    /// Whether the statement exists is checked by the backend.
    pub fn exec_prepared(&mut self, statement: &str, params: &[&dyn ToSql]) -> Result<QueryResult> {
        let params = to_values(params)?;
        let _span = tracing::debug_span!(span_names::EXECUTE, transaction = %self.description())
            .entered();
        self.gate().execute_prepared(statement, &params)
    }

    /// Read a session variable through this transaction.
    pub fn get_variable(&mut self, name: &str) -> Result<String> {
        self.gate().get_session_variable(name)
    }

    /// Set a session variable through this transaction.
    ///
    /// The setting outlives the transaction unless the transaction rolls
    /// back.
    pub fn set_variable(&mut self, name: &str, value: &str) -> Result<()> {
        self.gate().set_session_variable(name, value)
    }

    /// Create a savepoint.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidIdentifier`] for a name that is not a plain SQL
    /// identifier; [`Error::Unsupported`] on a nontransaction.
    pub fn savepoint(&mut self, name: &str) -> Result<SavePoint> {
        self.require_database("savepoint")?;
        validate_identifier(name)?;

        let _span = tracing::debug_span!(span_names::SAVEPOINT, savepoint = name).entered();
        self.gate().execute(&format!("SAVEPOINT {name}"))?;
        Ok(SavePoint {
            name: name.to_string(),
        })
    }

    /// Roll back to a savepoint. The savepoint stays valid.
    pub fn rollback_to(&mut self, savepoint: &SavePoint) -> Result<()> {
        self.require_database("rollback_to")?;

        let _span =
            tracing::debug_span!(span_names::SAVEPOINT, savepoint = %savepoint.name).entered();
        self.gate()
            .execute(&format!("ROLLBACK TO SAVEPOINT {}", savepoint.name))?;
        Ok(())
    }

    /// Release a savepoint, keeping its changes.
    pub fn release_savepoint(&mut self, savepoint: SavePoint) -> Result<()> {
        self.require_database("release_savepoint")?;

        let _span =
            tracing::debug_span!(span_names::SAVEPOINT, savepoint = %savepoint.name).entered();
        self.gate()
            .execute(&format!("RELEASE SAVEPOINT {}", savepoint.name))?;
        Ok(())
    }

    /// Commit the transaction.
    ///
    /// If `COMMIT` fails at the server, the transaction is over and its
    /// changes are gone.
    pub fn commit(mut self) -> Result<()> {
        if self.kind == Kind::Autocommit {
            self.status = Status::Finished;
            return Ok(());
        }

        let _span =
            tracing::debug_span!(span_names::COMMIT, transaction = %self.description()).entered();
        let result = self.gate().execute("COMMIT");
        // A rejected COMMIT (open COPY stream) never reached the server
        if !matches!(result, Err(Error::CopyInProgress { .. })) {
            self.status = Status::Finished;
        }
        result?;
        tracing::debug!("transaction committed");
        Ok(())
    }

    /// Roll back the transaction.
    pub fn rollback(mut self) -> Result<()> {
        if self.kind == Kind::Autocommit {
            self.status = Status::Finished;
            tracing::warn!(
                transaction = %self.description(),
                "nontransaction cannot roll back; its statements are already committed"
            );
            return Ok(());
        }

        let _span =
            tracing::debug_span!(span_names::ROLLBACK, transaction = %self.description()).entered();
        self.status = Status::Finished;
        self.abandon_copy();
        self.gate().execute("ROLLBACK")?;
        tracing::debug!("transaction rolled back");
        Ok(())
    }

    fn require_database(&self, operation: &'static str) -> Result<()> {
        if self.kind == Kind::Autocommit {
            return Err(Error::Unsupported {
                operation,
                object: self.description(),
            });
        }
        Ok(())
    }

    /// Bring the connection out of COPY mode, whatever the direction.
    fn abandon_copy(&mut self) {
        match self.conn.copy_state() {
            CopyState::Inactive => {}
            CopyState::In => {
                if let Err(e) = self.gate().end_copy_write() {
                    tracing::warn!(error = %e, "failed to end abandoned COPY-in stream");
                }
            }
            CopyState::Out => self.drain_copy(),
        }
    }

    /// Read and discard the rest of a COPY-out stream.
    fn drain_copy(&mut self) {
        loop {
            match self.gate().read_copy_line() {
                Ok(Some(_)) => {}
                Ok(None) => break,
                Err(e) => {
                    tracing::warn!(error = %e, "failed to drain COPY-out stream");
                    break;
                }
            }
        }
    }
}

impl Kind {
    fn classname(self) -> &'static str {
        match self {
            Self::Database(_) => "transaction",
            Self::Autocommit => "nontransaction",
        }
    }
}

fn to_values(params: &[&dyn ToSql]) -> Result<Vec<SqlValue>> {
    params
        .iter()
        .map(|p| p.to_sql().map_err(Error::from))
        .collect()
}

/// Validate an identifier (savepoint name) to prevent SQL injection.
fn validate_identifier(name: &str) -> Result<()> {
    // PostgreSQL truncates identifiers beyond 63 bytes
    static IDENTIFIER_RE: Lazy<Option<Regex>> =
        Lazy::new(|| Regex::new(r"^[a-zA-Z_][a-zA-Z0-9_$]{0,62}$").ok());

    if name.is_empty() {
        return Err(Error::InvalidIdentifier(
            "identifier cannot be empty".into(),
        ));
    }

    if !IDENTIFIER_RE.as_ref().is_some_and(|re| re.is_match(name)) {
        return Err(Error::InvalidIdentifier(format!(
            "invalid identifier '{name}': must start with letter/underscore, \
             contain only alphanumerics/_/$, and be 1-63 characters"
        )));
    }

    Ok(())
}

impl<B: Backend> Named for Transaction<'_, B> {
    fn classname(&self) -> &'static str {
        self.kind.classname()
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl<B: Backend> Drop for Transaction<'_, B> {
    fn drop(&mut self) {
        if self.status == Status::Active {
            self.abandon_copy();

            if self.kind != Kind::Autocommit {
                let _span = tracing::debug_span!(
                    span_names::ROLLBACK,
                    transaction = %self.description()
                )
                .entered();
                match self.gate().execute("ROLLBACK") {
                    Ok(_) => tracing::debug!("transaction rolled back on drop"),
                    Err(e) => tracing::warn!(error = %e, "implicit rollback failed"),
                }
            }
        }

        let id = self.id;
        self.gate().unregister(id);
    }
}

impl<B: Backend> fmt::Debug for Transaction<'_, B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transaction")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("status", &self.status)
            .finish_non_exhaustive()
    }
}
