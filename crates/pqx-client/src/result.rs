//! Statement results as handed back by the backend.
//!
//! Results are opaque products of the backend: the core only inspects the
//! status (to follow COPY mode) and the command tag. Cell values stay in
//! server text format.

use std::fmt;

/// Kind of result a statement produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResultStatus {
    /// Command completed without returning rows.
    CommandOk,
    /// Query returned a (possibly empty) set of rows.
    TuplesOk,
    /// The query string was empty.
    EmptyQuery,
    /// The server is ready to receive COPY data.
    CopyIn,
    /// The server is about to send COPY data.
    CopyOut,
}

impl fmt::Display for ResultStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::CommandOk => "command ok",
            Self::TuplesOk => "tuples ok",
            Self::EmptyQuery => "empty query",
            Self::CopyIn => "copy in",
            Self::CopyOut => "copy out",
        };
        f.write_str(s)
    }
}

/// Result of executing one statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryResult {
    /// Result kind.
    pub status: ResultStatus,
    /// Command tag, e.g. `INSERT 0 3` or `COPY 10`.
    pub command_tag: String,
    /// Column names, empty unless the status is [`ResultStatus::TuplesOk`].
    pub columns: Vec<String>,
    /// Rows of text-format cells; `None` is SQL NULL.
    pub rows: Vec<Vec<Option<String>>>,
}

impl QueryResult {
    /// A completed command with the given tag.
    #[must_use]
    pub fn command(tag: impl Into<String>) -> Self {
        Self {
            status: ResultStatus::CommandOk,
            command_tag: tag.into(),
            columns: Vec::new(),
            rows: Vec::new(),
        }
    }

    /// A row set.
    #[must_use]
    pub fn rows(columns: Vec<String>, rows: Vec<Vec<Option<String>>>) -> Self {
        let command_tag = format!("SELECT {}", rows.len());
        Self {
            status: ResultStatus::TuplesOk,
            command_tag,
            columns,
            rows,
        }
    }

    /// Result of an empty query string.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            status: ResultStatus::EmptyQuery,
            command_tag: String::new(),
            columns: Vec::new(),
            rows: Vec::new(),
        }
    }

    /// The server is waiting for COPY data.
    #[must_use]
    pub fn copy_in() -> Self {
        Self {
            status: ResultStatus::CopyIn,
            ..Self::empty()
        }
    }

    /// The server is about to stream COPY data.
    #[must_use]
    pub fn copy_out() -> Self {
        Self {
            status: ResultStatus::CopyOut,
            ..Self::empty()
        }
    }

    /// Rows affected, parsed from the trailing count of the command tag.
    ///
    /// Returns `None` for commands that carry no count (`BEGIN`, `SET`, ...).
    #[must_use]
    pub fn rows_affected(&self) -> Option<u64> {
        let mut words = self.command_tag.split_ascii_whitespace();
        let verb = words.next()?;
        match verb {
            "INSERT" | "UPDATE" | "DELETE" | "SELECT" | "MERGE" | "MOVE" | "FETCH" | "COPY" => {
                words.next_back()?.parse().ok()
            }
            _ => None,
        }
    }

    /// Number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the result holds no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Position of a column by name.
    #[must_use]
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Raw text of one cell. `None` for NULL or an out-of-range position.
    #[must_use]
    pub fn get(&self, row: usize, column: usize) -> Option<&str> {
        self.rows.get(row)?.get(column)?.as_deref()
    }
}
