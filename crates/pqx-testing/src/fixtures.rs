//! Test fixtures and data for pqx tests.

use pqx_client::{Config, Connection, Result, esc_bin};

use crate::mock_backend::{MockBackend, MockBackendBuilder, MockHandle, MockResponse};

/// Open a connection on an empty mock script.
pub fn connect() -> Result<(Connection<MockBackend>, MockHandle)> {
    connect_with(MockBackend::builder(), Config::new())
}

/// Open a connection on a scripted mock.
pub fn connect_with(
    builder: MockBackendBuilder,
    config: Config,
) -> Result<(Connection<MockBackend>, MockHandle)> {
    let backend = builder.build();
    let handle = backend.handle();
    let conn = Connection::new(backend, config)?;
    Ok((conn, handle))
}

/// Table contents in COPY text format.
#[derive(Debug, Clone, Default)]
pub struct CopyFixture {
    /// Target table.
    pub table: String,
    /// Rows; `None` cells are NULL.
    pub rows: Vec<Vec<Option<String>>>,
}

impl CopyFixture {
    /// Create an empty fixture for `table`.
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            rows: Vec::new(),
        }
    }

    /// Append a row.
    #[must_use]
    pub fn with_row<I, S>(mut self, cells: I) -> Self
    where
        I: IntoIterator<Item = Option<S>>,
        S: Into<String>,
    {
        self.rows
            .push(cells.into_iter().map(|c| c.map(Into::into)).collect());
        self
    }

    /// `COPY <table> FROM STDIN`
    pub fn copy_from_sql(&self) -> String {
        format!("COPY {} FROM STDIN", self.table)
    }

    /// `COPY <table> TO STDOUT`
    pub fn copy_to_sql(&self) -> String {
        format!("COPY {} TO STDOUT", self.table)
    }

    /// Rows as COPY text lines, without terminators.
    pub fn lines(&self) -> Vec<String> {
        self.rows
            .iter()
            .map(|row| {
                row.iter()
                    .map(|cell| cell.as_deref().map_or_else(|| "\\N".to_string(), escape_copy_text))
                    .collect::<Vec<_>>()
                    .join("\t")
            })
            .collect()
    }

    /// Scripted response that streams these rows out.
    pub fn copy_out_response(&self) -> MockResponse {
        MockResponse::copy_out(self.lines())
    }
}

/// A bytea value as it appears in a COPY text cell.
pub fn bytea_cell(data: &[u8]) -> String {
    escape_copy_text(&esc_bin(data))
}

/// Escape a cell for COPY text format.
pub fn escape_copy_text(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\t' => out.push_str("\\t"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            _ => out.push(c),
        }
    }
    out
}
