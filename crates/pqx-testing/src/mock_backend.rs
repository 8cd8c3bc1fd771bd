//! Scripted in-memory execution backend.
//!
//! [`MockBackend`] implements [`Backend`] by looking statements up in a
//! script. It keeps just enough protocol state to behave like a real
//! session: it enters and leaves COPY mode, refuses statements while a COPY
//! is open, and remembers session variables.
//!
//! The backend is moved into the [`Connection`](pqx_client::Connection)
//! under test; a [`MockHandle`] shares its state so the test can inspect
//! what happened and change the script as it goes.
//!
//! ```rust
//! use pqx_testing::mock_backend::{MockBackend, MockResponse};
//!
//! let backend = MockBackend::builder()
//!     .with_response("COPY t TO STDOUT", MockResponse::copy_out(["1\ta", "2\tb"]))
//!     .with_variable("timezone", "UTC")
//!     .build();
//! let handle = backend.handle();
//! assert!(handle.calls().is_empty());
//! ```

use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use parking_lot::Mutex;
use pqx_client::{Backend, BackendError, QueryResult};
use pqx_protocol::COPY_LINE_TERMINATOR;
use pqx_types::SqlValue;

/// A failure the mock reports instead of succeeding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockFailure {
    /// Server error with a SQLSTATE code.
    Server {
        /// SQLSTATE code.
        code: String,
        /// Error message.
        message: String,
    },
    /// The link to the server went away.
    ConnectionClosed,
    /// Backend-specific failure.
    Other(String),
}

impl MockFailure {
    /// Create a server failure.
    pub fn server(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Server {
            code: code.into(),
            message: message.into(),
        }
    }

    fn to_error(&self) -> BackendError {
        match self {
            Self::Server { code, message } => BackendError::server(code.clone(), message.clone()),
            Self::ConnectionClosed => BackendError::ConnectionClosed,
            Self::Other(msg) => BackendError::Other(msg.clone()),
        }
    }
}

/// Mock response configuration.
#[derive(Clone)]
pub enum MockResponse {
    /// Return a completed command with this tag.
    Command(String),

    /// Return rows with columns.
    Rows {
        /// Column names.
        columns: Vec<String>,
        /// Row data as text; `None` is NULL.
        rows: Vec<Vec<Option<String>>>,
    },

    /// Enter COPY-in mode.
    CopyIn,

    /// Enter COPY-out mode and stream these lines (without terminators).
    CopyOut(Vec<String>),

    /// Fail the statement.
    Error(MockFailure),

    /// Execute a custom handler.
    Custom(Arc<dyn Fn(&str) -> MockResponse + Send + Sync>),
}

impl fmt::Debug for MockResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Command(tag) => f.debug_tuple("Command").field(tag).finish(),
            Self::Rows { columns, rows } => f
                .debug_struct("Rows")
                .field("columns", columns)
                .field("rows", rows)
                .finish(),
            Self::CopyIn => f.write_str("CopyIn"),
            Self::CopyOut(lines) => f.debug_tuple("CopyOut").field(&lines.len()).finish(),
            Self::Error(failure) => f.debug_tuple("Error").field(failure).finish(),
            Self::Custom(_) => f.debug_tuple("Custom").field(&"<fn>").finish(),
        }
    }
}

impl MockResponse {
    /// Create a single-cell result.
    pub fn scalar(value: impl Into<String>) -> Self {
        Self::Rows {
            columns: vec!["?column?".to_string()],
            rows: vec![vec![Some(value.into())]],
        }
    }

    /// Create a command result with a row count, e.g. `affected("INSERT 0", 3)`.
    pub fn affected(verb: &str, count: u64) -> Self {
        Self::Command(format!("{verb} {count}"))
    }

    /// Create a multi-row result.
    pub fn rows(columns: Vec<String>, rows: Vec<Vec<Option<String>>>) -> Self {
        Self::Rows { columns, rows }
    }

    /// Create a COPY-out result streaming `lines`.
    pub fn copy_out<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::CopyOut(lines.into_iter().map(Into::into).collect())
    }

    /// Create an error response.
    pub fn error(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Error(MockFailure::server(code, message))
    }
}

/// One call the connection made into the backend.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordedCall {
    /// `execute`
    Execute(String),
    /// `execute_params`
    ExecuteParams {
        /// Statement text.
        query: String,
        /// Bound parameters.
        params: Vec<SqlValue>,
    },
    /// `execute_prepared`
    ExecutePrepared {
        /// Prepared statement name.
        statement: String,
        /// Bound parameters.
        params: Vec<SqlValue>,
    },
    /// `get_copy_data`
    GetCopyData,
    /// `put_copy_data`, with the bytes as sent.
    PutCopyData(Bytes),
    /// `put_copy_end`
    PutCopyEnd(Option<String>),
    /// `get_variable`
    GetVariable(String),
    /// `set_variable`
    SetVariable(String, String),
    /// `close`
    Close,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CopyMode {
    Idle,
    In,
    Out,
}

/// One-shot failures, consumed by the next matching call.
#[derive(Debug, Default)]
struct Injected {
    copy_read: Option<MockFailure>,
    copy_write: Option<MockFailure>,
    copy_end: Option<MockFailure>,
    close: Option<MockFailure>,
}

#[derive(Debug)]
struct MockState {
    responses: HashMap<String, MockResponse>,
    default_response: Option<MockResponse>,
    variables: HashMap<String, String>,
    variable_failures: HashMap<String, MockFailure>,
    injected: Injected,
    mode: CopyMode,
    copy_out: VecDeque<Bytes>,
    copy_in: Vec<Bytes>,
    copy_in_lines: u64,
    calls: Vec<RecordedCall>,
    closed: bool,
}

impl MockState {
    fn respond(&mut self, query: &str) -> Result<QueryResult, BackendError> {
        if self.closed {
            return Err(BackendError::ConnectionClosed);
        }
        if self.mode != CopyMode::Idle {
            return Err(BackendError::Other(format!(
                "statement sent during COPY: {query}"
            )));
        }

        let response = self
            .responses
            .get(query)
            .or(self.default_response.as_ref())
            .cloned()
            .unwrap_or_else(|| default_response(query));
        tracing::trace!(query, response = ?response, "mock backend responding");

        self.apply(query, response)
    }

    fn apply(&mut self, query: &str, response: MockResponse) -> Result<QueryResult, BackendError> {
        match response {
            MockResponse::Command(tag) => Ok(QueryResult::command(tag)),
            MockResponse::Rows { columns, rows } => Ok(QueryResult::rows(columns, rows)),
            MockResponse::CopyIn => {
                self.mode = CopyMode::In;
                self.copy_in_lines = 0;
                Ok(QueryResult::copy_in())
            }
            MockResponse::CopyOut(lines) => {
                self.mode = CopyMode::Out;
                self.copy_out = lines
                    .into_iter()
                    .map(|line| {
                        let mut data = line.into_bytes();
                        data.push(COPY_LINE_TERMINATOR);
                        Bytes::from(data)
                    })
                    .collect();
                Ok(QueryResult::copy_out())
            }
            MockResponse::Error(failure) => Err(failure.to_error()),
            MockResponse::Custom(handler) => {
                let response = handler(query);
                self.apply(query, response)
            }
        }
    }
}

/// Response for statements the script does not mention.
///
/// `COPY ... FROM STDIN` and `COPY ... TO STDOUT` (with no data) enter COPY
/// mode; anything else completes with its leading keyword as the tag.
fn default_response(query: &str) -> MockResponse {
    let upper = query.trim().to_uppercase();
    if upper.starts_with("COPY") && upper.ends_with("FROM STDIN") {
        return MockResponse::CopyIn;
    }
    if upper.starts_with("COPY") && upper.ends_with("TO STDOUT") {
        return MockResponse::CopyOut(Vec::new());
    }
    let verb = upper.split_whitespace().next().unwrap_or_default();
    MockResponse::Command(verb.to_string())
}

/// Builder for [`MockBackend`].
#[derive(Debug)]
pub struct MockBackendBuilder {
    responses: HashMap<String, MockResponse>,
    default_response: Option<MockResponse>,
    variables: HashMap<String, String>,
    variable_failures: HashMap<String, MockFailure>,
}

impl MockBackendBuilder {
    /// Create a new builder with an empty script.
    pub fn new() -> Self {
        Self {
            responses: HashMap::new(),
            default_response: None,
            variables: HashMap::new(),
            variable_failures: HashMap::new(),
        }
    }

    /// Add a response for a specific statement.
    #[must_use]
    pub fn with_response(mut self, sql: impl Into<String>, response: MockResponse) -> Self {
        self.responses.insert(sql.into(), response);
        self
    }

    /// Set the response for statements with no scripted response.
    #[must_use]
    pub fn with_default_response(mut self, response: MockResponse) -> Self {
        self.default_response = Some(response);
        self
    }

    /// Give a session variable an initial value.
    #[must_use]
    pub fn with_variable(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.variables.insert(name.into(), value.into());
        self
    }

    /// Make every read or write of a session variable fail.
    #[must_use]
    pub fn with_variable_failure(mut self, name: impl Into<String>, failure: MockFailure) -> Self {
        self.variable_failures.insert(name.into(), failure);
        self
    }

    /// Build the backend.
    pub fn build(self) -> MockBackend {
        let state = MockState {
            responses: self.responses,
            default_response: self.default_response,
            variables: self.variables,
            variable_failures: self.variable_failures,
            injected: Injected::default(),
            mode: CopyMode::Idle,
            copy_out: VecDeque::new(),
            copy_in: Vec::new(),
            copy_in_lines: 0,
            calls: Vec::new(),
            closed: false,
        };
        MockBackend {
            state: Arc::new(Mutex::new(state)),
        }
    }
}

impl Default for MockBackendBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A scripted [`Backend`].
#[derive(Debug)]
pub struct MockBackend {
    state: Arc<Mutex<MockState>>,
}

impl MockBackend {
    /// Create a new builder for the mock backend.
    pub fn builder() -> MockBackendBuilder {
        MockBackendBuilder::new()
    }

    /// Create a backend with an empty script.
    pub fn new() -> Self {
        MockBackendBuilder::new().build()
    }

    /// Get a handle sharing this backend's state.
    pub fn handle(&self) -> MockHandle {
        MockHandle {
            state: Arc::clone(&self.state),
        }
    }
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl Backend for MockBackend {
    fn execute(&mut self, query: &str) -> Result<QueryResult, BackendError> {
        let mut state = self.state.lock();
        state.calls.push(RecordedCall::Execute(query.to_string()));
        state.respond(query)
    }

    fn execute_params(
        &mut self,
        query: &str,
        params: &[SqlValue],
    ) -> Result<QueryResult, BackendError> {
        let mut state = self.state.lock();
        state.calls.push(RecordedCall::ExecuteParams {
            query: query.to_string(),
            params: params.to_vec(),
        });
        state.respond(query)
    }

    fn execute_prepared(
        &mut self,
        statement: &str,
        params: &[SqlValue],
    ) -> Result<QueryResult, BackendError> {
        let mut state = self.state.lock();
        state.calls.push(RecordedCall::ExecutePrepared {
            statement: statement.to_string(),
            params: params.to_vec(),
        });
        if !state.responses.contains_key(statement) {
            return Err(BackendError::server(
                "26000",
                format!("prepared statement \"{statement}\" does not exist"),
            ));
        }
        state.respond(statement)
    }

    fn get_copy_data(&mut self) -> Result<Option<Bytes>, BackendError> {
        let mut state = self.state.lock();
        state.calls.push(RecordedCall::GetCopyData);
        if state.mode != CopyMode::Out {
            return Err(BackendError::Other("no COPY-out in progress".to_string()));
        }
        if let Some(failure) = state.injected.copy_read.take() {
            state.mode = CopyMode::Idle;
            state.copy_out.clear();
            return Err(failure.to_error());
        }

        match state.copy_out.pop_front() {
            Some(chunk) => Ok(Some(chunk)),
            None => {
                state.mode = CopyMode::Idle;
                Ok(None)
            }
        }
    }

    fn put_copy_data(&mut self, data: &[u8]) -> Result<(), BackendError> {
        let mut state = self.state.lock();
        let data = Bytes::copy_from_slice(data);
        state.calls.push(RecordedCall::PutCopyData(data.clone()));
        if state.mode != CopyMode::In {
            return Err(BackendError::Other("no COPY-in in progress".to_string()));
        }
        if let Some(failure) = state.injected.copy_write.take() {
            return Err(failure.to_error());
        }

        state.copy_in.push(data);
        state.copy_in_lines += 1;
        Ok(())
    }

    fn put_copy_end(&mut self, error: Option<&str>) -> Result<QueryResult, BackendError> {
        let mut state = self.state.lock();
        state.calls.push(RecordedCall::PutCopyEnd(error.map(str::to_string)));
        if state.mode != CopyMode::In {
            return Err(BackendError::Other("no COPY-in in progress".to_string()));
        }

        // The server leaves COPY mode whatever the outcome
        state.mode = CopyMode::Idle;
        if let Some(failure) = state.injected.copy_end.take() {
            return Err(failure.to_error());
        }
        if let Some(message) = error {
            return Err(BackendError::server(
                "57014",
                format!("COPY from stdin failed: {message}"),
            ));
        }

        Ok(QueryResult::command(format!("COPY {}", state.copy_in_lines)))
    }

    fn get_variable(&mut self, name: &str) -> Result<String, BackendError> {
        let mut state = self.state.lock();
        state.calls.push(RecordedCall::GetVariable(name.to_string()));
        if let Some(failure) = state.variable_failures.get(name) {
            return Err(failure.to_error());
        }

        state.variables.get(name).cloned().ok_or_else(|| {
            BackendError::server(
                "42704",
                format!("unrecognized configuration parameter \"{name}\""),
            )
        })
    }

    fn set_variable(&mut self, name: &str, value: &str) -> Result<(), BackendError> {
        let mut state = self.state.lock();
        state
            .calls
            .push(RecordedCall::SetVariable(name.to_string(), value.to_string()));
        if let Some(failure) = state.variable_failures.get(name) {
            return Err(failure.to_error());
        }

        state.variables.insert(name.to_string(), value.to_string());
        Ok(())
    }

    fn close(&mut self) -> Result<(), BackendError> {
        let mut state = self.state.lock();
        state.calls.push(RecordedCall::Close);
        state.closed = true;
        match state.injected.close.take() {
            Some(failure) => Err(failure.to_error()),
            None => Ok(()),
        }
    }
}

/// Shared view of a [`MockBackend`]'s state, for inspection and scripting.
#[derive(Debug, Clone)]
pub struct MockHandle {
    state: Arc<Mutex<MockState>>,
}

impl MockHandle {
    /// Every backend call so far, in order.
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.state.lock().calls.clone()
    }

    /// Text of every statement executed so far (statement names for
    /// prepared executions).
    pub fn executed(&self) -> Vec<String> {
        self.state
            .lock()
            .calls
            .iter()
            .filter_map(|call| match call {
                RecordedCall::Execute(query) | RecordedCall::ExecuteParams { query, .. } => {
                    Some(query.clone())
                }
                RecordedCall::ExecutePrepared { statement, .. } => Some(statement.clone()),
                _ => None,
            })
            .collect()
    }

    /// Raw COPY-in chunks accepted so far, terminators included.
    pub fn copy_in_data(&self) -> Vec<Bytes> {
        self.state.lock().copy_in.clone()
    }

    /// Current value of a session variable.
    pub fn variable(&self, name: &str) -> Option<String> {
        self.state.lock().variables.get(name).cloned()
    }

    /// Whether the backend believes a COPY is in progress.
    pub fn in_copy(&self) -> bool {
        self.state.lock().mode != CopyMode::Idle
    }

    /// Whether `close` has been called.
    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    /// Add or replace a scripted response.
    pub fn set_response(&self, sql: impl Into<String>, response: MockResponse) {
        self.state.lock().responses.insert(sql.into(), response);
    }

    /// Change a session variable behind the connection's back.
    pub fn set_variable(&self, name: impl Into<String>, value: impl Into<String>) {
        self.state.lock().variables.insert(name.into(), value.into());
    }

    /// Fail the next `get_copy_data`; the COPY-out ends with it.
    pub fn fail_next_copy_read(&self, failure: MockFailure) {
        self.state.lock().injected.copy_read = Some(failure);
    }

    /// Fail the next `put_copy_data`; the COPY-in stays open.
    pub fn fail_next_copy_write(&self, failure: MockFailure) {
        self.state.lock().injected.copy_write = Some(failure);
    }

    /// Fail the next `put_copy_end`; the COPY-in still ends.
    pub fn fail_next_copy_end(&self, failure: MockFailure) {
        self.state.lock().injected.copy_end = Some(failure);
    }

    /// Fail the next `close`.
    pub fn fail_next_close(&self, failure: MockFailure) {
        self.state.lock().injected.close = Some(failure);
    }
}
