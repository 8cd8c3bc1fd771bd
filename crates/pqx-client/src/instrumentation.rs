//! Tracing instrumentation for database operations.
//!
//! Every statement that passes through a connection is logged at `debug`
//! level with its operation verb and a sanitized copy of its text. Transaction
//! boundaries and COPY sessions run inside `debug` spans named after the
//! constants in [`span_names`].
//!
//! Literal values are replaced by a placeholder before statements reach the
//! logs, unless sanitization is disabled in the [`Config`](crate::Config).

/// Database system identifier.
pub const DB_SYSTEM: &str = "postgresql";

/// Span names for database operations.
pub mod span_names {
    /// Span name for statement execution.
    pub const EXECUTE: &str = "pqx.execute";
    /// Span name for beginning a transaction.
    pub const BEGIN_TRANSACTION: &str = "pqx.begin_transaction";
    /// Span name for committing a transaction.
    pub const COMMIT: &str = "pqx.commit";
    /// Span name for rolling back a transaction.
    pub const ROLLBACK: &str = "pqx.rollback";
    /// Span name for savepoint operations.
    pub const SAVEPOINT: &str = "pqx.savepoint";
    /// Span name for a COPY ... FROM STDIN session.
    pub const COPY_IN: &str = "pqx.copy_in";
    /// Span name for a COPY ... TO STDOUT session.
    pub const COPY_OUT: &str = "pqx.copy_out";
}

/// Configuration for SQL statement sanitization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SanitizationConfig {
    /// Whether to sanitize SQL statements.
    pub enabled: bool,
    /// Maximum length of statement to record.
    pub max_length: usize,
    /// Placeholder to use for sanitized values.
    pub placeholder: String,
}

impl Default for SanitizationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_length: 2048,
            placeholder: "?".to_string(),
        }
    }
}

impl SanitizationConfig {
    /// Create a configuration that doesn't sanitize statements.
    #[must_use]
    pub fn no_sanitization() -> Self {
        Self {
            enabled: false,
            max_length: usize::MAX,
            placeholder: String::new(),
        }
    }

    /// Sanitize a SQL statement according to the configuration.
    #[must_use]
    pub fn sanitize(&self, sql: &str) -> String {
        if !self.enabled {
            return truncate_string(sql, self.max_length);
        }

        let sanitized = sanitize_sql(sql, &self.placeholder);
        truncate_string(&sanitized, self.max_length)
    }
}

/// Replace string and numeric literals with a placeholder.
///
/// Only single quotes delimit literals in PostgreSQL; double quotes are
/// identifiers and are kept. Positional parameters (`$1`) are kept.
fn sanitize_sql(sql: &str, placeholder: &str) -> String {
    let mut result = String::with_capacity(sql.len());
    let mut chars = sql.chars().peekable();
    let mut in_string = false;

    while let Some(c) = chars.next() {
        if in_string {
            if c == '\'' {
                // Doubled quote is an escaped quote
                if chars.peek() == Some(&'\'') {
                    chars.next();
                    continue;
                }
                in_string = false;
                result.push_str(placeholder);
            }
            continue;
        }

        if c == '\'' {
            in_string = true;
            continue;
        }

        if c.is_ascii_digit()
            && !result.ends_with(|ch: char| ch.is_alphanumeric() || ch == '_' || ch == '$')
        {
            while chars
                .peek()
                .is_some_and(|ch| ch.is_ascii_digit() || *ch == '.')
            {
                chars.next();
            }
            result.push_str(placeholder);
            continue;
        }

        result.push(c);
    }

    if in_string {
        result.push_str(placeholder);
    }

    result
}

/// Truncate a string to at most `max_len` bytes, marking the cut with `...`.
fn truncate_string(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        return s.to_string();
    }

    let mut end = max_len.saturating_sub(3);
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &s[..end])
}

/// Extract the operation type from a SQL statement.
#[must_use]
pub fn extract_operation(sql: &str) -> &'static str {
    let sql_upper = sql.trim_start().to_uppercase();

    const VERBS: &[(&str, &str)] = &[
        ("SELECT", "SELECT"),
        ("INSERT", "INSERT"),
        ("UPDATE", "UPDATE"),
        ("DELETE", "DELETE"),
        ("WITH", "SELECT"),
        ("COPY", "COPY"),
        ("BEGIN", "BEGIN"),
        ("START TRANSACTION", "BEGIN"),
        ("COMMIT", "COMMIT"),
        ("ROLLBACK TO", "SAVEPOINT"),
        ("ROLLBACK", "ROLLBACK"),
        ("SAVEPOINT", "SAVEPOINT"),
        ("RELEASE", "SAVEPOINT"),
        ("SET", "SET"),
        ("SHOW", "SHOW"),
        ("EXECUTE", "EXECUTE"),
        ("CREATE", "CREATE"),
        ("ALTER", "ALTER"),
        ("DROP", "DROP"),
        ("TRUNCATE", "TRUNCATE"),
    ];

    VERBS
        .iter()
        .find(|(prefix, _)| sql_upper.starts_with(prefix))
        .map_or("OTHER", |(_, op)| op)
}
