//! COPY sub-protocol state.

use std::fmt;

/// Whether a COPY stream is open on a connection, and in which direction.
///
/// A connection enters `In` or `Out` when the backend reports that a
/// statement started a COPY. `Out` ends by itself once the server has sent
/// all data; `In` ends only through `end_copy_write`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CopyState {
    /// No COPY in progress.
    #[default]
    Inactive,
    /// Client is sending data to the server.
    In,
    /// Server is sending data to the client.
    Out,
}

impl CopyState {
    /// Check whether a stream is open.
    #[must_use]
    pub fn is_active(self) -> bool {
        self != Self::Inactive
    }
}

impl fmt::Display for CopyState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Inactive => "inactive",
            Self::In => "copy-in",
            Self::Out => "copy-out",
        };
        f.write_str(s)
    }
}
