//! Line framing for the `COPY` sub-protocol.
//!
//! In text and CSV format every row travels as one line terminated by a
//! newline. The client core exposes lines without their terminator, so the
//! terminator is added on the way out and stripped on the way in here.

use bytes::{BufMut, Bytes, BytesMut};

/// Terminator appended to every outgoing `COPY` line.
pub const COPY_LINE_TERMINATOR: u8 = b'\n';

/// Frame one outgoing line: the line bytes followed by the terminator.
///
/// The caller must not include a terminator of its own.
#[must_use]
pub fn frame_line(line: &[u8]) -> Bytes {
    let mut buf = BytesMut::with_capacity(line.len() + 1);
    buf.put_slice(line);
    buf.put_u8(COPY_LINE_TERMINATOR);
    buf.freeze()
}

/// Strip the terminator from an incoming line.
///
/// A single trailing newline is removed; a line without one is returned
/// unchanged. No bytes are copied.
#[must_use]
pub fn strip_line_terminator(mut line: Bytes) -> Bytes {
    if line.last() == Some(&COPY_LINE_TERMINATOR) {
        line.truncate(line.len() - 1);
    }
    line
}
