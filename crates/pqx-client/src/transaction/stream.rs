//! Scoped COPY streams on a transaction.

use bytes::Bytes;

use super::Transaction;
use crate::backend::Backend;
use crate::copy::CopyState;
use crate::describe::Named;
use crate::error::{Error, Result};
use crate::instrumentation::span_names;
use crate::result::ResultStatus;

impl<'c, B: Backend> Transaction<'c, B> {
    /// Start a `COPY ... FROM STDIN` and return a writer for its lines.
    ///
    /// # Errors
    ///
    /// [`Error::NotCopyStatement`] if `query` does not put the connection
    /// into COPY-in mode. A COPY-out it started instead is drained first.
    pub fn copy_in(&mut self, query: &str) -> Result<CopyWriter<'_, 'c, B>> {
        let span = tracing::debug_span!(span_names::COPY_IN, transaction = %self.description());
        let result = span.in_scope(|| self.gate().execute(query))?;

        if result.status != ResultStatus::CopyIn {
            self.abandon_copy();
            return Err(Error::NotCopyStatement {
                expected: CopyState::In,
                status: result.status,
            });
        }

        Ok(CopyWriter {
            tx: self,
            lines: 0,
            finished: false,
            span,
        })
    }

    /// Start a `COPY ... TO STDOUT` and return a reader for its lines.
    ///
    /// # Errors
    ///
    /// [`Error::NotCopyStatement`] if `query` does not put the connection
    /// into COPY-out mode. A COPY-in it started instead is ended first.
    pub fn copy_out(&mut self, query: &str) -> Result<CopyReader<'_, 'c, B>> {
        let span = tracing::debug_span!(span_names::COPY_OUT, transaction = %self.description());
        let result = span.in_scope(|| self.gate().execute(query))?;

        if result.status != ResultStatus::CopyOut {
            self.abandon_copy();
            return Err(Error::NotCopyStatement {
                expected: CopyState::Out,
                status: result.status,
            });
        }

        Ok(CopyReader {
            tx: self,
            lines: 0,
            done: false,
            span,
        })
    }
}

/// Writer for an open COPY-in stream.
///
/// Call [`finish`](Self::finish) to end the stream and learn the row count.
/// A writer dropped without finishing still ends the stream, so the
/// connection is usable again; failures on that path are only logged.
pub struct CopyWriter<'t, 'c, B: Backend> {
    tx: &'t mut Transaction<'c, B>,
    lines: u64,
    finished: bool,
    span: tracing::Span,
}

impl<B: Backend> CopyWriter<'_, '_, B> {
    /// Send one line. The line terminator is added here.
    pub fn write_line(&mut self, line: impl AsRef<[u8]>) -> Result<()> {
        let _enter = self.span.enter();
        self.tx.gate().write_copy_line(line.as_ref())?;
        self.lines += 1;
        Ok(())
    }

    /// Lines sent so far.
    #[must_use]
    pub fn lines_written(&self) -> u64 {
        self.lines
    }

    /// End the stream.
    ///
    /// Returns the row count reported by the server, or the number of lines
    /// sent if the server reported none.
    pub fn finish(mut self) -> Result<u64> {
        self.finished = true;
        let _enter = self.span.enter();
        let result = self.tx.gate().end_copy_write()?;
        Ok(result.rows_affected().unwrap_or(self.lines))
    }
}

impl<B: Backend> Drop for CopyWriter<'_, '_, B> {
    fn drop(&mut self) {
        if self.finished {
            return;
        }

        let _enter = self.span.enter();
        if let Err(e) = self.tx.gate().end_copy_write() {
            tracing::warn!(
                error = %e,
                lines = self.lines,
                "failed to end unfinished COPY-in stream"
            );
        }
    }
}

/// Reader for an open COPY-out stream.
///
/// Also an [`Iterator`] over lines. A reader dropped before the end reads
/// and discards the remaining data.
pub struct CopyReader<'t, 'c, B: Backend> {
    tx: &'t mut Transaction<'c, B>,
    lines: u64,
    done: bool,
    span: tracing::Span,
}

impl<B: Backend> CopyReader<'_, '_, B> {
    /// Next line without its terminator, or `None` at the end of the stream.
    ///
    /// Once `None` or an error has been returned, further calls return
    /// `None`.
    pub fn read_line(&mut self) -> Result<Option<Bytes>> {
        if self.done {
            return Ok(None);
        }

        let _enter = self.span.enter();
        match self.tx.gate().read_copy_line() {
            Ok(Some(line)) => {
                self.lines += 1;
                Ok(Some(line))
            }
            Ok(None) => {
                self.done = true;
                Ok(None)
            }
            Err(e) => {
                self.done = true;
                Err(e)
            }
        }
    }

    /// Lines received so far.
    #[must_use]
    pub fn lines_read(&self) -> u64 {
        self.lines
    }
}

impl<B: Backend> Iterator for CopyReader<'_, '_, B> {
    type Item = Result<Bytes>;

    fn next(&mut self) -> Option<Self::Item> {
        self.read_line().transpose()
    }
}

impl<B: Backend> Drop for CopyReader<'_, '_, B> {
    fn drop(&mut self) {
        if self.done {
            return;
        }

        let _enter = self.span.enter();
        self.tx.drain_copy();
    }
}
