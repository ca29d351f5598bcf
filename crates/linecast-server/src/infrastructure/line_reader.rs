//! Bounded newline splitting for inbound text.
//!
//! Lines end at `\n`; a trailing `\r` is stripped so telnet-style clients work.
//! Bytes that are not valid UTF-8 are replaced rather than rejected, and a
//! final line without a terminator is still returned at EOF.  A line longer
//! than the configured limit ends the session with
//! [`ConnectionError::LineTooLong`].

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, BufReader};

use crate::infrastructure::connection::ConnectionError;

/// Reads newline-delimited text with an upper bound on line length.
pub struct LineReader<R> {
    inner: BufReader<R>,
    buf: Vec<u8>,
    max_len: usize,
}

impl<R: AsyncRead + Unpin> LineReader<R> {
    pub fn new(reader: R, max_len: usize) -> Self {
        Self {
            inner: BufReader::new(reader),
            buf: Vec::new(),
            max_len,
        }
    }

    /// Returns the next line without its terminator, or `None` at EOF.
    ///
    /// Not cancel safe: a partially read line is lost if the future is
    /// dropped.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectionError::LineTooLong`] if the line exceeds the limit
    /// and [`ConnectionError::Io`] if the underlying read fails.
    pub async fn next_line(&mut self) -> Result<Option<String>, ConnectionError> {
        self.buf.clear();

        // Room for the longest allowed line plus "\r\n".
        let limit = self.max_len as u64 + 2;
        let n = (&mut self.inner)
            .take(limit)
            .read_until(b'\n', &mut self.buf)
            .await?;

        if n == 0 {
            return Ok(None);
        }

        if self.buf.last() == Some(&b'\n') {
            self.buf.pop();
            if self.buf.last() == Some(&b'\r') {
                self.buf.pop();
            }
        }

        if self.buf.len() > self.max_len {
            return Err(ConnectionError::LineTooLong {
                limit: self.max_len,
            });
        }

        Ok(Some(String::from_utf8_lossy(&self.buf).into_owned()))
    }
}
