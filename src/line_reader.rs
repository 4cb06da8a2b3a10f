use std::io;

use bytes::{Bytes, BytesMut};
use itertools::Itertools;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt};

/// Longest command line accepted by default, excluding the trailing CRLF.
pub const DEFAULT_MAX_LINE_LEN: usize = 256;

#[derive(Debug, Error)]
pub enum ReadLineError {
    #[error(transparent)]
    Io(#[from] io::Error),
    /// The peer sent more than the permitted number of bytes without a CRLF.
    /// The stream can't be resynchronised after this.
    #[error("line exceeds {max} bytes")]
    TooLong { max: usize },
}

/// Provides a facility to read CRLF-terminated lines of bounded length from a
/// stream.
///
/// In future this could be an `AsyncIterator<Item = Bytes>`.
pub struct LineReader<T: AsyncRead + Unpin> {
    /// Stores data that's been read in but lacks a CRLF.
    buf: BytesMut,
    /// Index in buf from which a valid CRLF pair may appear (and before which
    /// a CRLF sequence hasn't been seen).
    maybe_crlf_from: usize,
    /// Longest line returned, excluding the CRLF.
    max_line_len: usize,
    /// Data source
    reader: T,
    /// On a reading error, this field is set and its value returned once the
    /// buffer is drained of pending lines.
    pending_error: Option<io::Error>,
}

impl<T: AsyncRead + Unpin> LineReader<T> {
    pub fn new(reader: T, max_line_len: usize) -> Self {
        Self {
            buf: BytesMut::new(),
            maybe_crlf_from: 0,
            max_line_len,
            reader,
            pending_error: None,
        }
    }

    /// Reads a line from the internal buffer and/or reader, without its CRLF.
    /// On an end-of-stream condition, returns a None result, discarding any
    /// partly-read line in the internal buffer.
    ///
    /// This function is cancel-safe: its only async operation is a `read_buf`
    /// against the internal `reader`, and so it has the same guarantees:
    /// either a complete read occurs and is processed, or this is cancelled.
    ///
    /// On a read error, the error value is returned after processing all
    /// pending lines in the internal buffer, but calling `read_line` again will
    /// attempt a new read safely. A `TooLong` error is final.
    pub async fn read_line(&mut self) -> Result<Option<Bytes>, ReadLineError> {
        let too_long = ReadLineError::TooLong {
            max: self.max_line_len,
        };

        loop {
            // Scan from one byte before the newest data, in case a \r arrived
            // at the end of the previous read and its \n in this one. Only the
            // unscanned tail of buf is searched, keeping O(bytes_read)
            // behaviour across partial reads.
            if let Some(eoc) = self
                .buf
                .iter()
                .skip(self.maybe_crlf_from)
                .tuple_windows::<(_, _)>()
                .position(|x| x == (&b'\r', &b'\n'))
            {
                let line_len = self.maybe_crlf_from + eoc;
                if line_len > self.max_line_len {
                    return Err(too_long);
                }

                let line = self.buf.split_to(line_len + 2).freeze();
                self.maybe_crlf_from = 0;

                return Ok(Some(line.slice(..line_len)));
            }

            // No CRLF yet: a line plus a lone \r is as much as we'll hold.
            if self.buf.len() > self.max_line_len + 1 {
                return Err(too_long);
            }

            let n_bytes_read = match self.reader.read_buf(&mut self.buf).await {
                Ok(n) => n,
                Err(e) => {
                    self.pending_error = Some(e);
                    0
                },
            };

            self.maybe_crlf_from =
                self.buf.len().saturating_sub(n_bytes_read + 1);

            // Having read nothing, no further line can be parsed out: this is
            // the end of the stream, or the error just stashed.
            if n_bytes_read == 0 {
                return match self.pending_error.take() {
                    Some(e) => Err(e.into()),
                    None => Ok(None),
                };
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use tokio::io::{self, AsyncWriteExt};
    use tokio::task::yield_now;

    use super::*;

    #[tokio::test]
    async fn test_reassembly() {
        // When properly read, each nth line should read b"test:{n}".
        let tests: &[&[u8]] = &[
            // Simple reassembly
            b"test:",
            b"1\r\n",
            // Split LF
            b"test:",
            b"2\r",
            b"\n",
            // Split CRLF
            b"test:",
            b"3",
            b"\r",
            b"\n",
            // Pipelined commands
            b"test:4\r\ntest:5\r\n",
            b"test:6\r",
            b"\ntest:7\r\n",
            b"test:8",
            b"\r\ntest:9\r\n",
        ];

        // A large duplex buffer and explicit yields between writes keep each
        // fragment arriving as its own read.
        let (mut client, server) = io::duplex(4096);

        tokio::spawn(async move {
            for buf in tests {
                client.write_all(buf).await.unwrap();
                yield_now().await;
            }
        });

        let mut lr = LineReader::new(server, DEFAULT_MAX_LINE_LEN);

        for n in 1..=9 {
            assert_eq!(
                lr.read_line().await.unwrap().unwrap(),
                format!("test:{n}")
            );
        }

        assert!(lr.read_line().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_partial_line_discarded_at_eof() {
        let (mut client, server) = io::duplex(64);

        client.write_all(b"status 1\r\nstatus").await.unwrap();
        drop(client);

        let mut lr = LineReader::new(server, DEFAULT_MAX_LINE_LEN);
        assert_eq!(lr.read_line().await.unwrap().unwrap(), "status 1");
        assert!(lr.read_line().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_line_length_limit() {
        let (mut client, server) = io::duplex(64);

        // Exactly at the limit, then one byte over.
        client.write_all(b"12345678\r\n123456789\r\n").await.unwrap();

        let mut lr = LineReader::new(server, 8);
        assert_eq!(lr.read_line().await.unwrap().unwrap(), "12345678");
        assert!(matches!(
            lr.read_line().await,
            Err(ReadLineError::TooLong { max: 8 })
        ));
    }

    #[tokio::test]
    async fn test_unterminated_line_limit() {
        let (mut client, server) = io::duplex(64);

        // Never sends a CRLF, and never closes.
        client.write_all(&[b'x'; 32]).await.unwrap();

        let mut lr = LineReader::new(server, 8);
        assert!(matches!(
            lr.read_line().await,
            Err(ReadLineError::TooLong { max: 8 })
        ));
        drop(client);
    }
}
