//! Newline-delimited message framing for the stdio transport.
//!
//! Each message is one line of compact JSON terminated by `\n`:
//!
//! ```text
//! {"jsonrpc":"2.0","id":1,"method":"ping"}\n
//! ```
//!
//! Serialized JSON never contains a raw newline, so the line break is an
//! unambiguous delimiter. A trailing `\r` is tolerated and blank lines are
//! skipped.

use serde::{Serialize, de::DeserializeOwned};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::MAX_MESSAGE_SIZE;
use crate::error::{ProtocolError, ProtocolResult};

/// Encodes a message as one newline-terminated line.
///
/// Outgoing lines are not size-limited; the limit only guards what the
/// server reads.
///
/// # Example
///
/// ```rust
/// use gcal_mcp_protocol::{encode_message, JsonRpcRequest, RequestId};
///
/// let request = JsonRpcRequest::new(RequestId::Number(1), "ping", None);
/// let bytes = encode_message(&request).unwrap();
/// assert_eq!(bytes.last(), Some(&b'\n'));
/// ```
pub fn encode_message<T: Serialize>(message: &T) -> ProtocolResult<Vec<u8>> {
    let mut line = serde_json::to_vec(message)?;
    line.push(b'\n');
    Ok(line)
}

/// Decodes one line (with or without its terminator).
pub fn decode_message<T: DeserializeOwned>(line: &[u8]) -> ProtocolResult<T> {
    Ok(serde_json::from_slice(trim_line(line))?)
}

fn trim_line(line: &[u8]) -> &[u8] {
    let end = line
        .iter()
        .rposition(|b| !b.is_ascii_whitespace())
        .map_or(0, |i| i + 1);
    &line[..end]
}

/// Reads newline-delimited frames from an async byte stream.
pub struct FrameReader<R> {
    reader: R,
    max_size: usize,
    buffer: Vec<u8>,
}

impl<R: AsyncBufRead + Unpin> FrameReader<R> {
    /// Creates a new FrameReader with the default size limit.
    pub fn new(reader: R) -> Self {
        Self::with_max_size(reader, MAX_MESSAGE_SIZE)
    }

    /// Creates a new FrameReader with a custom size limit.
    pub fn with_max_size(reader: R, max_size: usize) -> Self {
        Self {
            reader,
            max_size,
            buffer: Vec::new(),
        }
    }

    /// Reads the next non-blank line.
    ///
    /// Returns `Ok(None)` at end of stream. An unterminated final line is
    /// returned as a frame. A line longer than the limit is consumed and
    /// reported as [`ProtocolError::MessageTooLarge`]; the reader stays
    /// usable afterwards.
    pub async fn read_frame(&mut self) -> ProtocolResult<Option<Vec<u8>>> {
        loop {
            self.buffer.clear();
            let limit = self.max_size as u64 + 1;
            let read = (&mut self.reader)
                .take(limit)
                .read_until(b'\n', &mut self.buffer)
                .await?;

            if read == 0 {
                return Ok(None);
            }

            let terminated = self.buffer.last() == Some(&b'\n');
            if !terminated && self.buffer.len() > self.max_size {
                self.discard_rest_of_line().await?;
                return Err(ProtocolError::MessageTooLarge { max: self.max_size });
            }

            let line = trim_line(&self.buffer);
            if line.len() > self.max_size {
                return Err(ProtocolError::MessageTooLarge { max: self.max_size });
            }
            if line.is_empty() {
                continue;
            }
            return Ok(Some(line.to_vec()));
        }
    }

    /// Reads and decodes the next message.
    pub async fn read_message<T: DeserializeOwned>(&mut self) -> ProtocolResult<Option<T>> {
        match self.read_frame().await? {
            Some(frame) => Ok(Some(serde_json::from_slice(&frame)?)),
            None => Ok(None),
        }
    }

    async fn discard_rest_of_line(&mut self) -> ProtocolResult<()> {
        loop {
            let available = self.reader.fill_buf().await?;
            if available.is_empty() {
                return Ok(());
            }
            match available.iter().position(|b| *b == b'\n') {
                Some(pos) => {
                    self.reader.consume(pos + 1);
                    return Ok(());
                }
                None => {
                    let len = available.len();
                    self.reader.consume(len);
                }
            }
        }
    }

    /// Unwraps this FrameReader, returning the underlying reader.
    pub fn into_inner(self) -> R {
        self.reader
    }
}

/// Writes newline-delimited frames to an async byte stream.
pub struct FrameWriter<W> {
    writer: W,
}

impl<W: AsyncWrite + Unpin> FrameWriter<W> {
    /// Creates a new FrameWriter wrapping the given writer.
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Writes one message and flushes, so the peer sees it immediately.
    pub async fn write_message<T: Serialize>(&mut self, message: &T) -> ProtocolResult<()> {
        let data = encode_message(message)?;
        self.write_frame(&data).await
    }

    /// Writes an already encoded line and flushes.
    pub async fn write_frame(&mut self, line: &[u8]) -> ProtocolResult<()> {
        self.writer.write_all(line).await?;
        self.writer.flush().await?;
        Ok(())
    }

    /// Unwraps this FrameWriter, returning the underlying writer.
    pub fn into_inner(self) -> W {
        self.writer
    }
}
