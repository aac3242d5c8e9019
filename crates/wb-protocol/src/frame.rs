//! Newline-delimited framing for protocol messages.
//!
//! Each message is one compact JSON document followed by `\n`. Compact JSON
//! never contains a raw newline, so the delimiter is unambiguous and several
//! messages arriving in one read are split correctly. The decoder is
//! stateful and owned per connection: bytes left after a frame stay buffered
//! for the next call.

use std::io::{self, Read, Write};

use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

/// Largest request frame the daemon accepts.
pub const MAX_REQUEST_FRAME_BYTES: usize = 1024 * 1024;

/// Largest response frame the client accepts. Network captures with bodies
/// can be large.
pub const MAX_RESPONSE_FRAME_BYTES: usize = 64 * 1024 * 1024;

const READ_CHUNK_BYTES: usize = 8 * 1024;

/// Errors raised while framing or decoding messages.
#[derive(Debug, Error)]
pub enum FrameError {
    /// Reading from or writing to the stream failed.
    #[error("transport I/O failed: {0}")]
    Io(#[from] io::Error),
    /// A frame exceeded the configured limit.
    #[error("frame of {size} bytes exceeds the {limit} byte limit")]
    TooLarge {
        /// Bytes buffered when the limit tripped.
        size: usize,
        /// Configured limit.
        limit: usize,
    },
    /// The stream ended part-way through a frame.
    #[error("stream closed with {bytes} bytes of an unterminated frame")]
    Truncated {
        /// Bytes left in the buffer.
        bytes: usize,
    },
    /// A complete frame did not contain the expected JSON document.
    #[error("malformed frame: {source}")]
    Malformed {
        /// Underlying JSON error.
        #[source]
        source: serde_json::Error,
    },
    /// A message could not be serialised.
    #[error("failed to encode message: {source}")]
    Encode {
        /// Underlying JSON error.
        #[source]
        source: serde_json::Error,
    },
}

impl FrameError {
    /// Whether the error came from a read or write deadline expiring.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            Self::Io(error)
                if matches!(error.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut)
        )
    }
}

/// Incremental decoder that turns pushed bytes into frames.
#[derive(Debug)]
pub struct FrameDecoder {
    buffer: Vec<u8>,
    scanned: usize,
    limit: usize,
}

impl FrameDecoder {
    /// Creates a decoder rejecting frames longer than `limit` bytes.
    #[must_use]
    pub const fn new(limit: usize) -> Self {
        Self {
            buffer: Vec::new(),
            scanned: 0,
            limit,
        }
    }

    /// Appends bytes read from the stream.
    pub fn push(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);
    }

    /// Number of buffered bytes not yet returned as a frame.
    #[must_use]
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Returns the next complete frame without its delimiter.
    ///
    /// Blank lines are skipped. `Ok(None)` means more bytes are needed.
    ///
    /// # Errors
    ///
    /// Returns [`FrameError::TooLarge`] when a frame, complete or not, exceeds
    /// the limit. The buffer is discarded because the stream can no longer be
    /// resynchronised.
    pub fn next_frame(&mut self) -> Result<Option<Vec<u8>>, FrameError> {
        loop {
            let unscanned = self.buffer.get(self.scanned..).unwrap_or_default();
            let Some(offset) = unscanned.iter().position(|byte| *byte == b'\n') else {
                self.scanned = self.buffer.len();
                return self.check_limit(self.buffer.len()).map(|()| None);
            };
            let end = self.scanned + offset;
            let mut frame: Vec<u8> = self.buffer.drain(..=end).collect();
            self.scanned = 0;
            frame.pop();
            if frame.last() == Some(&b'\r') {
                frame.pop();
            }
            self.check_limit(frame.len())?;
            if frame.iter().all(u8::is_ascii_whitespace) {
                continue;
            }
            return Ok(Some(frame));
        }
    }

    /// Signals end of stream.
    ///
    /// # Errors
    ///
    /// Returns [`FrameError::Truncated`] when bytes of an unterminated frame
    /// remain buffered.
    pub fn finish(&mut self) -> Result<(), FrameError> {
        let bytes = self.buffer.len();
        let only_whitespace = self.buffer.iter().all(u8::is_ascii_whitespace);
        self.buffer.clear();
        self.scanned = 0;
        if only_whitespace {
            Ok(())
        } else {
            Err(FrameError::Truncated { bytes })
        }
    }

    fn check_limit(&mut self, size: usize) -> Result<(), FrameError> {
        if size > self.limit {
            self.buffer.clear();
            self.scanned = 0;
            return Err(FrameError::TooLarge {
                size,
                limit: self.limit,
            });
        }
        Ok(())
    }
}

/// Reads frames from a blocking stream.
#[derive(Debug)]
pub struct FrameReader<R> {
    inner: R,
    decoder: FrameDecoder,
    chunk: Vec<u8>,
}

impl<R: Read> FrameReader<R> {
    /// Wraps `inner`, rejecting frames longer than `limit` bytes.
    pub fn new(inner: R, limit: usize) -> Self {
        Self {
            inner,
            decoder: FrameDecoder::new(limit),
            chunk: vec![0; READ_CHUNK_BYTES],
        }
    }

    /// Reads the next frame. `Ok(None)` signals a clean end of stream.
    ///
    /// # Errors
    ///
    /// Propagates I/O failures (including read timeouts) and the decoder's
    /// size and truncation errors.
    pub fn read_frame(&mut self) -> Result<Option<Vec<u8>>, FrameError> {
        loop {
            if let Some(frame) = self.decoder.next_frame()? {
                return Ok(Some(frame));
            }
            let read = match self.inner.read(&mut self.chunk) {
                Ok(read) => read,
                Err(error) if error.kind() == io::ErrorKind::Interrupted => continue,
                Err(error) => return Err(FrameError::Io(error)),
            };
            if read == 0 {
                self.decoder.finish()?;
                return Ok(None);
            }
            self.decoder
                .push(self.chunk.get(..read).unwrap_or_default());
        }
    }

    /// Reads and decodes the next message.
    ///
    /// # Errors
    ///
    /// As [`Self::read_frame`], plus [`FrameError::Malformed`] when the frame
    /// is not a valid `T`.
    pub fn read_message<T: DeserializeOwned>(&mut self) -> Result<Option<T>, FrameError> {
        self.read_frame()?.map(|frame| decode(&frame)).transpose()
    }

    /// Borrows the underlying stream.
    pub const fn get_ref(&self) -> &R {
        &self.inner
    }

    /// Mutably borrows the underlying stream.
    pub const fn get_mut(&mut self) -> &mut R {
        &mut self.inner
    }
}

/// Decodes one frame.
///
/// # Errors
///
/// Returns [`FrameError::Malformed`] when the bytes are not a valid `T`.
pub fn decode<T: DeserializeOwned>(frame: &[u8]) -> Result<T, FrameError> {
    serde_json::from_slice(frame).map_err(|source| FrameError::Malformed { source })
}

/// Encodes a message as one delimited frame.
///
/// # Errors
///
/// Returns [`FrameError::Encode`] when serialisation fails.
pub fn encode<T: Serialize>(message: &T) -> Result<Vec<u8>, FrameError> {
    let mut bytes = serde_json::to_vec(message).map_err(|source| FrameError::Encode { source })?;
    bytes.push(b'\n');
    Ok(bytes)
}

/// Writes one framed message and flushes the stream.
///
/// # Errors
///
/// Returns encoding or I/O failures.
pub fn write_frame<W: Write, T: Serialize>(writer: &mut W, message: &T) -> Result<(), FrameError> {
    let bytes = encode(message)?;
    writer.write_all(&bytes)?;
    writer.flush()?;
    Ok(())
}
