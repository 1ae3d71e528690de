//! The streaming half of the explorer protocol.

use std::num::NonZeroUsize;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::{CommsErr, Result, protocol};

/// An established exploration link.
///
/// Owns the stream for the duration of one session; dropping the link closes
/// the connection. Request frames are `ndim` big-endian doubles with no
/// length prefix, responses are a single byte.
#[derive(Debug)]
pub struct ExplorerLink<S> {
    stream: S,
    ndim: NonZeroUsize,
    buf: Vec<u8>,
}

impl<S> ExplorerLink<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Creates a link over a stream whose handshake already succeeded.
    pub(crate) fn new(stream: S, ndim: NonZeroUsize) -> Self {
        Self {
            stream,
            ndim,
            buf: vec![0; ndim.get() * protocol::COORD_SIZE],
        }
    }

    /// Returns the dimensionality negotiated during the handshake.
    pub fn ndim(&self) -> usize {
        self.ndim.get()
    }

    /// Waits for the next candidate point from the explorer.
    ///
    /// # Returns
    /// * `Ok(Some(point))` - A decoded request of exactly `ndim` values.
    /// * `Ok(None)` - The explorer closed the stream at a frame boundary:
    ///   the session is over. Not an error.
    /// * `Err(CommsErr::TruncatedFrame)` - The stream was closed after a
    ///   partial frame. A protocol violation, fatal for the round.
    pub async fn recv_request(&mut self) -> Result<Option<Vec<f64>>> {
        let expected = self.buf.len();
        let mut filled = 0;

        while filled < expected {
            let n = self.stream.read(&mut self.buf[filled..]).await?;
            if n == 0 {
                if filled == 0 {
                    return Ok(None);
                }
                return Err(CommsErr::TruncatedFrame {
                    got: filled,
                    expected,
                });
            }
            filled += n;
        }

        let point = self
            .buf
            .chunks_exact(protocol::COORD_SIZE)
            // SAFETY: chunks_exact yields slices of exactly COORD_SIZE bytes.
            .map(|chunk| f64::from_be_bytes(chunk.try_into().unwrap()))
            .collect();

        Ok(Some(point))
    }

    /// Sends the classification for the last received point.
    ///
    /// Any I/O fault here is fatal and aborts the round.
    pub async fn send_response(&mut self, valid: bool) -> Result<()> {
        let byte = if valid {
            protocol::RESPONSE_VALID
        } else {
            protocol::RESPONSE_INVALID
        };

        self.stream.write_all(&[byte]).await?;
        self.stream.flush().await?;
        Ok(())
    }
}
