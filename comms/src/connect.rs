use std::{net::SocketAddr, num::NonZeroUsize, time::Duration};

use log::{debug, warn};
use tokio::{
    io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt},
    net::TcpStream,
    time,
};

use crate::{CommsErr, ExplorerLink, Result, protocol};

/// Connect-phase budget for reaching the explorer endpoint.
#[derive(Debug, Clone)]
pub struct ConnectConfig {
    /// Maximum transport connect attempts; `None` retries forever.
    pub max_attempts: Option<NonZeroUsize>,
    /// Pause between attempts.
    pub retry_delay: Duration,
    /// Attempt exactly once and fail immediately instead of retrying.
    pub fail_fast: bool,
}

impl Default for ConnectConfig {
    fn default() -> Self {
        Self {
            max_attempts: NonZeroUsize::new(10),
            retry_delay: Duration::from_millis(100),
            fail_fast: false,
        }
    }
}

/// Opens a connection to the explorer and negotiates the dimensionality.
///
/// Transport connect attempts are repeated within the configured budget, the
/// explorer usually needs a moment to start listening. The handshake itself
/// is never retried: a rejected acknowledgment closes the stream and fails
/// the round.
///
/// # Arguments
/// * `addr` - The explorer's endpoint.
/// * `ndim` - Dimensionality of the candidate points, fixed for the link's
///   lifetime.
/// * `config` - The connect-phase retry budget.
///
/// # Returns
/// An established link, or a `CommsErr` describing why the session could not
/// begin.
pub async fn establish(
    addr: SocketAddr,
    ndim: NonZeroUsize,
    config: &ConnectConfig,
) -> Result<ExplorerLink<TcpStream>> {
    let stream = try_connect(addr, config).await?;
    handshake(stream, ndim).await
}

/// Performs the dimensionality handshake over an already-open stream.
///
/// Writes `ndim` as a big-endian signed 64-bit integer, then requires the
/// explorer to acknowledge with exactly `"OK\n"`. On any failure the stream
/// is dropped before the error propagates.
pub async fn handshake<S>(mut stream: S, ndim: NonZeroUsize) -> Result<ExplorerLink<S>>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let frame = (ndim.get() as i64).to_be_bytes();
    stream.write_all(&frame).await?;
    stream.flush().await?;

    let mut buf = [0u8; protocol::ACK_LIMIT];
    let n = stream.read(&mut buf).await?;
    if &buf[..n] != protocol::ACK_OK {
        let reply = String::from_utf8_lossy(&buf[..n]).into_owned();
        return Err(CommsErr::Handshake { reply });
    }

    debug!(ndim = ndim.get(); "handshake accepted");
    Ok(ExplorerLink::new(stream, ndim))
}

async fn try_connect(addr: SocketAddr, config: &ConnectConfig) -> Result<TcpStream> {
    let mut attempts = 0;
    loop {
        attempts += 1;
        match TcpStream::connect(addr).await {
            Ok(stream) => {
                debug!(attempts = attempts; "transport connected");
                return Ok(stream);
            }
            Err(source) => {
                let exhausted = config.fail_fast
                    || config.max_attempts.is_some_and(|max| attempts >= max.get());
                if exhausted {
                    return Err(CommsErr::Connect { attempts, source });
                }

                warn!(attempts = attempts; "explorer not reachable yet, retrying");
                time::sleep(config.retry_delay).await;
            }
        }
    }
}
