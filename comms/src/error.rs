use std::{error::Error, fmt, io};

/// The comms module's result type.
pub type Result<T> = std::result::Result<T, CommsErr>;

/// Failures of the explorer link.
///
/// A peer that closes the stream at a request-frame boundary is *not* an
/// error: `ExplorerLink::recv_request` reports that as `Ok(None)`.
#[derive(Debug)]
pub enum CommsErr {
    /// Transport connect attempts exhausted without reaching the explorer.
    Connect { attempts: usize, source: io::Error },
    /// The explorer rejected the handshake with an unexpected reply.
    Handshake { reply: String },
    /// The stream was closed in the middle of a request frame.
    TruncatedFrame { got: usize, expected: usize },
    /// Any other transport fault while streaming.
    Io(io::Error),
}

impl fmt::Display for CommsErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommsErr::Connect { attempts, source } => {
                write!(f, "explorer unreachable after {attempts} attempt(s): {source}")
            }
            CommsErr::Handshake { reply } => {
                write!(f, "handshake rejected, expected \"OK\\n\", got {reply:?}")
            }
            CommsErr::TruncatedFrame { got, expected } => {
                write!(f, "stream closed mid-frame: got {got} of {expected} bytes")
            }
            CommsErr::Io(e) => write!(f, "io error: {e}"),
        }
    }
}

impl Error for CommsErr {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            CommsErr::Connect { source, .. } => Some(source),
            CommsErr::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for CommsErr {
    fn from(value: io::Error) -> Self {
        Self::Io(value)
    }
}
