use std::{error::Error, fmt, io};

/// The exploration module's result type.
pub type Result<T> = std::result::Result<T, ExplorationErr>;

/// All errors that can abort an exploration run.
#[derive(Debug)]
pub enum ExplorationErr {
    /// A wire-protocol or connect failure, fatal for the current round.
    Comms(comms::CommsErr),
    /// A model, training or artifact failure.
    Model(bnn::BnnErr),
    /// A request whose dimensionality does not match the classifier's model.
    DimensionMismatch { got: usize, expected: usize },
    /// The run configuration could not be parsed.
    Config(serde_json::Error),
    /// An unrecognized run mode on the command line.
    UnknownMode(String),
    /// An underlying I/O error not covered by the above variants.
    Io(io::Error),
}

impl fmt::Display for ExplorationErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Comms(e) => write!(f, "session failed: {e}"),
            Self::Model(e) => write!(f, "model error: {e}"),
            Self::DimensionMismatch { got, expected } => {
                write!(f, "request has {got} dimension(s), the model expects {expected}")
            }
            Self::Config(e) => write!(f, "invalid config: {e}"),
            Self::UnknownMode(mode) => {
                write!(f, "unknown mode {mode:?}, expected train, explore or full")
            }
            Self::Io(e) => write!(f, "io error: {e}"),
        }
    }
}

impl Error for ExplorationErr {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Comms(e) => Some(e),
            Self::Model(e) => Some(e),
            Self::Config(e) => Some(e),
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<comms::CommsErr> for ExplorationErr {
    fn from(value: comms::CommsErr) -> Self {
        Self::Comms(value)
    }
}

impl From<bnn::BnnErr> for ExplorationErr {
    fn from(value: bnn::BnnErr) -> Self {
        Self::Model(value)
    }
}

impl From<serde_json::Error> for ExplorationErr {
    fn from(value: serde_json::Error) -> Self {
        Self::Config(value)
    }
}

impl From<io::Error> for ExplorationErr {
    fn from(value: io::Error) -> Self {
        Self::Io(value)
    }
}
