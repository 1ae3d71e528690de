use std::{
    error::Error,
    fmt::{self, Display},
    io,
};

/// The result type used in the entire model module.
pub type Result<T> = std::result::Result<T, BnnErr>;

/// The model module's error type.
#[derive(Debug)]
pub enum BnnErr {
    SizeMismatch {
        what: &'static str,
        got: usize,
        expected: usize,
    },
    /// A persisted artifact is missing a tensor or holds one with the wrong
    /// dtype or shape.
    BadArtifact {
        name: String,
    },
    Artifact(safetensors::SafeTensorError),
    Io(io::Error),
}

impl Display for BnnErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BnnErr::SizeMismatch {
                what,
                got,
                expected,
            } => write!(
                f,
                "size mismatch for {what}: got {got}, expected {expected}"
            ),
            BnnErr::BadArtifact { name } => {
                write!(f, "artifact tensor {name:?} is missing or malformed")
            }
            BnnErr::Artifact(e) => write!(f, "artifact error: {e}"),
            BnnErr::Io(e) => write!(f, "io error: {e}"),
        }
    }
}

impl Error for BnnErr {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            BnnErr::Artifact(e) => Some(e),
            BnnErr::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for BnnErr {
    fn from(value: io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<safetensors::SafeTensorError> for BnnErr {
    fn from(value: safetensors::SafeTensorError) -> Self {
        Self::Artifact(value)
    }
}
