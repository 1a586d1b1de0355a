use std::fmt;

/// Errors returned by the index, the kernel and the estimator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DensityError {
    /// Malformed construction parameters; nothing was computed.
    InvalidInput(String),
    /// A particle found no usable neighbour inside its kernel support.
    /// The whole estimation is abandoned.
    NoNeighbors { particle: usize },
    /// The caller raised the cancellation flag between particles.
    Cancelled,
}

impl DensityError {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        DensityError::InvalidInput(msg.into())
    }
}

impl fmt::Display for DensityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DensityError::InvalidInput(msg) => write!(f, "invalid input: {msg}"),
            DensityError::NoNeighbors { particle } => write!(
                f,
                "found no neighbour for particle {particle} within its kernel support"
            ),
            DensityError::Cancelled => write!(f, "density estimation cancelled"),
        }
    }
}

impl std::error::Error for DensityError {}

pub type Result<T> = std::result::Result<T, DensityError>;
