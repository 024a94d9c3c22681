//! Error types for oxlut

use thiserror::Error;

use crate::icc::IccError;

/// Result type for oxlut operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in oxlut operations
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// Malformed ICC container or tag payload
    #[error("Format error: {0}")]
    Icc(#[from] IccError),

    /// Malformed grid text, LUT file or calibration file
    #[error("Format error: {0}")]
    Format(String),

    /// Sample count is not a perfect cube, or resolution exceeds a format limit
    #[error("Dimension error: {0}")]
    Dimension(String),

    /// Data failed a semantic check (non-monotonic curve, unrepresentable grid)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Unknown or contradictory configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Cancelled by an external interrupt
    #[error("Operation aborted")]
    Aborted,

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Coarse classification of an [`Error`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Format,
    Dimension,
    Validation,
    Config,
    Aborted,
    Io,
}

impl Error {
    /// The kind of failure, independent of its message
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Icc(_) | Self::Format(_) => ErrorKind::Format,
            Self::Dimension(_) => ErrorKind::Dimension,
            Self::Validation(_) => ErrorKind::Validation,
            Self::Config(_) => ErrorKind::Config,
            Self::Aborted => ErrorKind::Aborted,
            Self::Io(_) => ErrorKind::Io,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Config(err.to_string())
    }
}
