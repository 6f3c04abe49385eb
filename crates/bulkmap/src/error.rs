//! Driver error types.

use thiserror::Error;

/// Error raised by an output source.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Driver errors.
#[derive(Debug, Error)]
pub enum Error {
    /// Mapping or reconciliation failed.
    #[error("mapping error: {0}")]
    Core(#[from] bulkmap_core::Error),

    /// The output source failed.
    #[error("output source error: {0}")]
    Source(#[source] BoxError),

    /// The caller cancelled the operation.
    #[error("operation cancelled")]
    Cancelled,
}

impl From<bulkmap_core::ConfigError> for Error {
    fn from(err: bulkmap_core::ConfigError) -> Self {
        Error::Core(err.into())
    }
}

/// Result alias for driver operations.
pub type Result<T> = std::result::Result<T, Error>;
