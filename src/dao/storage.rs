use std::error::Error;
use thiserror::Error;

/// Result alias for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Error raised by question bank backends regardless of where questions live.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The backend could not be reached.
    #[error("storage unavailable: {message}")]
    Unavailable {
        /// What was being attempted.
        message: String,
        /// Underlying backend error.
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
    /// The backend answered with data that cannot be decoded.
    #[error("stored quiz data is corrupted: {message}")]
    Corrupted {
        /// What was being decoded.
        message: String,
        /// Underlying decoding error.
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
}

impl StorageError {
    /// Construct an unavailable error from any backend failure.
    pub fn unavailable(message: String, source: impl Error + Send + Sync + 'static) -> Self {
        StorageError::Unavailable {
            message,
            source: Box::new(source),
        }
    }

    /// Construct an error for data the backend returned but that cannot be decoded.
    pub fn corrupted(message: String, source: impl Error + Send + Sync + 'static) -> Self {
        StorageError::Corrupted {
            message,
            source: Box::new(source),
        }
    }
}
