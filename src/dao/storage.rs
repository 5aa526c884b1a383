use std::error::Error;
use thiserror::Error;

use crate::dao::paths::{PathError, RoomPath};

/// Result alias for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Error raised by room store backends regardless of where the rooms live.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The path string could not be resolved to a room location.
    #[error("invalid path: {0}")]
    InvalidPath(#[from] PathError),
    /// A keyed write targeted a field that currently holds a non-object value.
    #[error("cannot write `{path}`: parent field is not an object")]
    NotAnObject { path: RoomPath },
    /// The backend cannot be reached.
    #[error("storage unavailable: {message}")]
    Unavailable {
        message: String,
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
}
