//! Storage error types

use thiserror::Error;

/// Errors raised by non-volatile storage backends and the config store
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StorageError {
    /// Access falls outside the backing store
    #[error("Access out of range: {len} bytes at offset {offset} exceeds capacity {capacity}")]
    OutOfRange {
        offset: usize,
        len: usize,
        capacity: usize,
    },
    /// Write stopped part-way (power loss, brown-out)
    #[error("Write interrupted after {written} of {requested} bytes")]
    Interrupted { written: usize, requested: usize },
    /// Underlying medium failed
    #[error("Storage I/O error: {details}")]
    Io { details: String },
    /// Configuration rejected before touching the medium
    #[error("Invalid geofence configuration: {reason}")]
    InvalidConfig { reason: String },
}

impl StorageError {
    pub fn io(context: &str, err: std::io::Error) -> Self {
        StorageError::Io {
            details: format!("{}: {}", context, err),
        }
    }

    /// Whether retrying the same operation later may succeed
    pub fn is_transient(&self) -> bool {
        matches!(self, StorageError::Interrupted { .. } | StorageError::Io { .. })
    }
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;
