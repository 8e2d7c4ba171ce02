//! Error types for the state directory and the dispatcher.

use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    /// A persisted primitive exists but does not have the expected shape.
    #[error("corrupt store file {path:?}: {reason}")]
    StoreCorruption { path: PathBuf, reason: String },

    /// A write into the state directory failed.
    #[error("failed to persist {path:?}: {source}")]
    Persistence {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A response file could not be decoded into a known response.
    #[error("invalid serialized response '{reference}': {reason}")]
    InvalidSerializedResponse { reference: String, reason: String },

    /// A response file decoded, but into a state this build cannot serve.
    #[error("corrupt response state '{reference}': {reason}")]
    CorruptState { reference: String, reason: String },

    #[error("I/O error on {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to lock state directory {path:?}: {source}")]
    Lock {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A path pattern that cannot be stored in the newline-joined registry.
    #[error("invalid path pattern {pattern:?}: {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("state directory {0:?} does not exist")]
    MissingDirectory(PathBuf),

    #[error("failed to encode {what}: {source}")]
    Encode {
        what: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

impl StoreError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        StoreError::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn persistence(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        StoreError::Persistence {
            path: path.into(),
            source,
        }
    }

    /// Short label used for the `outcome` metric and log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            StoreError::StoreCorruption { .. } => "store_corruption",
            StoreError::Persistence { .. } => "persistence",
            StoreError::InvalidSerializedResponse { .. } => "invalid_serialized_response",
            StoreError::CorruptState { .. } => "corrupt_state",
            StoreError::Io { .. } => "io",
            StoreError::Lock { .. } => "lock",
            StoreError::InvalidPattern { .. } => "invalid_pattern",
            StoreError::MissingDirectory(_) => "missing_directory",
            StoreError::Encode { .. } => "encode",
        }
    }
}
