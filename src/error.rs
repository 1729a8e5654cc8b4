//! WolfMirror Error Types

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for WolfMirror operations
pub type Result<T> = std::result::Result<T, Error>;

/// WolfMirror error types
#[derive(Error, Debug)]
pub enum Error {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid configuration file: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("Failed to write configuration: {0}")]
    ConfigWrite(#[from] toml::ser::Error),

    // Wire errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    #[error("Stream closed mid-frame: expected {expected} bytes, received {received}")]
    Framing { expected: usize, received: usize },

    #[error("Message of {size} bytes exceeds limit of {limit} bytes")]
    MessageTooLarge { size: usize, limit: usize },

    // Network errors
    #[error("Connection failed to {address}: {reason}")]
    ConnectionFailed { address: String, reason: String },

    #[error("Connection timeout to {0}")]
    ConnectionTimeout(String),

    #[error("Unexpected response from {0}")]
    UnexpectedResponse(String),

    // Local input errors
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("Source file does not exist: {0}")]
    SourceNotFound(PathBuf),

    // Storage errors
    #[error("Storage error at {path}: {source}")]
    Storage {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Check if this error only means a peer should be skipped for this attempt
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Error::Io(_)
                | Error::Serialization(_)
                | Error::Framing { .. }
                | Error::MessageTooLarge { .. }
                | Error::ConnectionFailed { .. }
                | Error::ConnectionTimeout(_)
                | Error::UnexpectedResponse(_)
        )
    }

    /// Check if this error is a rejected local operation
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            Error::InvalidInput(_) | Error::InvalidPath(_) | Error::SourceNotFound(_)
        )
    }

    pub(crate) fn storage(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Storage {
            path: path.into(),
            source,
        }
    }
}
