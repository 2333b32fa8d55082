//! Error types for research-history

use thiserror::Error;

/// Errors raised by a persistence layer.
#[derive(Error, Debug)]
pub enum StorageError {
    /// The write would push the store past its capacity.
    #[error("quota exceeded writing '{key}': {required} bytes required, capacity {capacity}")]
    QuotaExceeded {
        key: String,
        required: usize,
        capacity: usize,
    },

    /// Key contains characters the backend cannot represent
    #[error("invalid storage key: {0:?}")]
    InvalidKey(String),

    /// Stored value cannot be read back as text
    #[error("corrupt value under '{key}': {reason}")]
    CorruptValue { key: String, reason: String },

    /// Value could not be encoded for storage
    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Underlying I/O failure
    #[error("storage io error: {0}")]
    Io(#[from] std::io::Error),
}

impl StorageError {
    /// True when the write was rejected for lack of space.
    pub fn is_quota_exceeded(&self) -> bool {
        matches!(self, StorageError::QuotaExceeded { .. })
    }
}

/// Errors that can occur while loading a [`crate::HistoryConfig`].
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Config file could not be read
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    /// Config file is not valid TOML or has the wrong shape
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// Config parsed but a limit is unusable
    #[error("invalid config: {0}")]
    Invalid(String),
}
