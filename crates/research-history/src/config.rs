//! Store configuration: storage key and every truncation/eviction limit.
//!
//! Defaults reproduce the limits the history format has always used. A
//! config file only needs the fields it overrides:
//!
//! ```toml
//! storage_key = "researchHistory"
//! max_records = 15
//! max_bytes = 4194304
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Key under which the whole collection is persisted.
pub const DEFAULT_STORAGE_KEY: &str = "researchHistory";

/// Storage budget for the serialized collection (4 MiB).
pub const DEFAULT_MAX_BYTES: usize = 4 * 1024 * 1024;

/// Maximum number of records kept.
pub const DEFAULT_MAX_RECORDS: usize = 15;

/// Limits applied when a record is created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CreationLimits {
    pub question_chars: usize,
    pub answer_chars: usize,
    /// Entries of `orderedData` kept, counted from the front.
    pub entries: usize,
    pub content_chars: usize,
    pub output_chars: usize,
}

impl Default for CreationLimits {
    fn default() -> Self {
        Self {
            question_chars: 200,
            answer_chars: 5000,
            entries: 3,
            content_chars: 1000,
            output_chars: 500,
        }
    }
}

/// Limits applied by the second compaction stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShrinkLimits {
    pub answer_chars: usize,
    pub entries: usize,
}

impl Default for ShrinkLimits {
    fn default() -> Self {
        Self {
            answer_chars: 2500,
            entries: 2,
        }
    }
}

/// Shape of the last-resort collection written when every other save
/// attempt was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MinimalLimits {
    pub records: usize,
    pub question_chars: usize,
    pub answer_chars: usize,
}

impl Default for MinimalLimits {
    fn default() -> Self {
        Self {
            records: 5,
            question_chars: 100,
            answer_chars: 500,
        }
    }
}

/// Full configuration for a [`crate::HistoryStore`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    pub storage_key: String,
    pub max_records: usize,
    pub max_bytes: usize,
    pub creation: CreationLimits,
    pub shrink: ShrinkLimits,
    pub minimal: MinimalLimits,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            max_records: DEFAULT_MAX_RECORDS,
            max_bytes: DEFAULT_MAX_BYTES,
            creation: CreationLimits::default(),
            shrink: ShrinkLimits::default(),
            minimal: MinimalLimits::default(),
        }
    }
}

impl HistoryConfig {
    /// Set a custom storage key
    pub fn with_storage_key(mut self, key: impl Into<String>) -> Self {
        self.storage_key = key.into();
        self
    }

    /// Set the byte budget
    pub fn with_max_bytes(mut self, max_bytes: usize) -> Self {
        self.max_bytes = max_bytes;
        self
    }

    /// Set the record cap
    pub fn with_max_records(mut self, max_records: usize) -> Self {
        self.max_records = max_records;
        self
    }

    /// Parse and validate a TOML document.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Reject limits the store cannot honour.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.storage_key.is_empty() {
            return Err(ConfigError::Invalid("storage_key must not be empty".into()));
        }
        if self.max_records == 0 {
            return Err(ConfigError::Invalid("max_records must be at least 1".into()));
        }
        if self.max_bytes == 0 {
            return Err(ConfigError::Invalid("max_bytes must be at least 1".into()));
        }
        if self.shrink.answer_chars > self.creation.answer_chars {
            return Err(ConfigError::Invalid(format!(
                "shrink.answer_chars ({}) exceeds creation.answer_chars ({})",
                self.shrink.answer_chars, self.creation.answer_chars
            )));
        }
        if self.shrink.entries > self.creation.entries {
            return Err(ConfigError::Invalid(format!(
                "shrink.entries ({}) exceeds creation.entries ({})",
                self.shrink.entries, self.creation.entries
            )));
        }
        if self.minimal.records == 0 {
            return Err(ConfigError::Invalid("minimal.records must be at least 1".into()));
        }
        Ok(())
    }
}
