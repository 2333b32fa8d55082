//! Research History: bounded, quota-aware persisted history of research
//! sessions.
//!
//! A [`HistoryStore`] keeps every saved session (question, answer and a short
//! log of research events) in one collection that is mirrored to a
//! [`KeyValueStore`] under a single key. The collection is bounded by record
//! count and serialized size, heals itself when the persisted value is
//! corrupt, and falls back through a recovery sequence when the backend
//! rejects a write for lack of space.
//!
//! ## Key Components
//!
//! - `HistoryStore`: load / save / get_by_id / delete / clear
//! - `compact`: count cap, field shrinking, oldest-first eviction
//! - `KeyValueStore`: persistence layer, with `MemoryKeyValueStore` and
//!   `FsKeyValueStore` implementations
//! - `HistoryConfig`: storage key and limits, loadable from TOML

pub mod config;
mod error;
pub mod fakes;
pub mod fs_store;
pub mod obs;
pub mod retention;
pub mod schema;
pub mod storage_traits;
pub mod store;
pub mod telemetry;

pub use config::{
    CreationLimits, HistoryConfig, MinimalLimits, ShrinkLimits, DEFAULT_MAX_BYTES,
    DEFAULT_MAX_RECORDS, DEFAULT_STORAGE_KEY,
};
pub use error::{ConfigError, StorageError};
pub use fakes::MemoryKeyValueStore;
pub use fs_store::FsKeyValueStore;
pub use retention::{compact, CompactionReport};
pub use schema::{
    parse_collection, serialized_size, truncate_chars, truncate_with_ellipsis, HistoryRecord,
    LinkEntry, ParseOutcome, RecordId, ResearchEntry, TextEntry, ELLIPSIS,
};
pub use storage_traits::{KeyValueStore, StorageResult};
pub use store::{HistoryStats, HistoryStore, PersistOutcome};
pub use telemetry::init_tracing;
