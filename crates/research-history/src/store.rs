//! The bounded history store.
//!
//! `HistoryStore` owns the in-memory collection for one session and mirrors
//! it to a [`KeyValueStore`] after every mutation. None of its operations
//! return errors: malformed persisted data is discarded, rejected writes go
//! through a recovery sequence, and whatever survives is reported as a
//! [`PersistOutcome`] and in the logs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::HistoryConfig;
use crate::error::StorageError;
use crate::obs;
use crate::retention::compact;
use crate::schema::{
    encode_collection, parse_collection, serialized_size, HistoryRecord, ParseOutcome, RecordId,
    ResearchEntry,
};
use crate::storage_traits::{KeyValueStore, StorageResult};

/// What ended up in the persistence layer after a write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PersistOutcome {
    /// The current collection was written.
    Written,
    /// The write was rejected; the previously persisted collection was
    /// compacted and written back instead.
    RecoveredStale,
    /// Every other attempt failed; a stripped-down copy of the current
    /// collection was written and adopted in memory.
    Minimal,
    /// Nothing could be written. The key was removed and the in-memory
    /// collection is not durable.
    Volatile,
}

impl PersistOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            PersistOutcome::Written => "written",
            PersistOutcome::RecoveredStale => "recovered_stale",
            PersistOutcome::Minimal => "minimal",
            PersistOutcome::Volatile => "volatile",
        }
    }

    /// True when the current in-memory collection is what is persisted.
    pub fn is_durable(&self) -> bool {
        matches!(self, PersistOutcome::Written | PersistOutcome::Minimal)
    }
}

/// Mints strictly increasing millisecond ids.
///
/// Ids start from the creation time but may run ahead of it when several
/// records are created within one millisecond. Record timestamps always
/// stay at the creation time.
#[derive(Debug, Default)]
struct IdClock {
    last: i64,
}

impl IdClock {
    /// Continue after the loaded ids. Ids later than `now` are not real
    /// creation times and are ignored.
    fn observe(&mut self, records: &[HistoryRecord], now: DateTime<Utc>) {
        let now_ms = now.timestamp_millis();
        if let Some(max) = records
            .iter()
            .filter_map(|r| r.id.millis())
            .filter(|millis| *millis <= now_ms)
            .max()
        {
            self.last = self.last.max(max);
        }
    }

    fn next(&mut self, now: DateTime<Utc>) -> (RecordId, DateTime<Utc>) {
        let millis = now.timestamp_millis().max(self.last.saturating_add(1));
        self.last = millis;
        (RecordId::from_millis(millis), now)
    }
}

/// Size- and count-bounded research history backed by a persistence layer.
pub struct HistoryStore<S> {
    backend: S,
    config: HistoryConfig,
    records: Vec<HistoryRecord>,
    clock: IdClock,
    last_outcome: Option<PersistOutcome>,
}

impl<S: KeyValueStore> HistoryStore<S> {
    /// Open the store with default limits and load the persisted collection.
    pub fn open(backend: S) -> Self {
        Self::with_config(backend, HistoryConfig::default())
    }

    /// Open the store with `config` and load the persisted collection.
    pub fn with_config(backend: S, config: HistoryConfig) -> Self {
        let mut store = Self {
            backend,
            config,
            records: Vec::new(),
            clock: IdClock::default(),
            last_outcome: None,
        };
        store.load();
        store
    }

    /// Re-read the collection from the persistence layer.
    ///
    /// Malformed or unreadable data is discarded and its key removed. If
    /// compaction alters
    /// what was read, the compacted form is written back.
    pub fn load(&mut self) -> &[HistoryRecord] {
        let key = self.config.storage_key.clone();
        let outcome = match self.backend.get(&key) {
            Ok(raw) => parse_collection(raw.as_deref()),
            Err(StorageError::CorruptValue { reason, .. }) => ParseOutcome::Malformed(reason),
            Err(e) => {
                obs::emit_storage_error(&key, "get", &e);
                ParseOutcome::Missing
            }
        };

        let mut records = match outcome {
            ParseOutcome::Parsed(records) => records,
            ParseOutcome::Missing => Vec::new(),
            ParseOutcome::Malformed(reason) => {
                obs::emit_load_discarded(&key, &reason);
                self.remove_key();
                Vec::new()
            }
        };

        let report = compact(&mut records, &self.config);
        obs::emit_compacted(&report);
        self.clock.observe(&records, Utc::now());
        self.records = records;

        if report.changed() {
            self.persist();
        }
        obs::emit_loaded(&key, self.records.len());
        &self.records
    }

    /// Save a research session and return its id.
    ///
    /// The record is always added to the in-memory collection; durability is
    /// reported by [`HistoryStore::last_outcome`].
    pub fn save(
        &mut self,
        question: &str,
        answer: &str,
        ordered_data: &[ResearchEntry],
    ) -> RecordId {
        let (id, timestamp) = self.clock.next(Utc::now());
        let record = HistoryRecord::new(
            id.clone(),
            timestamp,
            question,
            answer,
            ordered_data,
            &self.config.creation,
        );
        self.records.insert(0, record);

        let report = compact(&mut self.records, &self.config);
        obs::emit_compacted(&report);

        let outcome = match self.persist() {
            PersistOutcome::Volatile => self.persist_minimal(),
            outcome => outcome,
        };
        self.last_outcome = Some(outcome);

        obs::emit_saved(id.as_str(), self.records.len(), self.serialized_size());
        id
    }

    /// Look up a record by id.
    pub fn get_by_id(&self, id: &RecordId) -> Option<&HistoryRecord> {
        self.records.iter().find(|r| &r.id == id)
    }

    /// Remove the record with `id`. Returns whether one was removed.
    pub fn delete(&mut self, id: &RecordId) -> bool {
        let before = self.records.len();
        self.records.retain(|r| &r.id != id);
        if self.records.len() == before {
            return false;
        }
        self.persist();
        obs::emit_deleted(id.as_str(), self.records.len());
        true
    }

    /// Drop every record and remove the persisted key.
    pub fn clear(&mut self) {
        self.records.clear();
        self.remove_key();
        self.last_outcome = None;
        obs::emit_cleared(&self.config.storage_key);
    }

    /// Records, newest first.
    pub fn records(&self) -> &[HistoryRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Serialized byte size of the in-memory collection.
    pub fn serialized_size(&self) -> usize {
        serialized_size(&self.records)
    }

    /// Outcome of the most recent write, if any happened since opening or
    /// the last `clear`.
    pub fn last_outcome(&self) -> Option<PersistOutcome> {
        self.last_outcome
    }

    /// Current size and bounds.
    pub fn stats(&self) -> HistoryStats {
        HistoryStats {
            records: self.records.len(),
            max_records: self.config.max_records,
            bytes: self.serialized_size(),
            max_bytes: self.config.max_bytes,
            last_outcome: self.last_outcome,
        }
    }

    pub fn config(&self) -> &HistoryConfig {
        &self.config
    }

    pub fn backend(&self) -> &S {
        &self.backend
    }

    /// Write the in-memory collection, falling back to the persisted one
    /// when the write is rejected.
    fn persist(&mut self) -> PersistOutcome {
        let outcome = match self.write(&self.records) {
            Ok(()) => PersistOutcome::Written,
            Err(e) => {
                obs::emit_persist_failed(&self.config.storage_key, "primary", &e);
                self.recover_stale()
            }
        };
        if outcome != PersistOutcome::Written {
            obs::emit_recovered(&self.config.storage_key, outcome.as_str());
        }
        self.last_outcome = Some(outcome);
        outcome
    }

    /// Re-read whatever is persisted, compact it and write it back. Removes
    /// the key if even that is rejected.
    fn recover_stale(&mut self) -> PersistOutcome {
        let key = self.config.storage_key.clone();
        let raw = self.backend.get(&key).unwrap_or_else(|e| {
            obs::emit_storage_error(&key, "get", &e);
            None
        });
        let mut stale = parse_collection(raw.as_deref()).into_records();
        compact(&mut stale, &self.config);

        match self.write(&stale) {
            Ok(()) => PersistOutcome::RecoveredStale,
            Err(e) => {
                obs::emit_persist_failed(&key, "stale", &e);
                self.remove_key();
                PersistOutcome::Volatile
            }
        }
    }

    /// Last resort for `save`: persist a stripped copy of the newest records
    /// and adopt it in memory if that write succeeds.
    fn persist_minimal(&mut self) -> PersistOutcome {
        let minimal: Vec<HistoryRecord> = self
            .records
            .iter()
            .take(self.config.minimal.records)
            .map(|r| r.minimal(&self.config.minimal))
            .collect();

        match self.write(&minimal) {
            Ok(()) => {
                self.records = minimal;
                obs::emit_recovered(&self.config.storage_key, PersistOutcome::Minimal.as_str());
                PersistOutcome::Minimal
            }
            Err(e) => {
                obs::emit_persist_failed(&self.config.storage_key, "minimal", &e);
                PersistOutcome::Volatile
            }
        }
    }

    fn write(&self, records: &[HistoryRecord]) -> StorageResult<()> {
        let encoded = encode_collection(records).map_err(StorageError::from)?;
        self.backend.set(&self.config.storage_key, &encoded)
    }

    fn remove_key(&self) {
        if let Err(e) = self.backend.remove(&self.config.storage_key) {
            obs::emit_storage_error(&self.config.storage_key, "remove", &e);
        }
    }
}

impl<S> std::fmt::Debug for HistoryStore<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HistoryStore")
            .field("storage_key", &self.config.storage_key)
            .field("records", &self.records.len())
            .field("last_outcome", &self.last_outcome)
            .finish()
    }
}

/// Snapshot of the store's bounds, for reporting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryStats {
    pub records: usize,
    pub max_records: usize,
    pub bytes: usize,
    pub max_bytes: usize,
    pub last_outcome: Option<PersistOutcome>,
}
