//! Structured observability hooks for history store events.
//!
//! Every store operation that touches the persistence layer reports through
//! these functions so log lines carry a stable `event` field:
//!
//! ```text
//! event=history.saved id=1718000000000 records=3 bytes=10240
//! event=history.persist_failed key=researchHistory stage=primary error=...
//! ```

use tracing::{debug, info, warn};

use crate::retention::CompactionReport;

/// Emit event: a record was added to the collection.
pub fn emit_saved(id: &str, records: usize, bytes: usize) {
    info!(event = "history.saved", id = %id, records = records, bytes = bytes);
}

/// Emit event: collection loaded from the persistence layer.
pub fn emit_loaded(key: &str, records: usize) {
    debug!(event = "history.loaded", key = %key, records = records);
}

/// Emit event: persisted value discarded because it failed schema validation.
pub fn emit_load_discarded(key: &str, reason: &str) {
    warn!(event = "history.load_discarded", key = %key, reason = %reason);
}

/// Emit event: compaction changed the collection.
pub fn emit_compacted(report: &CompactionReport) {
    if report.changed() {
        info!(
            event = "history.compacted",
            dropped_by_count = report.dropped_by_count,
            shrunk_records = report.shrunk_records,
            dropped_by_size = report.dropped_by_size,
            remaining = report.remaining_count,
            bytes = report.final_bytes,
        );
    }
}

/// Emit event: a write to the persistence layer was rejected.
pub fn emit_persist_failed(key: &str, stage: &str, error: &dyn std::fmt::Display) {
    warn!(event = "history.persist_failed", key = %key, stage = %stage, error = %error);
}

/// Emit event: recovery finished with the given outcome.
pub fn emit_recovered(key: &str, outcome: &str) {
    warn!(event = "history.recovered", key = %key, outcome = %outcome);
}

/// Emit event: a record was removed.
pub fn emit_deleted(id: &str, remaining: usize) {
    info!(event = "history.deleted", id = %id, remaining = remaining);
}

/// Emit event: the collection and its persisted key were cleared.
pub fn emit_cleared(key: &str) {
    info!(event = "history.cleared", key = %key);
}

/// Emit event: a persistence-layer call other than a write failed.
pub fn emit_storage_error(key: &str, op: &str, error: &dyn std::fmt::Display) {
    warn!(event = "history.storage_error", key = %key, op = %op, error = %error);
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_test::traced_test;

    #[traced_test]
    #[test]
    fn saved_event_carries_id() {
        emit_saved("1718000000000", 3, 1024);
        assert!(logs_contain("history.saved"));
        assert!(logs_contain("1718000000000"));
    }

    #[traced_test]
    #[test]
    fn unchanged_compaction_is_silent() {
        emit_compacted(&CompactionReport::default());
        assert!(!logs_contain("history.compacted"));
    }

    #[traced_test]
    #[test]
    fn persist_failure_is_a_warning() {
        emit_persist_failed("researchHistory", "primary", &"quota exceeded");
        assert!(logs_contain("WARN"));
        assert!(logs_contain("quota exceeded"));
    }
}
