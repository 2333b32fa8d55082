//! Compaction: bounding the history collection by count and serialized size.

use serde::{Deserialize, Serialize};

use crate::config::HistoryConfig;
use crate::schema::{serialized_size, HistoryRecord};

/// Result of a compaction pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompactionReport {
    /// Records removed by the count cap.
    pub dropped_by_count: usize,
    /// Whether the shrink stage ran.
    pub shrunk: bool,
    /// Records whose answer or event log the shrink stage shortened.
    pub shrunk_records: usize,
    /// Oldest records removed to meet the byte budget.
    pub dropped_by_size: usize,
    /// Serialized size after compaction.
    pub final_bytes: usize,
    pub remaining_count: usize,
}

impl CompactionReport {
    /// True when the collection differs from what was passed in.
    pub fn changed(&self) -> bool {
        self.dropped_by_count > 0 || self.shrunk_records > 0 || self.dropped_by_size > 0
    }

    pub fn removed_count(&self) -> usize {
        self.dropped_by_count + self.dropped_by_size
    }
}

/// Bound `records` in place, in order:
/// 1. Sort newest first and keep at most `max_records`
/// 2. Over budget: shrink every record's answer and event log
/// 3. Still over budget: drop the oldest record until within budget or one
///    record remains
///
/// Size is measured afresh before each stage.
pub fn compact(records: &mut Vec<HistoryRecord>, config: &HistoryConfig) -> CompactionReport {
    let mut report = CompactionReport::default();

    // Stage 1: order and count cap
    records.sort_by(HistoryRecord::newest_first);
    if records.len() > config.max_records {
        report.dropped_by_count = records.len() - config.max_records;
        records.truncate(config.max_records);
    }

    // Stage 2: shrink fields
    let mut size = serialized_size(records);
    if size > config.max_bytes {
        report.shrunk = true;
        report.shrunk_records = records
            .iter_mut()
            .map(|r| r.shrink(&config.shrink))
            .filter(|changed| *changed)
            .count();
        size = serialized_size(records);
    }

    // Stage 3: drop oldest
    while size > config.max_bytes && records.len() > 1 {
        records.pop();
        report.dropped_by_size += 1;
        size = serialized_size(records);
    }

    report.final_bytes = size;
    report.remaining_count = records.len();
    report
}
