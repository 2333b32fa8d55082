//! Record schema for the persisted research history.
//!
//! The collection is persisted as one JSON array, newest record first:
//!
//! ```json
//! [{"id":"1718000000000","question":"...","answer":"...",
//!   "timestamp":"2024-06-10T06:13:20Z",
//!   "orderedData":[{"type":"basic","content":"..."}]}]
//! ```
//!
//! Parsing goes through [`parse_collection`], which never fails: anything that
//! is not a well-formed array of records comes back as
//! [`ParseOutcome::Malformed`].

use std::cmp::Ordering;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::{CreationLimits, MinimalLimits, ShrinkLimits};

/// Marker appended to text cut short by truncation.
pub const ELLIPSIS: &str = "...";

// ---------------------------------------------------------------------------
// Text truncation
// ---------------------------------------------------------------------------

/// First `max` characters of `text`.
pub fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}

/// First `max` characters of `text`, followed by [`ELLIPSIS`] if anything was
/// cut.
pub fn truncate_with_ellipsis(text: &str, max: usize) -> String {
    let mut out = text.to_string();
    shrink_with_ellipsis(&mut out, max);
    out
}

/// In-place variant of [`truncate_with_ellipsis`]. Returns whether `text`
/// changed.
pub(crate) fn shrink_with_ellipsis(text: &mut String, max: usize) -> bool {
    match text.char_indices().nth(max) {
        Some((idx, _)) => {
            text.truncate(idx);
            text.push_str(ELLIPSIS);
            true
        }
        None => false,
    }
}

// ---------------------------------------------------------------------------
// RecordId
// ---------------------------------------------------------------------------

/// Record identifier: creation time in Unix milliseconds, as a decimal string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
    pub fn from_millis(millis: i64) -> Self {
        RecordId(millis.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Millisecond value, if the id is numeric.
    pub fn millis(&self) -> Option<i64> {
        self.0.parse().ok()
    }

    /// Numeric order where both ids are numeric, string order otherwise.
    pub fn cmp_numeric(&self, other: &Self) -> Ordering {
        match (self.millis(), other.millis()) {
            (Some(a), Some(b)) => a.cmp(&b),
            _ => self.0.cmp(&other.0),
        }
    }
}

impl From<&str> for RecordId {
    fn from(s: &str) -> Self {
        RecordId(s.to_string())
    }
}

impl From<String> for RecordId {
    fn from(s: String) -> Self {
        RecordId(s)
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// ResearchEntry
// ---------------------------------------------------------------------------

/// Payload of a text-bearing research event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextEntry {
    #[serde(default)]
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
}

impl TextEntry {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            output: None,
        }
    }

    pub fn with_output(mut self, output: impl Into<String>) -> Self {
        self.output = Some(output.into());
        self
    }
}

/// Payload of an external-link event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkEntry {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

/// One event from a research session's log, tagged by `type` on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ResearchEntry {
    Basic(TextEntry),
    Question(TextEntry),
    Chat(TextEntry),
    Error(TextEntry),
    Differences(TextEntry),
    ExternalLink(LinkEntry),
}

impl ResearchEntry {
    pub fn basic(content: impl Into<String>) -> Self {
        ResearchEntry::Basic(TextEntry::new(content))
    }

    pub fn external_link(url: impl Into<String>) -> Self {
        ResearchEntry::ExternalLink(LinkEntry {
            url: url.into(),
            title: None,
        })
    }

    /// Text fields of the entry, if the variant carries any.
    pub fn text(&self) -> Option<&TextEntry> {
        match self {
            ResearchEntry::Basic(t)
            | ResearchEntry::Question(t)
            | ResearchEntry::Chat(t)
            | ResearchEntry::Error(t)
            | ResearchEntry::Differences(t) => Some(t),
            ResearchEntry::ExternalLink(_) => None,
        }
    }

    fn text_mut(&mut self) -> Option<&mut TextEntry> {
        match self {
            ResearchEntry::Basic(t)
            | ResearchEntry::Question(t)
            | ResearchEntry::Chat(t)
            | ResearchEntry::Error(t)
            | ResearchEntry::Differences(t) => Some(t),
            ResearchEntry::ExternalLink(_) => None,
        }
    }

    /// Copy with `content` and `output` independently truncated.
    pub fn truncated(&self, content_chars: usize, output_chars: usize) -> Self {
        let mut entry = self.clone();
        if let Some(text) = entry.text_mut() {
            shrink_with_ellipsis(&mut text.content, content_chars);
            if let Some(output) = text.output.as_mut() {
                shrink_with_ellipsis(output, output_chars);
            }
        }
        entry
    }
}

/// Keep the first `limits.entries` entries, truncating their text fields.
pub fn clean_entries(entries: &[ResearchEntry], limits: &CreationLimits) -> Vec<ResearchEntry> {
    entries
        .iter()
        .take(limits.entries)
        .map(|e| e.truncated(limits.content_chars, limits.output_chars))
        .collect()
}

// ---------------------------------------------------------------------------
// HistoryRecord
// ---------------------------------------------------------------------------

/// One saved research session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryRecord {
    pub id: RecordId,
    pub question: String,
    pub answer: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub ordered_data: Vec<ResearchEntry>,
}

impl HistoryRecord {
    /// Build a record, applying the creation-time truncation limits.
    pub fn new(
        id: RecordId,
        timestamp: DateTime<Utc>,
        question: &str,
        answer: &str,
        ordered_data: &[ResearchEntry],
        limits: &CreationLimits,
    ) -> Self {
        Self {
            id,
            question: truncate_chars(question, limits.question_chars),
            answer: truncate_with_ellipsis(answer, limits.answer_chars),
            timestamp,
            ordered_data: clean_entries(ordered_data, limits),
        }
    }

    /// Second-stage compaction: shorten the answer and the event log.
    /// Returns whether anything changed.
    pub fn shrink(&mut self, limits: &ShrinkLimits) -> bool {
        let answer_changed = shrink_with_ellipsis(&mut self.answer, limits.answer_chars);
        let entries_changed = self.ordered_data.len() > limits.entries;
        self.ordered_data.truncate(limits.entries);
        answer_changed || entries_changed
    }

    /// Stripped copy used by the last-resort save: short question and
    /// answer, no event log.
    pub fn minimal(&self, limits: &MinimalLimits) -> Self {
        Self {
            id: self.id.clone(),
            question: truncate_chars(&self.question, limits.question_chars),
            answer: truncate_with_ellipsis(&self.answer, limits.answer_chars),
            timestamp: self.timestamp,
            ordered_data: Vec::new(),
        }
    }

    /// Newest-first ordering: later timestamp first, then higher id.
    pub fn newest_first(a: &Self, b: &Self) -> Ordering {
        b.timestamp
            .cmp(&a.timestamp)
            .then_with(|| b.id.cmp_numeric(&a.id))
    }
}

// ---------------------------------------------------------------------------
// Collection encoding
// ---------------------------------------------------------------------------

/// Result of reading the persisted value.
#[derive(Debug, Clone, PartialEq)]
pub enum ParseOutcome {
    /// Nothing persisted under the key.
    Missing,
    /// A well-formed collection.
    Parsed(Vec<HistoryRecord>),
    /// Present but not a JSON array of records.
    Malformed(String),
}

impl ParseOutcome {
    /// Records, treating anything but `Parsed` as empty.
    pub fn into_records(self) -> Vec<HistoryRecord> {
        match self {
            ParseOutcome::Parsed(records) => records,
            ParseOutcome::Missing | ParseOutcome::Malformed(_) => Vec::new(),
        }
    }
}

/// Validate a persisted value against the collection schema.
pub fn parse_collection(raw: Option<&str>) -> ParseOutcome {
    let Some(raw) = raw else {
        return ParseOutcome::Missing;
    };
    match serde_json::from_str::<Vec<HistoryRecord>>(raw) {
        Ok(records) => ParseOutcome::Parsed(records),
        Err(e) => ParseOutcome::Malformed(e.to_string()),
    }
}

/// Canonical JSON text of a collection.
pub fn encode_collection(records: &[HistoryRecord]) -> serde_json::Result<String> {
    serde_json::to_string(records)
}

struct ByteCounter(usize);

impl std::io::Write for ByteCounter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0 += buf.len();
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// UTF-8 byte length of [`encode_collection`]'s output, without building the
/// string.
pub fn serialized_size(records: &[HistoryRecord]) -> usize {
    let mut counter = ByteCounter(0);
    match serde_json::to_writer(&mut counter, records) {
        Ok(()) => counter.0,
        // Records hold only strings and timestamps; treat the impossible
        // failure as over any budget.
        Err(_) => usize::MAX,
    }
}
