//! Transcript history — an append-only record log with age-based retention.
//!
//! [`TranscriptSink`] is the boundary the session controller writes through:
//! `insert` never fails for valid input and returns an opaque identifier.
//! [`HistoryStore`] is the shipped implementation — one JSON object per line
//! in `history.jsonl`, keyed by creation time, swept at startup to drop
//! records older than the configured retention window.

use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::pipeline::FinalTranscript;

// ---------------------------------------------------------------------------
// TranscriptSink
// ---------------------------------------------------------------------------

/// Opaque identifier of a stored transcript record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct RecordId(pub u64);

/// Destination for finalized transcripts.
///
/// The contract the controller relies on: `insert` never fails for valid
/// input.  Implementations absorb their own I/O errors.
pub trait TranscriptSink: Send + Sync {
    fn insert(&self, transcript: &FinalTranscript) -> RecordId;
}

// ---------------------------------------------------------------------------
// TranscriptRecord
// ---------------------------------------------------------------------------

/// One stored transcript, as serialised to the history log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptRecord {
    pub id: u64,
    pub text: String,
    pub language: String,
    pub duration_secs: f32,
    /// Creation time in unix milliseconds — the record key.
    pub created_at_ms: u64,
    pub word_count: usize,
}

// ---------------------------------------------------------------------------
// HistoryStore
// ---------------------------------------------------------------------------

/// JSON-lines transcript log.
///
/// All operations take one coarse lock — the store sees a handful of writes
/// per minute at most, so contention is a non-issue and the lock keeps the
/// id sequence and the file consistent.
pub struct HistoryStore {
    path: PathBuf,
    inner: Mutex<Inner>,
}

struct Inner {
    next_id: u64,
}

impl HistoryStore {
    /// Open (or create) the history log at `path`.
    ///
    /// Existing records are scanned once to continue the id sequence.
    pub fn open(path: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let next_id = read_records(&path)
            .iter()
            .map(|r| r.id + 1)
            .max()
            .unwrap_or(0);

        Ok(Self {
            path,
            inner: Mutex::new(Inner { next_id }),
        })
    }

    /// All records in file (insertion) order.
    pub fn all(&self) -> Vec<TranscriptRecord> {
        let _guard = self.inner.lock().unwrap();
        read_records(&self.path)
    }

    /// The most recent `limit` records, newest first.
    pub fn recent(&self, limit: usize) -> Vec<TranscriptRecord> {
        let mut records = self.all();
        records.reverse();
        records.truncate(limit);
        records
    }

    /// The most recent record, if any.
    pub fn last(&self) -> Option<TranscriptRecord> {
        self.all().pop()
    }

    /// Total number of stored records.
    pub fn count(&self) -> usize {
        self.all().len()
    }

    /// Delete records older than `days` and return how many were removed.
    pub fn sweep_older_than(&self, days: u32) -> usize {
        let cutoff = now_ms().saturating_sub(u64::from(days) * 86_400_000);

        let _guard = self.inner.lock().unwrap();
        let records = read_records(&self.path);
        let (keep, dropped): (Vec<_>, Vec<_>) =
            records.into_iter().partition(|r| r.created_at_ms >= cutoff);

        if dropped.is_empty() {
            return 0;
        }

        let mut data = String::new();
        for record in &keep {
            match serde_json::to_string(record) {
                Ok(line) => {
                    data.push_str(&line);
                    data.push('\n');
                }
                Err(e) => log::error!("store: cannot serialise record {}: {e}", record.id),
            }
        }
        if let Err(e) = std::fs::write(&self.path, data) {
            log::error!("store: sweep rewrite failed: {e}");
            return 0;
        }
        dropped.len()
    }

    /// Append one record; absorbs I/O errors (the insert contract).
    fn append(&self, record: &TranscriptRecord) {
        let line = match serde_json::to_string(record) {
            Ok(line) => line,
            Err(e) => {
                log::error!("store: cannot serialise record: {e}");
                return;
            }
        };

        use std::io::Write;
        let result = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .and_then(|mut f| writeln!(f, "{line}"));

        if let Err(e) = result {
            log::error!("store: cannot append to {}: {e}", self.path.display());
        }
    }

    /// Insert with an explicit timestamp — the sweep tests need old records.
    fn insert_at(&self, transcript: &FinalTranscript, created_at_ms: u64) -> RecordId {
        let mut inner = self.inner.lock().unwrap();
        let id = inner.next_id;
        inner.next_id += 1;

        let record = TranscriptRecord {
            id,
            text: transcript.text.clone(),
            language: transcript.language.clone(),
            duration_secs: transcript.duration_secs,
            created_at_ms,
            word_count: transcript.word_count,
        };
        self.append(&record);
        RecordId(id)
    }
}

impl TranscriptSink for HistoryStore {
    fn insert(&self, transcript: &FinalTranscript) -> RecordId {
        self.insert_at(transcript, now_ms())
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Parse the log file, skipping (and logging) corrupt lines.
fn read_records(path: &Path) -> Vec<TranscriptRecord> {
    let Ok(data) = std::fs::read_to_string(path) else {
        return Vec::new();
    };

    data.lines()
        .filter(|line| !line.trim().is_empty())
        .filter_map(|line| match serde_json::from_str(line) {
            Ok(record) => Some(record),
            Err(e) => {
                log::warn!("store: skipping corrupt history line: {e}");
                None
            }
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
