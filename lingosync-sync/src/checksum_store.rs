//! Checksum store: per-(project, locale) cache tokens and content checksums.
//!
//! Persists a [`RunRecord`] JSON document, by default at
//! `<temp_dir>/lingosync_run_info.json`:
//!
//! ```json
//! {"lst":[{"crc32":3632233996,"etag":"\"v1\"","project":"Backend","locale":"de-DE"}],
//!  "last_run_time":1700000000000000000}
//! ```
//!
//! Writes use an atomic `.tmp` + rename. A record that cannot be parsed is
//! discarded and the run starts from an empty store.

use std::io::ErrorKind;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use lingosync_core::{paths, LocaleName, LocaleTarget, ProjectName};

use crate::error::{io_err, SyncError};

/// Checksum value that never matches a real file.
pub const INVALID_CRC32: u32 = 0;

/// Last known state of one downloaded locale file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChecksumRecord {
    pub crc32: u32,
    pub etag: String,
    pub project: ProjectName,
    pub locale: LocaleName,
}

impl ChecksumRecord {
    fn matches(&self, target: &LocaleTarget) -> bool {
        self.project == target.project && self.locale == target.locale
    }
}

/// On-disk payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunRecord {
    #[serde(rename = "lst", default, deserialize_with = "null_as_empty")]
    pub records: Vec<ChecksumRecord>,
    /// Nanoseconds since the Unix epoch; zero when no run has completed.
    #[serde(default)]
    pub last_run_time: i64,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<ChecksumRecord>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<ChecksumRecord>>::deserialize(deserializer)?.unwrap_or_default())
}

// ---------------------------------------------------------------------------
// ChecksumStore
// ---------------------------------------------------------------------------

/// In-memory view of the run record. At most one entry per (project, locale).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChecksumStore {
    record: RunRecord,
}

impl ChecksumStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_record(mut record: RunRecord) -> Self {
        // Hand-edited files may repeat a pair; the last entry wins.
        let mut deduped: Vec<ChecksumRecord> = Vec::with_capacity(record.records.len());
        for entry in record.records.drain(..).rev() {
            if !deduped
                .iter()
                .any(|e| e.project == entry.project && e.locale == entry.locale)
            {
                deduped.push(entry);
            }
        }
        deduped.reverse();
        record.records = deduped;
        Self { record }
    }

    pub fn record(&self) -> &RunRecord {
        &self.record
    }

    pub fn records(&self) -> &[ChecksumRecord] {
        &self.record.records
    }

    pub fn len(&self) -> usize {
        self.record.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.record.records.is_empty()
    }

    fn find(&self, target: &LocaleTarget) -> Option<&ChecksumRecord> {
        self.record.records.iter().find(|r| r.matches(target))
    }

    /// Stored cache token, if any. An empty token counts as absent.
    pub fn etag(&self, target: &LocaleTarget) -> Option<&str> {
        self.find(target)
            .map(|r| r.etag.as_str())
            .filter(|etag| !etag.is_empty())
    }

    /// Stored checksum, if any. [`INVALID_CRC32`] counts as absent.
    pub fn checksum(&self, target: &LocaleTarget) -> Option<u32> {
        self.find(target)
            .map(|r| r.crc32)
            .filter(|crc| *crc != INVALID_CRC32)
    }

    /// Replace the entry for `target`, or append a new one.
    pub fn upsert(&mut self, target: &LocaleTarget, etag: impl Into<String>, crc32: u32) {
        let etag = etag.into();
        if let Some(existing) = self.record.records.iter_mut().find(|r| r.matches(target)) {
            existing.etag = etag;
            existing.crc32 = crc32;
            return;
        }
        self.record.records.push(ChecksumRecord {
            crc32,
            etag,
            project: target.project.clone(),
            locale: target.locale.clone(),
        });
    }

    /// Completion time of the last full run.
    pub fn last_run(&self) -> Option<DateTime<Utc>> {
        if self.record.last_run_time <= 0 {
            return None;
        }
        Some(DateTime::from_timestamp_nanos(self.record.last_run_time))
    }

    pub fn mark_run(&mut self, at: DateTime<Utc>) {
        self.record.last_run_time = at.timestamp_nanos_opt().unwrap_or(i64::MAX);
    }

    /// Signed time between the last run and `now`; negative when the
    /// recorded run lies in the future. `None` when there was no previous run.
    pub fn since_last_run(&self, now: DateTime<Utc>) -> Option<chrono::Duration> {
        let last = self.last_run()?;
        Some(now.signed_duration_since(last))
    }
}

// ---------------------------------------------------------------------------
// Persistence
// ---------------------------------------------------------------------------

/// Load the store from `path`.
///
/// Never fails: a missing file yields an empty store, an unreadable or
/// unparseable one is logged, deleted, and replaced by an empty store.
pub fn load_at(path: &Path) -> ChecksumStore {
    let contents = match std::fs::read(path) {
        Ok(contents) => contents,
        Err(err) if err.kind() == ErrorKind::NotFound => return ChecksumStore::new(),
        Err(err) => {
            tracing::warn!(path = %path.display(), error = %err, "run record unreadable, starting fresh");
            return ChecksumStore::new();
        }
    };
    match serde_json::from_slice::<RunRecord>(&contents) {
        Ok(record) => ChecksumStore::from_record(record),
        Err(err) => {
            tracing::warn!(path = %path.display(), error = %err, "run record corrupt, discarding");
            if let Err(err) = std::fs::remove_file(path) {
                tracing::warn!(path = %path.display(), error = %err, "could not remove corrupt run record");
            }
            ChecksumStore::new()
        }
    }
}

/// Save the store to `path` atomically.
///
/// Writes to `<path>.tmp` then renames to `<path>`.
pub fn save_at(path: &Path, store: &ChecksumStore) -> Result<(), SyncError> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir).map_err(|e| io_err(dir, e))?;
    }

    let json = serde_json::to_string(store.record())?;
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, &json).map_err(|e| io_err(&tmp, e))?;
    if let Err(e) = std::fs::rename(&tmp, path) {
        let _ = std::fs::remove_file(&tmp);
        return Err(io_err(path, e));
    }
    tracing::debug!(path = %path.display(), entries = store.len(), "saved run record");
    Ok(())
}

/// Load from the default location in the system temp dir.
pub fn load() -> ChecksumStore {
    load_at(&paths::run_info_path())
}

/// Save to the default location in the system temp dir.
pub fn save(store: &ChecksumStore) -> Result<(), SyncError> {
    save_at(&paths::run_info_path(), store)
}
