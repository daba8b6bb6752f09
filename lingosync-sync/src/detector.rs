//! Change detection for downloaded locale files.
//!
//! A stored cache token is only presented to the remote when the local file
//! it was issued for still hashes to the stored checksum. Anything else
//! (file edited, deleted, never synced) forces an unconditional download.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

use lingosync_core::{paths, LocaleTarget};

use crate::checksum_store::ChecksumStore;
use crate::error::{io_err, SyncError};

/// Local state of one (project, locale) file relative to the last sync.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocaleStatus {
    /// No checksum recorded for the pair.
    NeverSynced,
    Current,
    /// File present but its content differs from what was last written.
    Modified,
    /// A checksum is recorded but the file is gone.
    Missing,
}

/// CRC-32 (IEEE) of `content`.
pub fn content_crc32(content: &[u8]) -> u32 {
    crc32fast::hash(content)
}

/// CRC-32 of the file at `path`, `None` when the file does not exist.
pub fn file_crc32(path: &Path) -> Result<Option<u32>, SyncError> {
    match std::fs::read(path) {
        Ok(content) => Ok(Some(content_crc32(&content))),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
        Err(err) => Err(io_err(path, err)),
    }
}

// ---------------------------------------------------------------------------
// ChangeDetector
// ---------------------------------------------------------------------------

/// Compares stored checksums with the files under `<base>/localized_data`.
pub struct ChangeDetector<'a> {
    store: &'a ChecksumStore,
    base: &'a Path,
}

impl<'a> ChangeDetector<'a> {
    pub fn new(store: &'a ChecksumStore, base: &'a Path) -> Self {
        Self { store, base }
    }

    pub fn locale_path(&self, target: &LocaleTarget) -> PathBuf {
        paths::locale_file_path(self.base, &target.project, &target.locale)
    }

    /// The cache token to send with the next download of `target`, or `None`
    /// when the download must be unconditional.
    pub fn should_trust_cache(&self, target: &LocaleTarget) -> Result<Option<String>, SyncError> {
        let Some(stored) = self.store.checksum(target) else {
            return Ok(None);
        };
        let path = self.locale_path(target);
        match file_crc32(&path)? {
            Some(current) if current == stored => {
                Ok(self.store.etag(target).map(str::to_string))
            }
            Some(_) => {
                tracing::debug!(pair = %target, "local file changed since last sync, dropping cache token");
                Ok(None)
            }
            None => {
                tracing::debug!(pair = %target, "local file missing, dropping cache token");
                Ok(None)
            }
        }
    }

    pub fn status(&self, target: &LocaleTarget) -> Result<LocaleStatus, SyncError> {
        let Some(stored) = self.store.checksum(target) else {
            return Ok(LocaleStatus::NeverSynced);
        };
        Ok(match file_crc32(&self.locale_path(target))? {
            Some(current) if current == stored => LocaleStatus::Current,
            Some(_) => LocaleStatus::Modified,
            None => LocaleStatus::Missing,
        })
    }
}

/// Format age from a chrono timestamp (last run time).
pub fn format_datetime_age(timestamp: DateTime<Utc>) -> String {
    let age = Utc::now()
        .signed_duration_since(timestamp)
        .num_seconds()
        .max(0) as u64;
    format_seconds(age)
}

fn format_seconds(seconds: u64) -> String {
    if seconds < 60 {
        return format!("{seconds}s");
    }
    if seconds < 60 * 60 {
        return format!("{}m", seconds / 60);
    }
    if seconds < 60 * 60 * 24 {
        return format!("{}h", seconds / (60 * 60));
    }
    format!("{}d", seconds / (60 * 60 * 24))
}
