//! Source scanning for `lingosync-scan`.
//!
//! [`Scanner::scan`] walks a source tree, reads every file whose path ends with
//! the configured suffix, and collects the identifiers declared through
//! `<pkg>.<call_name>("…")` call sites. [`to_locale_json`] turns the result into
//! the base-locale document that gets uploaded, where every translation is the
//! identifier itself.
//!
//! Candidate files are split across a bounded set of scoped worker threads;
//! each worker builds its own identifier set and the sets are merged once all
//! workers have finished.

pub mod extract;

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::Instant;

use lingosync_core::{config::ScanSettings, TranslationEntry};
use thiserror::Error;
use walkdir::WalkDir;

pub use extract::{extract_ids, NonLiteralArg};

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// Sorted, de-duplicated identifier set.
pub type IdentifierSet = BTreeSet<String>;

/// Errors from source scanning.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("source root '{path}' does not exist")]
    RootNotFound { path: PathBuf },

    #[error("{path}:{line}: {call}(id) needs a string literal id, got `{found}`")]
    NonLiteralId {
        path: PathBuf,
        line: usize,
        call: String,
        found: String,
    },

    #[error("failed to encode locale JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("scan worker panicked")]
    WorkerPanicked,
}

/// Outcome of a scan: the identifiers plus how many files contributed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanReport {
    pub ids: IdentifierSet,
    pub files_scanned: usize,
}

/// Configured walker over one source tree.
#[derive(Debug, Clone)]
pub struct Scanner {
    root: PathBuf,
    file_suffix: String,
    call_name: String,
    workers: usize,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

impl Scanner {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self::from_settings(root, &ScanSettings::default())
    }

    pub fn from_settings(root: impl Into<PathBuf>, settings: &ScanSettings) -> Self {
        Self {
            root: root.into(),
            file_suffix: settings.file_suffix.clone(),
            call_name: settings.call_name.clone(),
            workers: 4,
        }
    }

    /// Upper bound on concurrently scanned files.
    #[must_use]
    pub fn workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    /// Every file under the root whose path ends with the configured suffix,
    /// in walk order. Unreadable entries are logged and skipped.
    pub fn candidates(&self) -> Result<Vec<PathBuf>, ScanError> {
        if !self.root.exists() {
            return Err(ScanError::RootNotFound {
                path: self.root.clone(),
            });
        }

        let mut files = Vec::new();
        for entry in WalkDir::new(&self.root).follow_links(false).sort_by_file_name() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    tracing::warn!(error = %err, "skipping unreadable entry");
                    continue;
                }
            };
            if entry.file_type().is_file() && has_suffix(entry.path(), &self.file_suffix) {
                files.push(entry.into_path());
            }
        }
        Ok(files)
    }

    /// Scan all candidates and merge their identifiers.
    pub fn scan(&self) -> Result<ScanReport, ScanError> {
        let started = Instant::now();
        let files = self.candidates()?;
        if files.is_empty() {
            tracing::warn!(root = %self.root.display(), suffix = %self.file_suffix, "no files to scan");
            return Ok(ScanReport::default());
        }

        let chunk_size = files.len().div_ceil(self.workers);
        let call_name = self.call_name.as_str();

        let partials = std::thread::scope(|scope| {
            let handles: Vec<_> = files
                .chunks(chunk_size)
                .map(|chunk| scope.spawn(move || scan_files(chunk, call_name)))
                .collect();
            handles
                .into_iter()
                .map(|handle| handle.join().map_err(|_| ScanError::WorkerPanicked)?)
                .collect::<Result<Vec<_>, _>>()
        })?;

        let mut ids = IdentifierSet::new();
        for partial in partials {
            ids.extend(partial);
        }

        tracing::info!(
            files = files.len(),
            ids = ids.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "localized identifiers collected",
        );
        Ok(ScanReport {
            ids,
            files_scanned: files.len(),
        })
    }
}

/// Render the base-locale document: a pretty JSON array of
/// `{"id": …, "translation": …}` objects with translation = id.
pub fn to_locale_json(ids: &IdentifierSet) -> Result<String, ScanError> {
    let entries: Vec<TranslationEntry> = ids
        .iter()
        .map(|id| TranslationEntry::untranslated(id.as_str()))
        .collect();
    Ok(serde_json::to_string_pretty(&entries)?)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn scan_files(files: &[PathBuf], call_name: &str) -> Result<IdentifierSet, ScanError> {
    let mut ids = IdentifierSet::new();
    for path in files {
        let source = match std::fs::read_to_string(path) {
            Ok(source) => source,
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "skipping unreadable file");
                continue;
            }
        };
        let found = extract_ids(&source, call_name).map_err(|arg| ScanError::NonLiteralId {
            path: path.clone(),
            line: arg.line,
            call: call_name.to_string(),
            found: arg.found,
        })?;
        tracing::debug!(path = %path.display(), count = found.len(), "scanned");
        ids.extend(found);
    }
    Ok(ids)
}

fn has_suffix(path: &Path, suffix: &str) -> bool {
    let normalized = path.to_string_lossy().replace('\\', "/");
    normalized.ends_with(suffix)
}
