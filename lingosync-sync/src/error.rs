//! Error types for lingosync-sync.

use std::path::PathBuf;

use thiserror::Error;

use lingosync_remote::RemoteError;

/// Run-fatal errors. Per-(project, locale) failures never surface here; they
/// are reported through [`crate::SyncEvents`] and recorded in the run summary.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The startup connectivity probe failed; nothing was attempted.
    #[error("no network connectivity")]
    Offline(#[source] RemoteError),

    /// An I/O error, with annotated path for context.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// JSON serialization error (run record).
    #[error("run record JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("download worker panicked")]
    WorkerPanicked,
}

/// Convenience constructor for [`SyncError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> SyncError {
    SyncError::Io {
        path: path.into(),
        source,
    }
}
