//! # lingosync-sync
//!
//! Change detection and synchronization between a source tree and the remote
//! translation service.
//!
//! [`Orchestrator::run`] drives one run: probe connectivity, load the
//! [`ChecksumStore`], apply the minimum-interval gate, upload the base locales,
//! sweep every remote locale through the [`ChangeDetector`], write what
//! changed, and persist the run record.

pub mod checksum_store;
pub mod detector;
pub mod error;
pub mod events;
pub mod orchestrator;
pub mod writer;

pub use checksum_store::{ChecksumRecord, ChecksumStore, RunRecord};
pub use detector::{ChangeDetector, LocaleStatus};
pub use error::SyncError;
pub use events::{
    BaseLocale, FailureKind, LogEvents, StaticSource, SyncEvents, SyncFailure, SyncSource,
};
pub use orchestrator::{
    DownloadOutcome, DownloadResult, Orchestrator, RunOutcome, RunSummary, SyncOptions,
    UploadOutcome, UploadResult,
};
