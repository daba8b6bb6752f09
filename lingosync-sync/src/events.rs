//! What the orchestrator reads ([`SyncSource`]) and whom it tells
//! ([`SyncEvents`]).

use std::fmt;
use std::path::Path;

use lingosync_core::{LocaleName, LocaleTarget, ProjectName, ProjectRegistry};

/// Serialized locale content to upload for one (project, locale).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BaseLocale {
    pub target: LocaleTarget,
    pub content: Vec<u8>,
}

/// Read-only inputs for one run.
pub trait SyncSource {
    /// Projects whose locales are downloaded, and the ids uploads resolve against.
    fn projects(&self) -> &ProjectRegistry;

    /// Base locales to upload before the download sweep.
    fn locales_for_update(&self) -> &[BaseLocale];

    /// Whether uploads may overwrite translations that already exist remotely.
    fn update_translations(&self) -> bool;
}

/// A [`SyncSource`] over values assembled up front.
#[derive(Debug, Clone, Default)]
pub struct StaticSource {
    pub projects: ProjectRegistry,
    pub locales: Vec<BaseLocale>,
    pub update_translations: bool,
}

impl SyncSource for StaticSource {
    fn projects(&self) -> &ProjectRegistry {
        &self.projects
    }

    fn locales_for_update(&self) -> &[BaseLocale] {
        &self.locales
    }

    fn update_translations(&self) -> bool {
        self.update_translations
    }
}

// ---------------------------------------------------------------------------
// Failures
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Project name not in the registry.
    Config,
    /// Transport, status or pagination failure.
    Remote,
    /// Downloaded content could not be checked for untranslated entries.
    Data,
}

impl FailureKind {
    pub fn label(self) -> &'static str {
        match self {
            FailureKind::Config => "config",
            FailureKind::Remote => "remote",
            FailureKind::Data => "data",
        }
    }
}

/// A per-project or per-(project, locale) failure that did not stop the run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncFailure {
    pub project: ProjectName,
    /// `None` when the whole project failed (locale listing).
    pub locale: Option<LocaleName>,
    pub kind: FailureKind,
    pub message: String,
}

impl SyncFailure {
    pub fn for_target(target: &LocaleTarget, kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            project: target.project.clone(),
            locale: Some(target.locale.clone()),
            kind,
            message: message.into(),
        }
    }

    pub fn for_project(project: &ProjectName, kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            project: project.clone(),
            locale: None,
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for SyncFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.locale {
            Some(locale) => write!(f, "[{}] {}:{}: {}", self.kind.label(), self.project, locale, self.message),
            None => write!(f, "[{}] {}: {}", self.kind.label(), self.project, self.message),
        }
    }
}

// ---------------------------------------------------------------------------
// Event sink
// ---------------------------------------------------------------------------

/// Notifications emitted during a run. Called from the orchestrating thread
/// only, in the order the work is applied.
pub trait SyncEvents {
    fn upload_completed(&self, target: &LocaleTarget);

    fn download_completed(&self, target: &LocaleTarget, path: &Path);

    /// A downloaded entry whose translation equals its id.
    fn untranslated(&self, target: &LocaleTarget, id: &str);

    fn error_reported(&self, failure: &SyncFailure);
}

/// Emits every event as a tracing record.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogEvents;

impl SyncEvents for LogEvents {
    fn upload_completed(&self, target: &LocaleTarget) {
        tracing::info!(pair = %target, "uploaded base locale");
    }

    fn download_completed(&self, target: &LocaleTarget, path: &Path) {
        tracing::info!(pair = %target, path = %path.display(), "downloaded locale");
    }

    fn untranslated(&self, target: &LocaleTarget, id: &str) {
        tracing::warn!(pair = %target, id, "untranslated string");
    }

    fn error_reported(&self, failure: &SyncFailure) {
        tracing::error!(kind = failure.kind.label(), "{failure}");
    }
}
