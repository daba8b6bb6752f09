//! One synchronization run.
//!
//! ```text
//! probe ─► load run record ─► interval gate ─► upload base locales
//!       ─► list + download every remote locale ─► save run record
//! ```
//!
//! Only the probe and local I/O failures end a run early. Remote and
//! configuration failures are reported per project or per (project, locale)
//! and the remaining work continues.
//!
//! Downloads fan out over a bounded set of scoped worker threads. Their
//! results are applied in listing order on the calling thread, so the
//! [`ChecksumStore`] has a single writer and the run record is saved once.

use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use chrono::Utc;

use lingosync_core::{config, paths, ConfigError, LocaleTarget, ProjectId, SyncConfig};
use lingosync_remote::{
    ConnectivityProbe, Download, RemoteError, RemoteLocale, RemoteLocaleStore, UploadRequest,
};

use crate::checksum_store::{self, ChecksumStore};
use crate::detector::ChangeDetector;
use crate::error::SyncError;
use crate::events::{FailureKind, SyncEvents, SyncFailure, SyncSource};
use crate::writer;

// ---------------------------------------------------------------------------
// Options and results
// ---------------------------------------------------------------------------

/// Per-run settings that are not part of the data source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncOptions {
    /// Root of the source tree; files land below `<base_path>/localized_data`.
    pub base_path: PathBuf,
    /// Location of the persisted run record.
    pub state_path: PathBuf,
    pub min_run_interval: Duration,
    /// Upper bound on simultaneous downloads.
    pub max_parallel: usize,
    pub file_format: String,
    /// Empty `<base_path>/localized_data` before downloading.
    pub clean: bool,
}

impl SyncOptions {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
            state_path: paths::run_info_path(),
            min_run_interval: Duration::from_secs(config::DEFAULT_MIN_RUN_INTERVAL_SECS),
            max_parallel: config::DEFAULT_MAX_PARALLEL,
            file_format: config::DEFAULT_FILE_FORMAT.to_string(),
            clean: false,
        }
    }

    pub fn from_config(config: &SyncConfig) -> Result<Self, ConfigError> {
        let base_path = config
            .path
            .clone()
            .ok_or(ConfigError::MissingSetting("path"))?;
        Ok(Self {
            min_run_interval: config.min_run_interval(),
            max_parallel: config.parallelism(),
            file_format: config.file_format.clone(),
            ..Self::new(base_path)
        })
    }

    #[must_use]
    pub fn state_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.state_path = path.into();
        self
    }

    #[must_use]
    pub fn min_run_interval(mut self, interval: Duration) -> Self {
        self.min_run_interval = interval;
        self
    }

    #[must_use]
    pub fn max_parallel(mut self, workers: usize) -> Self {
        self.max_parallel = workers;
        self
    }

    #[must_use]
    pub fn clean(mut self, clean: bool) -> Self {
        self.clean = clean;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadOutcome {
    Uploaded,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadResult {
    pub target: LocaleTarget,
    pub outcome: UploadOutcome,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadOutcome {
    /// New content written; `untranslated` entries were reported.
    Written { path: PathBuf, untranslated: usize },
    /// The remote confirmed the cache token; nothing was touched.
    NotModified,
    /// The remote answered with an empty body; nothing was touched.
    Empty,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadResult {
    pub target: LocaleTarget,
    pub outcome: DownloadOutcome,
}

/// Everything a completed run did, in the order it was applied.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub uploads: Vec<UploadResult>,
    pub downloads: Vec<DownloadResult>,
    pub failures: Vec<SyncFailure>,
}

impl RunSummary {
    pub fn written(&self) -> usize {
        self.downloads
            .iter()
            .filter(|d| matches!(d.outcome, DownloadOutcome::Written { .. }))
            .count()
    }

    pub fn not_modified(&self) -> usize {
        self.downloads
            .iter()
            .filter(|d| d.outcome == DownloadOutcome::NotModified)
            .count()
    }

    pub fn untranslated(&self) -> usize {
        self.downloads
            .iter()
            .map(|d| match d.outcome {
                DownloadOutcome::Written { untranslated, .. } => untranslated,
                _ => 0,
            })
            .sum()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// The previous run finished less than the minimum interval ago. No
    /// remote call was made and the run record was not rewritten.
    ///
    /// `since_last_run` is negative when the recorded run lies in the future.
    Throttled { since_last_run: chrono::Duration },
    Completed(RunSummary),
}

// ---------------------------------------------------------------------------
// Orchestrator
// ---------------------------------------------------------------------------

struct DownloadJob {
    target: LocaleTarget,
    project_id: ProjectId,
    locale: RemoteLocale,
    etag: Option<String>,
}

pub struct Orchestrator<'a> {
    remote: &'a dyn RemoteLocaleStore,
    probe: &'a dyn ConnectivityProbe,
    source: &'a dyn SyncSource,
    events: &'a dyn SyncEvents,
    options: SyncOptions,
}

impl<'a> Orchestrator<'a> {
    pub fn new(
        remote: &'a dyn RemoteLocaleStore,
        probe: &'a dyn ConnectivityProbe,
        source: &'a dyn SyncSource,
        events: &'a dyn SyncEvents,
        options: SyncOptions,
    ) -> Self {
        Self {
            remote,
            probe,
            source,
            events,
            options,
        }
    }

    pub fn options(&self) -> &SyncOptions {
        &self.options
    }

    pub fn run(&self) -> Result<RunOutcome, SyncError> {
        let started = Instant::now();
        self.probe.check().map_err(SyncError::Offline)?;

        let mut store = checksum_store::load_at(&self.options.state_path);
        if let Some(elapsed) = store.since_last_run(Utc::now()) {
            // A last run stamped in the future (clock skew) gates as well.
            let throttled = chrono::Duration::from_std(self.options.min_run_interval)
                .map_or(true, |min| elapsed < min);
            if throttled {
                tracing::info!(
                    elapsed_ms = elapsed.num_milliseconds(),
                    min_interval_ms = self.options.min_run_interval.as_millis() as u64,
                    "last run too recent, skipping"
                );
                return Ok(RunOutcome::Throttled {
                    since_last_run: elapsed,
                });
            }
        }

        if self.options.clean {
            writer::clear_dir(&paths::localized_dir(&self.options.base_path))?;
        }

        let mut summary = RunSummary::default();
        self.upload_phase(&mut summary);
        self.download_phase(&mut store, &mut summary)?;

        store.mark_run(Utc::now());
        checksum_store::save_at(&self.options.state_path, &store)?;

        tracing::info!(
            uploads = summary.uploads.len(),
            written = summary.written(),
            not_modified = summary.not_modified(),
            failures = summary.failures.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "sync run complete"
        );
        Ok(RunOutcome::Completed(summary))
    }

    fn report(&self, summary: &mut RunSummary, failure: SyncFailure) {
        self.events.error_reported(&failure);
        summary.failures.push(failure);
    }

    // -----------------------------------------------------------------------
    // Upload
    // -----------------------------------------------------------------------

    fn upload_phase(&self, summary: &mut RunSummary) {
        for base in self.source.locales_for_update() {
            let target = &base.target;
            let outcome = match self.source.projects().resolve(&target.project) {
                None => {
                    let err = ConfigError::UnknownProject(target.project.0.clone());
                    self.report(
                        summary,
                        SyncFailure::for_target(target, FailureKind::Config, err.to_string()),
                    );
                    UploadOutcome::Failed
                }
                Some(project_id) => {
                    let request = UploadRequest {
                        locale: &target.locale,
                        content: &base.content,
                        update_translations: self.source.update_translations(),
                        file_format: &self.options.file_format,
                    };
                    match self.remote.upload(project_id, &request) {
                        Ok(()) => {
                            self.events.upload_completed(target);
                            UploadOutcome::Uploaded
                        }
                        Err(err) => {
                            self.report(
                                summary,
                                SyncFailure::for_target(target, FailureKind::Remote, err.to_string()),
                            );
                            UploadOutcome::Failed
                        }
                    }
                }
            };
            summary.uploads.push(UploadResult {
                target: target.clone(),
                outcome,
            });
        }
    }

    // -----------------------------------------------------------------------
    // Download sweep
    // -----------------------------------------------------------------------

    fn download_phase(
        &self,
        store: &mut ChecksumStore,
        summary: &mut RunSummary,
    ) -> Result<(), SyncError> {
        let jobs = self.plan_downloads(store, summary)?;
        let results = self.fetch_all(&jobs)?;
        for (job, result) in jobs.into_iter().zip(results) {
            let outcome = self.apply(store, &job, result, summary)?;
            summary.downloads.push(DownloadResult {
                target: job.target,
                outcome,
            });
        }
        Ok(())
    }

    /// List every project's locales and pick the cache token for each.
    fn plan_downloads(
        &self,
        store: &ChecksumStore,
        summary: &mut RunSummary,
    ) -> Result<Vec<DownloadJob>, SyncError> {
        let detector = ChangeDetector::new(store, &self.options.base_path);
        let mut jobs = Vec::new();
        for (project, project_id) in self.source.projects().iter() {
            if !paths::is_plain_component(&project.0) {
                self.report(
                    summary,
                    SyncFailure::for_project(
                        project,
                        FailureKind::Config,
                        format!("project name '{project}' cannot be used as a directory name"),
                    ),
                );
                continue;
            }
            let locales = match self.remote.list_locales(project_id) {
                Ok(locales) => locales,
                Err(err) => {
                    self.report(
                        summary,
                        SyncFailure::for_project(project, FailureKind::Remote, err.to_string()),
                    );
                    continue;
                }
            };
            for locale in locales {
                let target = LocaleTarget {
                    project: project.clone(),
                    locale: locale.name.clone(),
                };
                if !paths::is_plain_component(&target.locale.0) {
                    self.report(
                        summary,
                        SyncFailure::for_target(
                            &target,
                            FailureKind::Data,
                            format!("remote locale name '{}' is not a plain file name", target.locale),
                        ),
                    );
                    summary.downloads.push(DownloadResult {
                        target,
                        outcome: DownloadOutcome::Failed,
                    });
                    continue;
                }
                let etag = detector.should_trust_cache(&target)?;
                jobs.push(DownloadJob {
                    target,
                    project_id: project_id.clone(),
                    locale,
                    etag,
                });
            }
        }
        Ok(jobs)
    }

    /// Download every job on at most `max_parallel` threads. Results come
    /// back in job order.
    fn fetch_all(
        &self,
        jobs: &[DownloadJob],
    ) -> Result<Vec<Result<Download, RemoteError>>, SyncError> {
        let workers = self.options.max_parallel.max(1).min(jobs.len());
        if workers == 0 {
            return Ok(Vec::new());
        }

        let counter = AtomicUsize::new(0);
        let next = &counter;
        let remote = self.remote;

        let mut indexed = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..workers)
                .map(|_| {
                    scope.spawn(move || {
                        let mut done = Vec::new();
                        loop {
                            let index = next.fetch_add(1, Ordering::Relaxed);
                            let Some(job) = jobs.get(index) else {
                                break;
                            };
                            let result =
                                remote.download(&job.project_id, &job.locale, job.etag.as_deref());
                            done.push((index, result));
                        }
                        done
                    })
                })
                .collect();

            let mut merged = Vec::with_capacity(jobs.len());
            for handle in handles {
                let done = handle.join().map_err(|_| SyncError::WorkerPanicked)?;
                merged.extend(done);
            }
            Ok::<_, SyncError>(merged)
        })?;

        indexed.sort_by_key(|(index, _)| *index);
        Ok(indexed.into_iter().map(|(_, result)| result).collect())
    }

    fn apply(
        &self,
        store: &mut ChecksumStore,
        job: &DownloadJob,
        result: Result<Download, RemoteError>,
        summary: &mut RunSummary,
    ) -> Result<DownloadOutcome, SyncError> {
        let target = &job.target;
        let (content, etag) = match result {
            Err(err) => {
                self.report(
                    summary,
                    SyncFailure::for_target(target, FailureKind::Remote, err.to_string()),
                );
                return Ok(DownloadOutcome::Failed);
            }
            Ok(Download::NotModified) => return Ok(DownloadOutcome::NotModified),
            Ok(Download::Fetched { content, .. }) if content.is_empty() => {
                tracing::debug!(pair = %target, "empty download, skipping");
                return Ok(DownloadOutcome::Empty);
            }
            Ok(Download::Fetched { content, etag }) => (content, etag),
        };

        let path = self.locale_path(target);
        let crc32 = writer::write_locale_file(&path, &content)?;
        store.upsert(target, etag, crc32);

        let untranslated = match writer::untranslated_ids(&content) {
            Ok(ids) => {
                for id in &ids {
                    self.events.untranslated(target, id);
                }
                ids.len()
            }
            Err(err) => {
                self.report(
                    summary,
                    SyncFailure::for_target(
                        target,
                        FailureKind::Data,
                        format!("cannot check for untranslated strings: {err}"),
                    ),
                );
                0
            }
        };

        self.events.download_completed(target, &path);
        Ok(DownloadOutcome::Written { path, untranslated })
    }

    fn locale_path(&self, target: &LocaleTarget) -> PathBuf {
        paths::locale_file_path(&self.options.base_path, &target.project, &target.locale)
    }
}
