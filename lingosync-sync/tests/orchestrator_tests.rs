//! End-to-end runs of the orchestrator against in-memory collaborators.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use tempfile::TempDir;

use lingosync_core::{paths, LocaleTarget, ProjectId, ProjectName, ProjectRegistry};
use lingosync_remote::{
    ConnectivityProbe, Download, RemoteError, RemoteLocale, RemoteLocaleStore, UploadRequest,
};
use lingosync_sync::{
    checksum_store, BaseLocale, DownloadOutcome, FailureKind, Orchestrator, RunOutcome, RunSummary,
    StaticSource, SyncError, SyncEvents, SyncFailure, SyncOptions, UploadOutcome,
};

// ---------------------------------------------------------------------------
// Fakes
// ---------------------------------------------------------------------------

#[derive(Clone)]
enum Answer {
    NotModified,
    Content(&'static str, &'static str),
    Fail,
}

#[derive(Default)]
struct FakeRemote {
    locales: HashMap<String, Vec<RemoteLocale>>,
    failing_projects: Vec<String>,
    /// Keyed by remote locale id. The last answer repeats.
    answers: Mutex<HashMap<String, Vec<Answer>>>,
    failing_uploads: Vec<String>,
    calls: AtomicUsize,
    downloads: Mutex<Vec<(String, Option<String>)>>,
    uploads: Mutex<Vec<(String, String, String, bool)>>,
}

impl FakeRemote {
    fn project(mut self, id: &str, locale_ids: &[&str]) -> Self {
        let locales = locale_ids
            .iter()
            .map(|l| RemoteLocale::new(format!("{id}-{l}"), *l))
            .collect();
        self.locales.insert(id.to_string(), locales);
        self
    }

    fn answer(self, project_id: &str, locale: &str, answers: Vec<Answer>) -> Self {
        self.answers
            .lock()
            .unwrap()
            .insert(format!("{project_id}-{locale}"), answers);
        self
    }

    fn total_calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn download_calls(&self) -> Vec<(String, Option<String>)> {
        let mut calls = self.downloads.lock().unwrap().clone();
        calls.sort();
        calls
    }
}

impl RemoteLocaleStore for FakeRemote {
    fn list_locales(&self, project: &ProjectId) -> Result<Vec<RemoteLocale>, RemoteError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing_projects.contains(&project.0) {
            return Err(RemoteError::Transport {
                url: format!("fake://{project}"),
                message: "connection reset".into(),
            });
        }
        Ok(self.locales.get(&project.0).cloned().unwrap_or_default())
    }

    fn download(
        &self,
        _project: &ProjectId,
        locale: &RemoteLocale,
        etag: Option<&str>,
    ) -> Result<Download, RemoteError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.downloads
            .lock()
            .unwrap()
            .push((locale.id.clone(), etag.map(str::to_string)));

        let mut answers = self.answers.lock().unwrap();
        let queue = answers.entry(locale.id.clone()).or_default();
        let answer = if queue.len() > 1 {
            queue.remove(0)
        } else {
            queue.first().cloned().unwrap_or(Answer::Content("[]", "\"default\""))
        };
        match answer {
            Answer::NotModified => Ok(Download::NotModified),
            Answer::Content(body, etag) => Ok(Download::Fetched {
                content: body.as_bytes().to_vec(),
                etag: etag.to_string(),
            }),
            Answer::Fail => Err(RemoteError::Status {
                url: format!("fake://{}", locale.id),
                status: 500,
                body: "boom".into(),
            }),
        }
    }

    fn upload(&self, project: &ProjectId, request: &UploadRequest<'_>) -> Result<(), RemoteError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.uploads.lock().unwrap().push((
            project.0.clone(),
            request.locale.0.clone(),
            String::from_utf8_lossy(request.content).into_owned(),
            request.update_translations,
        ));
        if self.failing_uploads.contains(&request.locale.0) {
            return Err(RemoteError::Status {
                url: "fake://upload".into(),
                status: 422,
                body: "rejected".into(),
            });
        }
        Ok(())
    }
}

struct FakeProbe {
    online: bool,
}

impl ConnectivityProbe for FakeProbe {
    fn check(&self) -> Result<(), RemoteError> {
        if self.online {
            Ok(())
        } else {
            Err(RemoteError::Unreachable {
                addr: "fake:443".into(),
                source: std::io::Error::new(std::io::ErrorKind::TimedOut, "timed out"),
            })
        }
    }
}

#[derive(Default)]
struct RecordingEvents {
    uploads: Mutex<Vec<String>>,
    downloads: Mutex<Vec<String>>,
    untranslated: Mutex<Vec<(String, String)>>,
    errors: Mutex<Vec<SyncFailure>>,
}

impl SyncEvents for RecordingEvents {
    fn upload_completed(&self, target: &LocaleTarget) {
        self.uploads.lock().unwrap().push(target.to_string());
    }

    fn download_completed(&self, target: &LocaleTarget, _path: &Path) {
        self.downloads.lock().unwrap().push(target.to_string());
    }

    fn untranslated(&self, target: &LocaleTarget, id: &str) {
        self.untranslated
            .lock()
            .unwrap()
            .push((target.to_string(), id.to_string()));
    }

    fn error_reported(&self, failure: &SyncFailure) {
        self.errors.lock().unwrap().push(failure.clone());
    }
}

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

struct Harness {
    _dir: TempDir,
    base: PathBuf,
    state: PathBuf,
    source: StaticSource,
    events: RecordingEvents,
    interval: Duration,
    workers: usize,
}

impl Harness {
    fn new(projects: &[(&str, &str)]) -> Self {
        let dir = TempDir::new().expect("tempdir");
        let base = dir.path().join("service");
        let state = dir.path().join("state").join("run_info.json");
        Self {
            _dir: dir,
            base,
            state,
            source: StaticSource {
                projects: projects.iter().copied().collect::<ProjectRegistry>(),
                locales: Vec::new(),
                update_translations: false,
            },
            events: RecordingEvents::default(),
            interval: Duration::ZERO,
            workers: 2,
        }
    }

    fn with_upload(mut self, project: &str, locale: &str, content: &str) -> Self {
        self.source.locales.push(BaseLocale {
            target: LocaleTarget::new(project, locale),
            content: content.as_bytes().to_vec(),
        });
        self
    }

    fn options(&self) -> SyncOptions {
        SyncOptions::new(&self.base)
            .state_path(&self.state)
            .min_run_interval(self.interval)
            .max_parallel(self.workers)
    }

    fn run(&self, remote: &FakeRemote) -> RunOutcome {
        self.run_with(remote, self.options())
    }

    fn run_with(&self, remote: &FakeRemote, options: SyncOptions) -> RunOutcome {
        let probe = FakeProbe { online: true };
        Orchestrator::new(remote, &probe, &self.source, &self.events, options)
            .run()
            .expect("run")
    }

    fn run_err(&self, remote: &FakeRemote) -> SyncError {
        let probe = FakeProbe { online: true };
        Orchestrator::new(remote, &probe, &self.source, &self.events, self.options())
            .run()
            .expect_err("run should fail")
    }

    fn locale_file(&self, project: &str, locale: &str) -> PathBuf {
        paths::locale_file_path(
            &self.base,
            &ProjectName::from(project),
            &lingosync_core::LocaleName::from(locale),
        )
    }
}

fn completed(outcome: RunOutcome) -> RunSummary {
    match outcome {
        RunOutcome::Completed(summary) => summary,
        RunOutcome::Throttled { .. } => panic!("run was throttled"),
    }
}

const DE_V1: &str = r#"[{"id":"hello","translation":"Hallo"}]"#;
const DE_V2: &str = r#"[{"id":"hello","translation":"Servus"}]"#;

// ---------------------------------------------------------------------------
// 1. Download sweep
// ---------------------------------------------------------------------------

#[test]
fn first_run_downloads_unconditionally_and_records_checksum() {
    let h = Harness::new(&[("Backend", "be")]);
    let remote = FakeRemote::default()
        .project("be", &["de-DE"])
        .answer("be", "de-DE", vec![Answer::Content(DE_V1, "\"v1\"")]);

    let summary = completed(h.run(&remote));

    assert_eq!(remote.download_calls(), vec![("be-de-DE".to_string(), None)]);
    let path = h.locale_file("Backend", "de-DE");
    assert_eq!(fs::read_to_string(&path).unwrap(), DE_V1);
    assert_eq!(
        summary.downloads[0].outcome,
        DownloadOutcome::Written {
            path,
            untranslated: 0
        }
    );

    let store = checksum_store::load_at(&h.state);
    let target = LocaleTarget::new("Backend", "de-DE");
    assert_eq!(store.len(), 1);
    assert_eq!(store.etag(&target), Some("\"v1\""));
    assert_eq!(store.checksum(&target), Some(crc32fast::hash(DE_V1.as_bytes())));
    assert!(store.last_run().is_some());
    assert_eq!(*h.events.downloads.lock().unwrap(), vec!["Backend:de-DE"]);
}

#[test]
fn unchanged_file_presents_token_and_not_modified_touches_nothing() {
    let h = Harness::new(&[("Backend", "be")]);
    let remote = FakeRemote::default().project("be", &["de-DE"]).answer(
        "be",
        "de-DE",
        vec![Answer::Content(DE_V1, "\"v1\""), Answer::NotModified],
    );

    completed(h.run(&remote));
    let path = h.locale_file("Backend", "de-DE");
    let mtime = fs::metadata(&path).unwrap().modified().unwrap();
    let record_before = checksum_store::load_at(&h.state).records().to_vec();

    let summary = completed(h.run(&remote));

    assert_eq!(
        remote.download_calls(),
        vec![
            ("be-de-DE".to_string(), None),
            ("be-de-DE".to_string(), Some("\"v1\"".to_string())),
        ]
    );
    assert_eq!(summary.downloads[0].outcome, DownloadOutcome::NotModified);
    assert_eq!(fs::metadata(&path).unwrap().modified().unwrap(), mtime);
    assert_eq!(checksum_store::load_at(&h.state).records(), record_before.as_slice());
    assert_eq!(h.events.downloads.lock().unwrap().len(), 1);
}

#[test]
fn locally_edited_file_forces_unconditional_download() {
    let h = Harness::new(&[("Backend", "be")]);
    let remote = FakeRemote::default().project("be", &["de-DE"]).answer(
        "be",
        "de-DE",
        vec![Answer::Content(DE_V1, "\"v1\""), Answer::Content(DE_V2, "\"v2\"")],
    );

    completed(h.run(&remote));
    fs::write(h.locale_file("Backend", "de-DE"), "[]").unwrap();
    completed(h.run(&remote));

    let calls = remote.download_calls();
    assert_eq!(calls.len(), 2);
    assert!(calls.iter().all(|(_, etag)| etag.is_none()), "got: {calls:?}");
    assert_eq!(fs::read_to_string(h.locale_file("Backend", "de-DE")).unwrap(), DE_V2);

    let store = checksum_store::load_at(&h.state);
    let target = LocaleTarget::new("Backend", "de-DE");
    assert_eq!(store.len(), 1);
    assert_eq!(store.etag(&target), Some("\"v2\""));
    assert_eq!(store.checksum(&target), Some(crc32fast::hash(DE_V2.as_bytes())));
}

#[test]
fn identical_content_still_persists_new_token() {
    let h = Harness::new(&[("Backend", "be")]);
    let remote = FakeRemote::default().project("be", &["de-DE"]).answer(
        "be",
        "de-DE",
        vec![Answer::Content(DE_V1, "\"v1\""), Answer::Content(DE_V1, "\"v1b\"")],
    );

    completed(h.run(&remote));
    completed(h.run(&remote));

    let store = checksum_store::load_at(&h.state);
    assert_eq!(store.len(), 1);
    assert_eq!(store.etag(&LocaleTarget::new("Backend", "de-DE")), Some("\"v1b\""));
}

#[test]
fn empty_body_is_skipped() {
    let h = Harness::new(&[("Backend", "be")]);
    let remote = FakeRemote::default()
        .project("be", &["de-DE"])
        .answer("be", "de-DE", vec![Answer::Content("", "\"e\"")]);

    let summary = completed(h.run(&remote));

    assert_eq!(summary.downloads[0].outcome, DownloadOutcome::Empty);
    assert!(!h.locale_file("Backend", "de-DE").exists());
    assert!(checksum_store::load_at(&h.state).is_empty());
    assert!(h.events.downloads.lock().unwrap().is_empty());
}

#[test]
fn untranslated_entry_warns_exactly_once() {
    let h = Harness::new(&[("Backend", "be")]);
    let remote = FakeRemote::default().project("be", &["de-DE"]).answer(
        "be",
        "de-DE",
        vec![Answer::Content(r#"[{"id":"hello","translation":"hello"}]"#, "\"v1\"")],
    );

    let summary = completed(h.run(&remote));

    assert_eq!(
        *h.events.untranslated.lock().unwrap(),
        vec![("Backend:de-DE".to_string(), "hello".to_string())]
    );
    assert_eq!(summary.untranslated(), 1);
}

#[test]
fn malformed_content_is_kept_and_reported() {
    let h = Harness::new(&[("Backend", "be")]);
    let remote = FakeRemote::default()
        .project("be", &["de-DE"])
        .answer("be", "de-DE", vec![Answer::Content("not json", "\"v1\"")]);

    let summary = completed(h.run(&remote));

    assert!(h.locale_file("Backend", "de-DE").exists());
    assert_eq!(checksum_store::load_at(&h.state).len(), 1);
    assert_eq!(summary.failures.len(), 1);
    assert_eq!(summary.failures[0].kind, FailureKind::Data);
}

#[test]
fn failures_are_isolated_per_pair_and_project() {
    let h = Harness::new(&[("Backend", "be"), ("Mobile", "mo")]);
    let mut remote = FakeRemote::default()
        .project("be", &["de-DE", "fr-FR"])
        .project("mo", &["it-IT"])
        .answer("be", "de-DE", vec![Answer::Fail])
        .answer("be", "fr-FR", vec![Answer::Content("[]", "\"f\"")]);
    remote.failing_projects.push("mo".into());

    let summary = completed(h.run(&remote));

    assert!(h.locale_file("Backend", "fr-FR").exists());
    assert!(!h.locale_file("Backend", "de-DE").exists());
    let errors = h.events.errors.lock().unwrap();
    assert_eq!(errors.len(), 2);
    assert!(errors
        .iter()
        .any(|f| f.project.0 == "Mobile" && f.locale.is_none() && f.kind == FailureKind::Remote));
    assert!(errors
        .iter()
        .any(|f| f.locale.as_ref().map(|l| l.0.as_str()) == Some("de-DE")));
    assert_eq!(summary.failures.len(), 2);
    assert_eq!(checksum_store::load_at(&h.state).len(), 1);
}

#[test]
fn parallel_sweep_applies_results_in_listing_order() {
    let locales = ["a", "b", "c", "d", "e", "f", "g", "h"];
    let mut h = Harness::new(&[("Backend", "be")]);
    h.workers = 3;
    let remote = FakeRemote::default().project("be", &locales);

    let summary = completed(h.run(&remote));

    let order: Vec<_> = summary
        .downloads
        .iter()
        .map(|d| d.target.locale.0.clone())
        .collect();
    assert_eq!(order, locales);
    assert_eq!(remote.download_calls().len(), locales.len());
    assert_eq!(checksum_store::load_at(&h.state).len(), locales.len());
}

// ---------------------------------------------------------------------------
// 2. Upload
// ---------------------------------------------------------------------------

#[test]
fn base_locale_upload_notifies_once() {
    let h = Harness::new(&[("Backend", "be")])
        .with_upload("Backend", "en-US", r#"{"hello":"hello","bye":"bye"}"#);
    let remote = FakeRemote::default();

    let summary = completed(h.run(&remote));

    assert_eq!(*h.events.uploads.lock().unwrap(), vec!["Backend:en-US"]);
    assert_eq!(summary.uploads[0].outcome, UploadOutcome::Uploaded);
    let uploads = remote.uploads.lock().unwrap();
    assert_eq!(uploads.len(), 1);
    assert_eq!(uploads[0].0, "be");
    assert_eq!(uploads[0].1, "en-US");
    assert!(uploads[0].2.contains("\"bye\""));
    assert!(!uploads[0].3);
}

#[test]
fn unknown_project_is_reported_and_siblings_continue() {
    let h = Harness::new(&[("Backend", "be")])
        .with_upload("Web", "en-US", "[]")
        .with_upload("Backend", "en-US", "[]");
    let remote = FakeRemote::default();

    let summary = completed(h.run(&remote));

    let errors = h.events.errors.lock().unwrap();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].kind, FailureKind::Config);
    assert!(errors[0].message.contains("'Web'"));
    assert_eq!(*h.events.uploads.lock().unwrap(), vec!["Backend:en-US"]);
    assert_eq!(summary.uploads[0].outcome, UploadOutcome::Failed);
    assert_eq!(summary.uploads[1].outcome, UploadOutcome::Uploaded);
}

#[test]
fn rejected_upload_does_not_stop_downloads() {
    let h = Harness::new(&[("Backend", "be")]).with_upload("Backend", "en-US", "[]");
    let mut remote = FakeRemote::default().project("be", &["de-DE"]);
    remote.failing_uploads.push("en-US".into());

    let summary = completed(h.run(&remote));

    assert!(h.events.uploads.lock().unwrap().is_empty());
    assert_eq!(summary.failures[0].kind, FailureKind::Remote);
    assert!(h.locale_file("Backend", "de-DE").exists());
}

// ---------------------------------------------------------------------------
// 3. Run gating
// ---------------------------------------------------------------------------

#[test]
fn second_run_within_interval_is_a_no_op() {
    let mut h = Harness::new(&[("Backend", "be")]).with_upload("Backend", "en-US", "[]");
    h.interval = Duration::from_secs(3600);
    let remote = FakeRemote::default().project("be", &["de-DE"]);

    completed(h.run(&remote));
    let calls = remote.total_calls();
    let bytes = fs::read(&h.state).unwrap();
    let mtime = fs::metadata(&h.state).unwrap().modified().unwrap();

    let outcome = h.run(&remote);

    assert!(matches!(outcome, RunOutcome::Throttled { .. }));
    assert_eq!(remote.total_calls(), calls);
    assert_eq!(fs::read(&h.state).unwrap(), bytes);
    assert_eq!(fs::metadata(&h.state).unwrap().modified().unwrap(), mtime);
}

#[test]
fn last_run_in_the_future_is_throttled() {
    let mut h = Harness::new(&[("Backend", "be")]).with_upload("Backend", "en-US", "[]");
    h.interval = Duration::from_secs(3600);
    let mut store = checksum_store::ChecksumStore::new();
    store.mark_run(chrono::Utc::now() + chrono::Duration::seconds(600));
    checksum_store::save_at(&h.state, &store).unwrap();
    let bytes = fs::read(&h.state).unwrap();
    let remote = FakeRemote::default().project("be", &["de-DE"]);

    let outcome = h.run(&remote);

    match outcome {
        RunOutcome::Throttled { since_last_run } => {
            assert!(since_last_run < chrono::Duration::zero())
        }
        RunOutcome::Completed(_) => panic!("future last run was not throttled"),
    }
    assert_eq!(remote.total_calls(), 0);
    assert_eq!(fs::read(&h.state).unwrap(), bytes);
}

#[test]
fn offline_run_aborts_before_any_work() {
    let h = Harness::new(&[("Backend", "be")]).with_upload("Backend", "en-US", "[]");
    let remote = FakeRemote::default().project("be", &["de-DE"]);
    let probe = FakeProbe { online: false };

    let err = Orchestrator::new(&remote, &probe, &h.source, &h.events, h.options())
        .run()
        .unwrap_err();

    assert!(matches!(err, SyncError::Offline(_)));
    assert_eq!(remote.total_calls(), 0);
    assert!(!h.state.exists());
}

#[test]
fn corrupt_run_record_starts_fresh() {
    let h = Harness::new(&[("Backend", "be")]);
    fs::create_dir_all(h.state.parent().unwrap()).unwrap();
    fs::write(&h.state, "{\"lst\": [garbage").unwrap();
    let remote = FakeRemote::default().project("be", &["de-DE"]);

    completed(h.run(&remote));

    assert_eq!(remote.download_calls(), vec![("be-de-DE".to_string(), None)]);
    assert_eq!(checksum_store::load_at(&h.state).len(), 1);
}

#[test]
fn clean_run_empties_localized_data_first() {
    let h = Harness::new(&[("Backend", "be")]);
    let stale = h.locale_file("Old", "xx-XX");
    fs::create_dir_all(stale.parent().unwrap()).unwrap();
    fs::write(&stale, "[]").unwrap();
    let remote = FakeRemote::default().project("be", &["de-DE"]);

    completed(h.run_with(&remote, h.options().clean(true)));

    assert!(!stale.exists());
    assert!(h.locale_file("Backend", "de-DE").exists());
}

// ---------------------------------------------------------------------------
// 4. Unsafe names and fatal local I/O
// ---------------------------------------------------------------------------

#[test]
fn locale_name_with_path_segments_is_rejected() {
    let h = Harness::new(&[("Backend", "be")]);
    let remote = FakeRemote::default().project("be", &["../../escaped", "de-DE"]);

    let summary = completed(h.run(&remote));

    assert!(!h.base.join("escaped.json").exists());
    assert!(!h.base.join("localized_data").join("escaped.json").exists());
    assert_eq!(remote.download_calls(), vec![("be-de-DE".to_string(), None)]);
    assert_eq!(summary.failures.len(), 1);
    assert_eq!(summary.failures[0].kind, FailureKind::Data);
    assert!(summary
        .downloads
        .iter()
        .any(|d| d.target.locale.0 == "../../escaped" && d.outcome == DownloadOutcome::Failed));

    let store = checksum_store::load_at(&h.state);
    assert_eq!(store.len(), 1);
    assert!(h.locale_file("Backend", "de-DE").exists());
}

#[test]
fn project_name_with_path_segments_is_skipped() {
    let h = Harness::new(&[("../Backend", "be"), ("Web", "web")]);
    let remote = FakeRemote::default()
        .project("be", &["de-DE"])
        .project("web", &["fr-FR"]);

    let summary = completed(h.run(&remote));

    assert_eq!(remote.download_calls(), vec![("web-fr-FR".to_string(), None)]);
    assert_eq!(summary.failures.len(), 1);
    assert_eq!(summary.failures[0].kind, FailureKind::Config);
    assert!(summary.failures[0].locale.is_none());
    assert!(!h.base.join("Backend").exists());
}

#[test]
fn unwritable_run_record_is_fatal_and_keeps_locale_files() {
    let h = Harness::new(&[("Backend", "be")]);
    // The run record's parent directory is a regular file.
    let parent = h.state.parent().unwrap();
    fs::write(parent, "not a directory").unwrap();
    let remote = FakeRemote::default()
        .project("be", &["de-DE"])
        .answer("be", "de-DE", vec![Answer::Content(DE_V1, "\"v1\"")]);

    let err = h.run_err(&remote);

    assert!(matches!(err, SyncError::Io { .. }), "{err}");
    assert_eq!(
        fs::read_to_string(h.locale_file("Backend", "de-DE")).unwrap(),
        DE_V1
    );
    assert!(!h.state.exists());
    assert_eq!(fs::read_to_string(parent).unwrap(), "not a directory");
}

#[test]
fn unwritable_locale_dir_is_fatal_and_persists_nothing() {
    let h = Harness::new(&[("Backend", "be")]);
    let project_dir = paths::project_dir(&h.base, &ProjectName::from("Backend"));
    fs::create_dir_all(project_dir.parent().unwrap()).unwrap();
    fs::write(&project_dir, "not a directory").unwrap();
    let remote = FakeRemote::default().project("be", &["de-DE"]);

    let err = h.run_err(&remote);

    match err {
        SyncError::Io { path, .. } => assert!(path.starts_with(&project_dir), "{}", path.display()),
        other => panic!("expected an I/O error, got {other}"),
    }
    assert!(!h.state.exists());
}
