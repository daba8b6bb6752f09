//! `lingosync sync`: scan, upload the base locale, download changed locales.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use lingosync_core::LocaleTarget;
use lingosync_remote::{HttpLocaleStore, TcpProbe};
use lingosync_scan::to_locale_json;
use lingosync_sync::{
    BaseLocale, DownloadOutcome, LogEvents, Orchestrator, RunOutcome, RunSummary, StaticSource,
    SyncEvents, SyncFailure, SyncOptions, UploadOutcome,
};

use crate::commands::scan::scan_tree;
use crate::settings::{source_root, ConfigArgs};

/// Arguments for `lingosync sync`.
#[derive(Args, Debug)]
pub struct SyncArgs {
    #[command(flatten)]
    pub config: ConfigArgs,

    /// Run record location [default: lingosync_run_info.json in the temp dir]
    #[arg(long, value_name = "FILE")]
    pub state: Option<PathBuf>,

    /// Empty <path>/localized_data before downloading.
    #[arg(long)]
    pub clean: bool,

    /// Let the upload overwrite translations that already exist remotely.
    #[arg(long)]
    pub update_translations: bool,
}

impl SyncArgs {
    pub fn run(self) -> Result<()> {
        let mut config = self.config.resolve()?;
        if self.update_translations {
            config.update_translations = true;
        }
        config.validate().context("invalid configuration")?;
        let root = source_root(&config)?;

        let report = scan_tree(&root, &config)?;
        let content = to_locale_json(&report.ids).context("failed to render base locale")?;
        tracing::info!(
            ids = report.ids.len(),
            files = report.files_scanned,
            "scanned source tree"
        );

        let source = StaticSource {
            projects: config.projects.clone(),
            locales: vec![BaseLocale {
                target: config.base_target(),
                content: content.into_bytes(),
            }],
            update_translations: config.update_translations,
        };
        let remote = HttpLocaleStore::from_config(&config);
        let probe = TcpProbe::new(config.probe_addr.as_str());
        let mut options = SyncOptions::from_config(&config)?.clean(self.clean);
        if let Some(state) = self.state {
            options = options.state_path(state);
        }

        let outcome = Orchestrator::new(&remote, &probe, &source, &ConsoleEvents, options)
            .run()
            .context("sync failed")?;

        match outcome {
            RunOutcome::Throttled { since_last_run } if since_last_run < chrono::Duration::zero() => {
                println!("· last run is recorded in the future, skipping")
            }
            RunOutcome::Throttled { since_last_run } => println!(
                "· last run finished {}ms ago, skipping",
                since_last_run.num_milliseconds()
            ),
            RunOutcome::Completed(summary) => print_summary(&summary),
        }
        Ok(())
    }
}

/// Logs every event and echoes untranslated strings to stdout.
struct ConsoleEvents;

impl SyncEvents for ConsoleEvents {
    fn upload_completed(&self, target: &LocaleTarget) {
        LogEvents.upload_completed(target);
    }

    fn download_completed(&self, target: &LocaleTarget, path: &Path) {
        LogEvents.download_completed(target, path);
    }

    fn untranslated(&self, target: &LocaleTarget, id: &str) {
        LogEvents.untranslated(target, id);
        println!("  {}  {target}: untranslated '{id}'", "!".yellow().bold());
    }

    fn error_reported(&self, failure: &SyncFailure) {
        LogEvents.error_reported(failure);
    }
}

fn print_summary(summary: &RunSummary) {
    let uploaded = summary
        .uploads
        .iter()
        .filter(|u| u.outcome == UploadOutcome::Uploaded)
        .count();
    println!(
        "✓ sync complete ({} uploaded, {} written, {} not modified, {} untranslated, {} failed)",
        uploaded,
        summary.written(),
        summary.not_modified(),
        summary.untranslated(),
        summary.failures.len(),
    );

    for upload in &summary.uploads {
        match upload.outcome {
            UploadOutcome::Uploaded => println!("  ↑  {}  uploaded", upload.target),
            UploadOutcome::Failed => println!("  {}  {}  failed", "✗".red(), upload.target),
        }
    }
    for download in &summary.downloads {
        match &download.outcome {
            DownloadOutcome::Written { path, untranslated } if *untranslated > 0 => println!(
                "  ✎  {}  written ({untranslated} untranslated) {}",
                download.target,
                path.display()
            ),
            DownloadOutcome::Written { path, .. } => {
                println!("  ✎  {}  written {}", download.target, path.display())
            }
            DownloadOutcome::NotModified => println!("  ·  {}  not modified", download.target),
            DownloadOutcome::Empty => println!("  ∅  {}  empty", download.target),
            DownloadOutcome::Failed => println!("  {}  {}  failed", "✗".red(), download.target),
        }
    }

    if !summary.failures.is_empty() {
        println!("{}", "failures:".red().bold());
        for failure in &summary.failures {
            println!("  {failure}");
        }
    }
}
