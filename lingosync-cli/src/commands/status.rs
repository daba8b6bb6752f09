//! `lingosync status`: downloaded locale files versus the last run record.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use lingosync_core::{paths, LocaleTarget};
use lingosync_sync::{checksum_store, detector::format_datetime_age, ChangeDetector, LocaleStatus};

use crate::settings::{source_root, ConfigArgs};

/// Arguments for `lingosync status`.
#[derive(Args, Debug)]
pub struct StatusArgs {
    #[command(flatten)]
    pub config: ConfigArgs,

    /// Run record location [default: lingosync_run_info.json in the temp dir]
    #[arg(long, value_name = "FILE")]
    pub state: Option<PathBuf>,

    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,

    /// Only report these pairs; repeatable.
    #[arg(long, value_name = "PROJECT:LOCALE")]
    pub only: Vec<String>,
}

impl StatusArgs {
    pub fn run(self) -> Result<()> {
        let config = self.config.resolve()?;
        let root = source_root(&config)?;
        let state = self.state.unwrap_or_else(paths::run_info_path);
        let only = self
            .only
            .iter()
            .map(|key| LocaleTarget::parse(key).with_context(|| format!("invalid --only '{key}'")))
            .collect::<Result<Vec<_>>>()?;

        let report = build_report(&root, &state, &only)?;
        if self.json {
            print_json(report)?;
            return Ok(());
        }
        print_table(report);
        Ok(())
    }
}

#[derive(Debug, Clone)]
struct LocaleRow {
    target: LocaleTarget,
    status: LocaleStatus,
    etag: String,
    path: PathBuf,
}

#[derive(Debug, Clone)]
struct StatusReport {
    last_run_at: Option<String>,
    last_run_age: String,
    locales: Vec<LocaleRow>,
}

impl StatusReport {
    fn needs_sync(&self) -> usize {
        self.locales
            .iter()
            .filter(|row| row.status != LocaleStatus::Current)
            .count()
    }
}

#[derive(Serialize)]
struct StatusReportJson {
    last_run_at: Option<String>,
    last_run_age: String,
    locales: Vec<LocaleStatusJson>,
}

#[derive(Serialize)]
struct LocaleStatusJson {
    project: String,
    locale: String,
    status: &'static str,
    etag: String,
    path: String,
}

#[derive(Tabled)]
struct StatusTableRow {
    #[tabled(rename = "")]
    indicator: String,
    #[tabled(rename = "project")]
    project: String,
    #[tabled(rename = "locale")]
    locale: String,
    #[tabled(rename = "status")]
    status: String,
    #[tabled(rename = "etag")]
    etag: String,
}

/// Rows for every recorded pair, or only those in `only` when it is non-empty.
fn build_report(root: &Path, state: &Path, only: &[LocaleTarget]) -> Result<StatusReport> {
    let store = checksum_store::load_at(state);
    let detector = ChangeDetector::new(&store, root);

    let mut locales = Vec::with_capacity(store.len());
    for record in store.records() {
        let target = LocaleTarget {
            project: record.project.clone(),
            locale: record.locale.clone(),
        };
        if !only.is_empty() && !only.contains(&target) {
            continue;
        }
        let status = detector
            .status(&target)
            .with_context(|| format!("status check failed for {target}"))?;
        locales.push(LocaleRow {
            path: detector.locale_path(&target),
            target,
            status,
            etag: record.etag.clone(),
        });
    }
    locales.sort_by(|a, b| a.target.cmp(&b.target));

    let (last_run_at, last_run_age) = match store.last_run() {
        Some(at) => (Some(at.to_rfc3339()), format_datetime_age(at)),
        None => (None, "never".to_string()),
    };
    Ok(StatusReport {
        last_run_at,
        last_run_age,
        locales,
    })
}

fn print_json(report: StatusReport) -> Result<()> {
    let payload = StatusReportJson {
        last_run_at: report.last_run_at,
        last_run_age: report.last_run_age,
        locales: report
            .locales
            .into_iter()
            .map(|row| LocaleStatusJson {
                project: row.target.project.0,
                locale: row.target.locale.0,
                status: status_key(&row.status),
                etag: row.etag,
                path: row.path.display().to_string(),
            })
            .collect(),
    };
    println!(
        "{}",
        serde_json::to_string_pretty(&payload).context("failed to serialize status JSON")?
    );
    Ok(())
}

fn print_table(report: StatusReport) {
    println!(
        "lingosync v{} | {} locales | {} need sync | last run {}",
        env!("CARGO_PKG_VERSION"),
        report.locales.len(),
        report.needs_sync(),
        if report.last_run_at.is_some() {
            format!("{} ago", report.last_run_age)
        } else {
            report.last_run_age.clone()
        },
    );

    if report.locales.is_empty() {
        println!("No locales downloaded yet. Run 'lingosync sync' first.");
        return;
    }

    println!(
        "Indicators: {} CURRENT  {} MODIFIED  {} MISSING",
        status_indicator(&LocaleStatus::Current),
        status_indicator(&LocaleStatus::Modified),
        status_indicator(&LocaleStatus::Missing),
    );
    let rows: Vec<StatusTableRow> = report
        .locales
        .iter()
        .map(|row| StatusTableRow {
            indicator: status_indicator(&row.status),
            project: row.target.project.to_string(),
            locale: row.target.locale.to_string(),
            status: status_label(&row.status).to_string(),
            etag: row.etag.clone(),
        })
        .collect();
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{table}");

    if report.needs_sync() > 0 {
        println!("Modified or missing files are downloaded again on the next 'lingosync sync'.");
    }
}

fn status_key(status: &LocaleStatus) -> &'static str {
    match status {
        LocaleStatus::NeverSynced => "never_synced",
        LocaleStatus::Current => "current",
        LocaleStatus::Modified => "modified",
        LocaleStatus::Missing => "missing",
    }
}

fn status_label(status: &LocaleStatus) -> &'static str {
    match status {
        LocaleStatus::NeverSynced => "NEVER SYNCED",
        LocaleStatus::Current => "CURRENT",
        LocaleStatus::Modified => "MODIFIED",
        LocaleStatus::Missing => "MISSING",
    }
}

fn status_indicator(status: &LocaleStatus) -> String {
    match status {
        LocaleStatus::NeverSynced => "■".bright_black().bold().to_string(),
        LocaleStatus::Current => "■".green().bold().to_string(),
        LocaleStatus::Modified => "■".yellow().bold().to_string(),
        LocaleStatus::Missing => "■".red().bold().to_string(),
    }
}
