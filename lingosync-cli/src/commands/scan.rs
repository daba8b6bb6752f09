//! `lingosync scan`: build the base locale from the source tree.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;

use lingosync_core::SyncConfig;
use lingosync_scan::{to_locale_json, ScanReport, Scanner};

use crate::settings::{source_root, ConfigArgs};

/// Arguments for `lingosync scan`.
#[derive(Args, Debug)]
pub struct ScanArgs {
    #[command(flatten)]
    pub config: ConfigArgs,

    /// Write the base locale JSON here instead of stdout.
    #[arg(long, value_name = "FILE")]
    pub out: Option<PathBuf>,
}

impl ScanArgs {
    pub fn run(self) -> Result<()> {
        let config = self.config.resolve()?;
        let root = source_root(&config)?;
        let report = scan_tree(&root, &config)?;
        let json = to_locale_json(&report.ids).context("failed to render base locale")?;

        match self.out {
            Some(path) => {
                std::fs::write(&path, &json)
                    .with_context(|| format!("failed to write {}", path.display()))?;
                println!(
                    "✓ {} identifiers from {} files → {}",
                    report.ids.len(),
                    report.files_scanned,
                    path.display()
                );
            }
            None => println!("{json}"),
        }
        Ok(())
    }
}

/// Scan `root` with the configured suffix, call name and worker count.
pub(crate) fn scan_tree(root: &Path, config: &SyncConfig) -> Result<ScanReport> {
    Scanner::from_settings(root, &config.scan)
        .workers(config.parallelism())
        .scan()
        .with_context(|| format!("scan of {} failed", root.display()))
}
