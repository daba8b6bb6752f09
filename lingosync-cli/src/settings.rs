//! Config file + command-line overrides shared by every subcommand.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use lingosync_core::{paths, SyncConfig};

#[derive(Args, Debug, Clone, Default)]
pub struct ConfigArgs {
    /// YAML config file [default: <config dir>/lingosync/config.yaml, if present]
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Root of the source tree; locales land in <path>/localized_data.
    #[arg(long, value_name = "DIR")]
    pub path: Option<PathBuf>,

    /// Translation service API token.
    #[arg(long, env = "LINGOSYNC_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Project the scanned identifiers are uploaded to.
    #[arg(long)]
    pub project: Option<String>,

    /// Locale the scanned identifiers are uploaded as.
    #[arg(long)]
    pub locale: Option<String>,

    /// Remote project id as `Name:id`; repeatable.
    #[arg(long = "project-id", value_name = "NAME:ID")]
    pub project_ids: Vec<String>,

    /// Translation service base URL.
    #[arg(long, value_name = "URL")]
    pub api_host: Option<String>,

    /// Upper bound on simultaneous downloads and scan workers.
    #[arg(long, value_name = "N")]
    pub max_parallel: Option<usize>,
}

impl ConfigArgs {
    /// The config file (if any) with every given flag applied on top.
    pub fn resolve(&self) -> Result<SyncConfig> {
        let mut config = self.load_file()?;
        self.apply(&mut config)?;
        Ok(config)
    }

    fn load_file(&self) -> Result<SyncConfig> {
        if let Some(path) = &self.config {
            return SyncConfig::load_at(path)
                .with_context(|| format!("failed to load config {}", path.display()));
        }
        match paths::default_config_path() {
            Some(path) if path.exists() => {
                tracing::debug!(path = %path.display(), "using default config file");
                SyncConfig::load_at(&path)
                    .with_context(|| format!("failed to load config {}", path.display()))
            }
            _ => Ok(SyncConfig::default()),
        }
    }

    fn apply(&self, config: &mut SyncConfig) -> Result<()> {
        if let Some(path) = &self.path {
            config.path = Some(path.clone());
        }
        if let Some(token) = &self.token {
            config.token = Some(token.clone());
        }
        if let Some(project) = &self.project {
            config.default_project = project.clone();
        }
        if let Some(locale) = &self.locale {
            config.default_locale = locale.clone();
        }
        if let Some(host) = &self.api_host {
            config.api_host = host.clone();
        }
        if let Some(workers) = self.max_parallel {
            config.max_parallel = workers;
        }
        for entry in &self.project_ids {
            config
                .projects
                .insert_entry(entry)
                .with_context(|| format!("invalid --project-id '{entry}'"))?;
        }
        Ok(())
    }
}

/// The source root, which every subcommand needs.
pub fn source_root(config: &SyncConfig) -> Result<PathBuf> {
    config
        .path
        .clone()
        .context("no source path: pass --path or set `path` in the config file")
}
