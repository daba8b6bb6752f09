//! Run configuration.
//!
//! A [`SyncConfig`] is assembled from an optional YAML file and then
//! overridden by command-line flags. Every field has a default except the
//! token, the source path and the project registry, which [`SyncConfig::validate`]
//! checks before any network activity.
//!
//! ```yaml
//! path: ./services
//! token: "…"
//! default_project: Backend
//! default_locale: en-US
//! projects:
//!   Backend: 0f1e2d3c
//!   Web: 9a8b7c6d
//! max_parallel: 4
//! scan:
//!   file_suffix: api/i18n.go
//!   call_name: NewI18nString
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{io_err, ConfigError};
use crate::types::{LocaleTarget, ProjectRegistry};

pub const DEFAULT_PROJECT: &str = "Backend";
pub const DEFAULT_LOCALE: &str = "en-US";
pub const DEFAULT_API_HOST: &str = "https://api.phrase.com";
pub const DEFAULT_FILE_FORMAT: &str = "go_i18n";
pub const DEFAULT_PER_PAGE: u32 = 25;
pub const DEFAULT_MIN_RUN_INTERVAL_SECS: u64 = 2;
pub const DEFAULT_MAX_PARALLEL: usize = 4;
pub const DEFAULT_PROBE_ADDR: &str = "api.phrase.com:443";
pub const DEFAULT_SCAN_SUFFIX: &str = "api/i18n.go";
pub const DEFAULT_CALL_NAME: &str = "NewI18nString";

/// Full configuration for one `lingosync` invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Root of the source tree; locale files land in `<path>/localized_data`.
    pub path: Option<PathBuf>,
    pub token: Option<String>,
    pub default_project: String,
    pub default_locale: String,
    pub projects: ProjectRegistry,
    pub api_host: String,
    pub file_format: String,
    pub per_page: u32,
    pub min_run_interval_secs: u64,
    pub max_parallel: usize,
    pub probe_addr: String,
    /// Whether an upload may overwrite translations already on the remote.
    pub update_translations: bool,
    pub scan: ScanSettings,
}

/// Which files the source scanner reads and which call it looks for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanSettings {
    pub file_suffix: String,
    pub call_name: String,
}

impl Default for ScanSettings {
    fn default() -> Self {
        Self {
            file_suffix: DEFAULT_SCAN_SUFFIX.to_string(),
            call_name: DEFAULT_CALL_NAME.to_string(),
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            path: None,
            token: None,
            default_project: DEFAULT_PROJECT.to_string(),
            default_locale: DEFAULT_LOCALE.to_string(),
            projects: ProjectRegistry::new(),
            api_host: DEFAULT_API_HOST.to_string(),
            file_format: DEFAULT_FILE_FORMAT.to_string(),
            per_page: DEFAULT_PER_PAGE,
            min_run_interval_secs: DEFAULT_MIN_RUN_INTERVAL_SECS,
            max_parallel: DEFAULT_MAX_PARALLEL,
            probe_addr: DEFAULT_PROBE_ADDR.to_string(),
            update_translations: false,
            scan: ScanSettings::default(),
        }
    }
}

impl SyncConfig {
    /// Load a YAML config file. A missing file is an error here; callers that
    /// treat the file as optional check existence first.
    pub fn load_at(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|e| io_err(path, e))?;
        serde_yaml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Check the settings a sync run cannot do without.
    ///
    /// An unregistered project is not checked here: it only fails the upload
    /// or download that needs it.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.token.as_deref().map_or(true, str::is_empty) {
            return Err(ConfigError::MissingSetting("token"));
        }
        if self.path.as_ref().map_or(true, |p| p.as_os_str().is_empty()) {
            return Err(ConfigError::MissingSetting("path"));
        }
        if self.per_page == 0 {
            return Err(ConfigError::MissingSetting("per_page"));
        }
        Ok(())
    }

    /// The (project, locale) pair the scanned identifier set is uploaded to.
    pub fn base_target(&self) -> LocaleTarget {
        LocaleTarget::new(self.default_project.as_str(), self.default_locale.as_str())
    }

    pub fn min_run_interval(&self) -> Duration {
        Duration::from_secs(self.min_run_interval_secs)
    }

    /// Worker count for remote calls; never zero.
    pub fn parallelism(&self) -> usize {
        self.max_parallel.max(1)
    }
}
