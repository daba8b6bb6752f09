//! Domain types, configuration and well-known paths shared by every lingosync crate.
//!
//! - [`types`]: newtypes for projects, locales and remote ids
//! - [`config`]: [`SyncConfig`] loading, merging and validation
//! - [`paths`]: localized data layout and run-record location
//! - [`error`]: [`ConfigError`]

pub mod config;
pub mod error;
pub mod paths;
pub mod types;

pub use config::{ScanSettings, SyncConfig};
pub use error::ConfigError;
pub use types::{
    LocaleName, LocaleTarget, ProjectId, ProjectName, ProjectRegistry, TranslationEntry,
};
