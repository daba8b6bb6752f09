//! Error types for lingosync-core.

use std::path::PathBuf;

use thiserror::Error;

/// All errors that can arise while building or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Underlying I/O failure while reading a config file.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// YAML parse error on load, with the offending file path.
    #[error("failed to parse config at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// A required setting is empty or absent.
    #[error("missing required setting `{0}`")]
    MissingSetting(&'static str),

    /// A project name that has no remote id in the registry.
    #[error("remote project id for '{0}' is not specified")]
    UnknownProject(String),

    /// A `project:locale` or `name:id` pair without its delimiter.
    #[error("invalid {kind} '{value}'; expected <name>:<value>")]
    InvalidPair { kind: &'static str, value: String },
}

pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> ConfigError {
    ConfigError::Io {
        path: path.into(),
        source,
    }
}
