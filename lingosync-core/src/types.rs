//! Domain types shared by every lingosync crate.
//!
//! Names are human-readable (`Backend`, `en-US`); ids are the opaque strings the
//! remote translation service assigns. All types serialize via serde.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Delimiter between the two halves of a composite key (`Backend:en-US`).
pub const PAIR_DELIMITER: char = ':';

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// Human-readable project name, as used for local directories.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProjectName(pub String);

impl fmt::Display for ProjectName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for ProjectName {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ProjectName {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// Human-readable locale name (`en-US`), as used for local file names.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LocaleName(pub String);

impl fmt::Display for LocaleName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for LocaleName {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for LocaleName {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// Remote project id assigned by the translation service.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProjectId(pub String);

impl fmt::Display for ProjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for ProjectId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ProjectId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

// ---------------------------------------------------------------------------
// LocaleTarget
// ---------------------------------------------------------------------------

/// A (project, locale) pair, the unit every sync step works on.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LocaleTarget {
    pub project: ProjectName,
    pub locale: LocaleName,
}

impl LocaleTarget {
    pub fn new(project: impl Into<ProjectName>, locale: impl Into<LocaleName>) -> Self {
        Self {
            project: project.into(),
            locale: locale.into(),
        }
    }

    /// Parse a composite `project:locale` key.
    ///
    /// Only the first delimiter splits; both halves must be non-empty.
    pub fn parse(key: &str) -> Result<Self, ConfigError> {
        let (project, locale) = split_pair(key, "locale target")?;
        Ok(Self::new(project, locale))
    }
}

impl fmt::Display for LocaleTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.project, PAIR_DELIMITER, self.locale)
    }
}

// ---------------------------------------------------------------------------
// ProjectRegistry
// ---------------------------------------------------------------------------

/// Mapping from project name to remote project id.
///
/// Ordered so that sweeps over every project are deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProjectRegistry(BTreeMap<ProjectName, ProjectId>);

impl ProjectRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the id for `name`.
    pub fn insert(&mut self, name: impl Into<ProjectName>, id: impl Into<ProjectId>) {
        self.0.insert(name.into(), id.into());
    }

    /// Parse and insert a `Name:remote_id` entry.
    pub fn insert_entry(&mut self, entry: &str) -> Result<(), ConfigError> {
        let (name, id) = split_pair(entry, "project id entry")?;
        self.insert(name, id);
        Ok(())
    }

    pub fn resolve(&self, name: &ProjectName) -> Option<&ProjectId> {
        self.0.get(name)
    }

    pub fn contains(&self, name: &ProjectName) -> bool {
        self.0.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ProjectName, &ProjectId)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<N: Into<ProjectName>, I: Into<ProjectId>> FromIterator<(N, I)> for ProjectRegistry {
    fn from_iter<T: IntoIterator<Item = (N, I)>>(iter: T) -> Self {
        Self(
            iter.into_iter()
                .map(|(n, i)| (n.into(), i.into()))
                .collect(),
        )
    }
}

// ---------------------------------------------------------------------------
// TranslationEntry
// ---------------------------------------------------------------------------

/// One `{ "id": …, "translation": … }` element of a locale file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslationEntry {
    pub id: String,
    pub translation: String,
}

impl TranslationEntry {
    /// Entry whose translation is the identifier itself.
    pub fn untranslated(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            translation: id.clone(),
            id,
        }
    }

    pub fn is_untranslated(&self) -> bool {
        self.id == self.translation
    }
}

fn split_pair<'a>(value: &'a str, kind: &'static str) -> Result<(&'a str, &'a str), ConfigError> {
    match value.split_once(PAIR_DELIMITER) {
        Some((left, right)) if !left.is_empty() && !right.is_empty() => Ok((left, right)),
        _ => Err(ConfigError::InvalidPair {
            kind,
            value: value.to_string(),
        }),
    }
}
