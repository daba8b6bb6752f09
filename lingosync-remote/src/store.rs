//! Remote locale store abstraction.

use lingosync_core::{LocaleName, ProjectId};
use serde::{Deserialize, Serialize};

use crate::error::RemoteError;

/// A locale as the remote service describes it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteLocale {
    /// Remote id, used in download URLs.
    pub id: String,
    /// Human-readable name, used for local file names.
    pub name: LocaleName,
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub default: bool,
}

impl RemoteLocale {
    pub fn new(id: impl Into<String>, name: impl Into<LocaleName>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            code: String::new(),
            default: false,
        }
    }
}

/// Result of a conditional download.
///
/// `NotModified` is distinct from a fetched-but-empty body: the former means
/// the supplied cache token is still valid and nothing should happen locally.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Download {
    NotModified,
    Fetched { content: Vec<u8>, etag: String },
}

/// One locale file to push to the remote.
#[derive(Debug, Clone, Copy)]
pub struct UploadRequest<'a> {
    pub locale: &'a LocaleName,
    pub content: &'a [u8],
    /// Allow the upload to overwrite translations that already exist remotely.
    pub update_translations: bool,
    pub file_format: &'a str,
}

/// The three remote operations a sync run needs.
///
/// Implementations are shared across download workers, hence `Send + Sync`.
pub trait RemoteLocaleStore: Send + Sync {
    /// Every locale of `project`, all pages aggregated in remote order.
    fn list_locales(&self, project: &ProjectId) -> Result<Vec<RemoteLocale>, RemoteError>;

    /// Fetch one locale; `etag` turns the request into a conditional one.
    fn download(
        &self,
        project: &ProjectId,
        locale: &RemoteLocale,
        etag: Option<&str>,
    ) -> Result<Download, RemoteError>;

    fn upload(&self, project: &ProjectId, request: &UploadRequest<'_>) -> Result<(), RemoteError>;
}

/// Fetch pages starting at 1 until one comes back shorter than `page_size`.
///
/// A failing page aborts the whole listing for `project`.
pub fn collect_pages<T, F>(
    project: &ProjectId,
    page_size: u32,
    mut fetch: F,
) -> Result<Vec<T>, RemoteError>
where
    F: FnMut(u32) -> Result<Vec<T>, RemoteError>,
{
    let mut all = Vec::new();
    let mut page = 1;
    loop {
        let items = fetch(page).map_err(|source| RemoteError::Page {
            project: project.0.clone(),
            page,
            source: Box::new(source),
        })?;
        let short = items.len() < page_size as usize;
        all.extend(items);
        if short || page_size == 0 {
            return Ok(all);
        }
        page += 1;
    }
}
