//! REST implementation of [`RemoteLocaleStore`].
//!
//! Endpoints (relative to the API host):
//!
//! ```text
//! GET  /v2/projects/<project>/locales?page=N&per_page=P
//! GET  /v2/projects/<project>/locales/<locale_id>/download?file_format=F
//! POST /v2/projects/<project>/uploads            (multipart/form-data)
//! ```

use std::io::Read;
use std::time::Duration;

use lingosync_core::{config, ProjectId, SyncConfig};

use crate::error::RemoteError;
use crate::multipart::Multipart;
use crate::store::{collect_pages, Download, RemoteLocale, RemoteLocaleStore, UploadRequest};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const USER_AGENT: &str = concat!("lingosync/", env!("CARGO_PKG_VERSION"));
const ERROR_BODY_LIMIT: usize = 512;

/// Blocking HTTP client for the translation service.
#[derive(Clone)]
pub struct HttpLocaleStore {
    agent: ureq::Agent,
    api_host: String,
    token: String,
    file_format: String,
    per_page: u32,
}

impl HttpLocaleStore {
    pub fn new(api_host: impl Into<String>, token: impl Into<String>) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(USER_AGENT)
            .build();
        Self {
            agent,
            api_host: api_host.into().trim_end_matches('/').to_string(),
            token: token.into(),
            file_format: config::DEFAULT_FILE_FORMAT.to_string(),
            per_page: config::DEFAULT_PER_PAGE,
        }
    }

    pub fn from_config(config: &SyncConfig) -> Self {
        Self::new(
            config.api_host.as_str(),
            config.token.clone().unwrap_or_default(),
        )
        .file_format(config.file_format.as_str())
        .per_page(config.per_page)
    }

    #[must_use]
    pub fn file_format(mut self, format: impl Into<String>) -> Self {
        self.file_format = format.into();
        self
    }

    #[must_use]
    pub fn per_page(mut self, per_page: u32) -> Self {
        self.per_page = per_page;
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.api_host, path)
    }

    fn authorized(&self, request: ureq::Request) -> ureq::Request {
        request.set("Authorization", &format!("token {}", self.token))
    }

    fn list_page(&self, project: &ProjectId, page: u32) -> Result<Vec<RemoteLocale>, RemoteError> {
        let url = self.url(&format!("/v2/projects/{project}/locales"));
        let response = self
            .authorized(self.agent.get(&url))
            .query("page", &page.to_string())
            .query("per_page", &self.per_page.to_string())
            .call()
            .map_err(|e| call_err(&url, e))?;
        response
            .into_json::<Vec<RemoteLocale>>()
            .map_err(|e| RemoteError::Decode {
                url,
                message: e.to_string(),
            })
    }
}

impl RemoteLocaleStore for HttpLocaleStore {
    fn list_locales(&self, project: &ProjectId) -> Result<Vec<RemoteLocale>, RemoteError> {
        let locales = collect_pages(project, self.per_page, |page| self.list_page(project, page))?;
        tracing::debug!(project = %project, count = locales.len(), "listed locales");
        Ok(locales)
    }

    fn download(
        &self,
        project: &ProjectId,
        locale: &RemoteLocale,
        etag: Option<&str>,
    ) -> Result<Download, RemoteError> {
        let url = self.url(&format!(
            "/v2/projects/{project}/locales/{}/download",
            locale.id
        ));
        let mut request = self
            .authorized(self.agent.get(&url))
            .query("file_format", &self.file_format);
        if let Some(etag) = etag {
            request = request.set("If-None-Match", etag);
        }
        let response = request.call().map_err(|e| call_err(&url, e))?;

        // Every answer, 304 included, must hand back a cache token.
        let Some(new_etag) = response.header("ETag").map(str::to_string) else {
            return Err(RemoteError::MissingEtag { url });
        };
        match response.status() {
            304 => {
                tracing::debug!(project = %project, locale = %locale.name, "not modified");
                Ok(Download::NotModified)
            }
            200 => {
                let mut content = Vec::new();
                response
                    .into_reader()
                    .read_to_end(&mut content)
                    .map_err(|source| RemoteError::Io {
                        url: url.clone(),
                        source,
                    })?;
                Ok(Download::Fetched {
                    content,
                    etag: new_etag,
                })
            }
            status => Err(RemoteError::Status {
                url,
                status,
                body: read_body(response),
            }),
        }
    }

    fn upload(&self, project: &ProjectId, request: &UploadRequest<'_>) -> Result<(), RemoteError> {
        let url = self.url(&format!("/v2/projects/{project}/uploads"));
        let mut form = Multipart::new();
        form.file(
            "file",
            format!("{}.json", request.locale),
            "application/json",
            request.content,
        )
        .text("locale_id", request.locale.0.as_str())
        .text("update_translations", request.update_translations.to_string())
        .text("file_format", request.file_format)
        .text("utf8", "\u{2713}");
        let (content_type, body) = form.finish();

        let response = self
            .authorized(self.agent.post(&url))
            .set("Content-Type", &content_type)
            .send_bytes(&body)
            .map_err(|e| call_err(&url, e))?;
        if !(200..300).contains(&response.status()) {
            return Err(RemoteError::Status {
                url,
                status: response.status(),
                body: read_body(response),
            });
        }
        tracing::debug!(project = %project, locale = %request.locale, "uploaded");
        Ok(())
    }
}

fn call_err(url: &str, err: ureq::Error) -> RemoteError {
    match err {
        ureq::Error::Status(status, response) => RemoteError::Status {
            url: url.to_string(),
            status,
            body: read_body(response),
        },
        ureq::Error::Transport(transport) => RemoteError::Transport {
            url: url.to_string(),
            message: transport.to_string(),
        },
    }
}

fn read_body(response: ureq::Response) -> String {
    let mut body = response.into_string().unwrap_or_default();
    if body.len() > ERROR_BODY_LIMIT {
        let mut end = ERROR_BODY_LIMIT;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        body.truncate(end);
    }
    body
}
