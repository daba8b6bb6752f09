//! Error types for lingosync-remote.

use thiserror::Error;

/// All errors that can arise from talking to the remote service.
#[derive(Debug, Error)]
pub enum RemoteError {
    /// Connection, DNS, TLS or timeout failure.
    #[error("request to {url} failed: {message}")]
    Transport { url: String, message: String },

    /// The service answered with a status the operation does not accept.
    #[error("{url} answered HTTP {status}: {body}")]
    Status {
        url: String,
        status: u16,
        body: String,
    },

    /// Download responses must always carry a cache token.
    #[error("response from {url} carries no ETag header")]
    MissingEtag { url: String },

    /// Response body did not decode into the expected shape.
    #[error("failed to decode response from {url}: {message}")]
    Decode { url: String, message: String },

    /// Reading the response body failed midway.
    #[error("failed to read response from {url}: {source}")]
    Io {
        url: String,
        #[source]
        source: std::io::Error,
    },

    /// One page of a paginated listing failed; earlier pages are discarded.
    #[error("listing page {page} for project {project} failed: {source}")]
    Page {
        project: String,
        page: u32,
        #[source]
        source: Box<RemoteError>,
    },

    /// The connectivity probe could not reach its address.
    #[error("{addr} is unreachable: {source}")]
    Unreachable {
        addr: String,
        #[source]
        source: std::io::Error,
    },
}
