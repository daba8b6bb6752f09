//! # lingosync-remote
//!
//! The remote translation service, seen through three narrow operations:
//! list a project's locales, download one locale conditionally on a cache
//! token, and upload a locale file.
//!
//! [`RemoteLocaleStore`] is the seam the sync orchestrator depends on;
//! [`HttpLocaleStore`] implements it over the service's REST API with `ureq`.
//! [`ConnectivityProbe`] answers the "are we online at all" question that
//! gates a run.

pub mod error;
pub mod http;
pub mod multipart;
pub mod probe;
pub mod store;

pub use error::RemoteError;
pub use http::HttpLocaleStore;
pub use probe::{ConnectivityProbe, TcpProbe};
pub use store::{collect_pages, Download, RemoteLocale, RemoteLocaleStore, UploadRequest};
