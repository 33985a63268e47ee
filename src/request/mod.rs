//! Standard request rebuilt from a gateway event.

mod translate;

pub use translate::{is_execute_api_host, translate};

use bytes::buf::Reader;
use bytes::{Buf, Bytes};
use http::uri::PathAndQuery;
use http::{HeaderMap, Method};
use std::collections::HashMap;
use std::fmt;
use url::form_urlencoded;

/// Absolute target of a translated request.
///
/// On execute-api domains the host carries the stage (`id.execute-api.../prod`),
/// which is not a valid URI authority, so the URL is kept as parts rather than
/// an [`http::Uri`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestUrl {
    pub scheme: String,
    pub host: String,
    pub path_and_query: PathAndQuery,
}

impl RequestUrl {
    #[must_use]
    pub fn path(&self) -> &str {
        self.path_and_query.path()
    }

    #[must_use]
    pub fn query(&self) -> Option<&str> {
        self.path_and_query.query()
    }

    /// Decoded query pairs in the order they appear in the URL.
    #[must_use]
    pub fn query_pairs(&self) -> Vec<(String, String)> {
        self.query()
            .map(|q| {
                form_urlencoded::parse(q.as_bytes())
                    .map(|(key, value)| (key.into_owned(), value.into_owned()))
                    .collect()
            })
            .unwrap_or_default()
    }
}

impl fmt::Display for RequestUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // The stage suffix is not part of the path, so its slash is escaped in the authority.
        write!(
            f,
            "{}://{}{}",
            self.scheme,
            self.host.replace('/', "%2F"),
            self.path_and_query
        )
    }
}

/// A request in the shape generic handler code expects.
#[derive(Debug, Clone)]
pub struct StandardRequest {
    pub method: Method,
    pub url: RequestUrl,
    /// Host the request was addressed to, including the stage on execute-api domains.
    pub host: String,
    pub headers: HeaderMap,
    pub body: Bytes,
    pub remote_addr: String,
    /// Stage variables of the invocation, handed to the handler instead of
    /// being exported into the process environment.
    pub stage_variables: HashMap<String, String>,
    pub request_id: String,
}

impl StandardRequest {
    /// First value of a header, if it is valid visible ASCII.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    #[must_use]
    pub fn stage_variable(&self, name: &str) -> Option<&str> {
        self.stage_variables.get(name).map(String::as_str)
    }

    /// Reader over the request body.
    #[must_use]
    pub fn body_reader(&self) -> Reader<Bytes> {
        self.body.clone().reader()
    }
}
