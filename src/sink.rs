//! Response capture sink.
//!
//! Handlers write a response through [`ResponseWriter`]; the gateway needs one
//! complete object back, so [`ResponseSink`] buffers everything and flattens it
//! once the handler returns.

use http::StatusCode;
use lambda_runtime::tracing::{debug, warn};
use std::collections::BTreeMap;
use std::io;

use crate::codec;
use crate::models::{GatewayResponse, ShimError};

/// Header multimap with case-insensitive names.
///
/// Keys are ordered by first use and keep the casing they were first written
/// with; further values under the same name are appended.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CapturedHeaders {
    entries: Vec<(String, Vec<String>)>,
}

impl CapturedHeaders {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Adds a value, keeping any already stored under `name`.
    pub fn append(&mut self, name: &str, value: impl Into<String>) {
        match self.position(name) {
            Some(i) => self.entries[i].1.push(value.into()),
            None => self.entries.push((name.to_string(), vec![value.into()])),
        }
    }

    /// Replaces every value stored under `name`.
    pub fn set(&mut self, name: &str, value: impl Into<String>) {
        match self.position(name) {
            Some(i) => self.entries[i].1 = vec![value.into()],
            None => self.entries.push((name.to_string(), vec![value.into()])),
        }
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.get_all(name).first().map(String::as_str)
    }

    #[must_use]
    pub fn get_all(&self, name: &str) -> &[String] {
        self.position(name)
            .map(|i| self.entries[i].1.as_slice())
            .unwrap_or_default()
    }

    pub fn remove(&mut self, name: &str) -> Option<Vec<String>> {
        self.position(name).map(|i| self.entries.remove(i).1)
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    /// Distinct names with their values, in first-use order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries
            .iter()
            .map(|(name, values)| (name.as_str(), values.as_slice()))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.entries
            .iter()
            .position(|(key, _)| key.eq_ignore_ascii_case(name))
    }
}

/// What handler code writes a response through.
pub trait ResponseWriter {
    fn headers_mut(&mut self) -> &mut CapturedHeaders;

    /// Appends to the response body.
    ///
    /// # Errors
    ///
    /// Returns an error if the bytes could not be accepted.
    fn write_body(&mut self, data: &[u8]) -> io::Result<usize>;

    /// Sets the status. Calling it again replaces the earlier value.
    fn write_status(&mut self, status: StatusCode);
}

/// In-memory [`ResponseWriter`] that becomes a [`GatewayResponse`].
///
/// Nothing reaches the client before [`ResponseSink::to_response`]; a status
/// set after body writes still wins, and trailers cannot be expressed.
#[derive(Debug, Clone, Default)]
pub struct ResponseSink {
    status: Option<StatusCode>,
    headers: CapturedHeaders,
    body: Vec<u8>,
}

impl ResponseSink {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            status: None,
            headers: CapturedHeaders::new(),
            body: Vec::new(),
        }
    }

    /// Status written so far, `200 OK` if none was.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.status.unwrap_or(StatusCode::OK)
    }

    #[must_use]
    pub const fn headers(&self) -> &CapturedHeaders {
        &self.headers
    }

    #[must_use]
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Flattens the captured response into the gateway shape.
    ///
    /// `Set-Cookie` values each get their own case-scrambled key (see
    /// [`crate::codec`]); values of any other repeated header are joined with
    /// a comma. A body that is not UTF-8 is dropped and a 2xx status becomes
    /// 500. Reading only, so calling it twice yields the same response.
    ///
    /// # Errors
    ///
    /// Returns [`ShimError::TooManyHeaderValues`] when more `Set-Cookie`
    /// values were written than the codec can key apart.
    pub fn to_response(&self) -> Result<GatewayResponse, ShimError> {
        let mut status = self.status();
        let body = if let Ok(text) = std::str::from_utf8(&self.body) {
            text.to_string()
        } else {
            warn!(
                body_len = self.body.len(),
                "Response body is not valid UTF-8, dropping it"
            );
            if status.is_success() {
                status = StatusCode::INTERNAL_SERVER_ERROR;
            }
            String::new()
        };

        let mut headers = BTreeMap::new();
        for (name, values) in self.headers.iter() {
            if codec::is_multi_value_header(name) {
                for (index, value) in values.iter().enumerate() {
                    let key = codec::encode(name, index).map_err(|source| {
                        ShimError::TooManyHeaderValues {
                            name: name.to_string(),
                            source,
                        }
                    })?;
                    headers.insert(key, value.clone());
                }
            } else {
                headers.insert(name.to_string(), values.join(","));
            }
        }

        debug!(
            status = status.as_u16(),
            headers = headers.len(),
            body_len = body.len(),
            "Flattened captured response"
        );

        Ok(GatewayResponse {
            status_code: status.as_u16(),
            headers,
            body,
        })
    }
}

impl ResponseWriter for ResponseSink {
    fn headers_mut(&mut self) -> &mut CapturedHeaders {
        &mut self.headers
    }

    fn write_body(&mut self, data: &[u8]) -> io::Result<usize> {
        self.body.extend_from_slice(data);
        Ok(data.len())
    }

    fn write_status(&mut self, status: StatusCode) {
        self.status = Some(status);
    }
}

impl io::Write for ResponseSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.write_body(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
