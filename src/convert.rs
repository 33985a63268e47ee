//! Conversions in the opposite direction: standard request to gateway event
//! and gateway response to standard response.
//!
//! Used to replay locally captured traffic through a [`crate::dispatch::Dispatcher`]
//! and to read back what a handler sent, including every `Set-Cookie` value.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use bytes::Bytes;
use http::header::{HOST, HeaderName, HeaderValue, SET_COOKIE};
use http::{HeaderMap, StatusCode};
use lambda_runtime::tracing::warn;
use percent_encoding::percent_decode_str;
use std::collections::HashMap;

use crate::codec;
use crate::models::{GatewayResponse, ProxyRequest};
use crate::request::StandardRequest;

/// Leading path segments recognised as a stage name.
const KNOWN_STAGES: [&str; 3] = ["dev", "prod", "staging"];

/// Response read back from a [`GatewayResponse`].
#[derive(Debug, Clone)]
pub struct StandardResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

/// Builds a v1 proxy event from a standard request.
///
/// A leading `dev`, `prod` or `staging` segment is taken as the stage and
/// removed from the path. Repeated query keys keep every value in the
/// multi-value map and their last value in the single-value map. Bodies that
/// are not UTF-8 are sent base64 encoded.
#[must_use]
pub fn to_gateway_event(request: &StandardRequest) -> ProxyRequest {
    let mut event = ProxyRequest {
        http_method: request.method.to_string(),
        ..ProxyRequest::default()
    };

    // v1 events carry the decoded path.
    let path = percent_decode_str(request.url.path()).decode_utf8_lossy();
    let mut segments = path.trim_start_matches('/').splitn(2, '/');
    match segments.next() {
        Some(first) if KNOWN_STAGES.contains(&first) => {
            event.request_context.stage = first.to_string();
            event.path = format!("/{}", segments.next().unwrap_or_default());
        }
        _ => event.path = path.to_string(),
    }

    let mut single = HashMap::new();
    let mut multi: HashMap<String, Vec<String>> = HashMap::new();
    for (key, value) in request.url.query_pairs() {
        single.insert(key.clone(), value.clone());
        multi.entry(key).or_default().push(value);
    }
    if !single.is_empty() {
        event.query_string_parameters = Some(single);
        event.multi_value_query_string_parameters = Some(multi);
    }

    let mut headers = HashMap::new();
    let mut multi_headers: HashMap<String, Vec<String>> = HashMap::new();
    for name in request.headers.keys() {
        let values: Vec<String> = request
            .headers
            .get_all(name)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .map(str::to_string)
            .collect();
        headers.insert(name.to_string(), values.join(","));
        multi_headers.insert(name.to_string(), values);
    }
    headers.insert(HOST.to_string(), request.host.clone());
    headers.insert(
        "CloudFront-Forwarded-Proto".to_string(),
        request.url.scheme.clone(),
    );
    event.headers = Some(headers);
    event.multi_value_headers = Some(multi_headers);

    event.request_context.identity.source_ip = Some(request.remote_addr.clone());
    event.request_context.request_id.clone_from(&request.request_id);
    if !request.stage_variables.is_empty() {
        event.stage_variables = Some(request.stage_variables.clone());
    }

    if !request.body.is_empty() {
        match std::str::from_utf8(&request.body) {
            Ok(text) => event.body = Some(text.to_string()),
            Err(_) => {
                event.body = Some(STANDARD.encode(&request.body));
                event.is_base64_encoded = true;
            }
        }
    }

    event
}

impl GatewayResponse {
    /// Rebuilds a header multimap, folding the scrambled `Set-Cookie` keys
    /// back into one header with values in their original order.
    ///
    /// # Errors
    ///
    /// Returns an error if the status code is outside `100..=999`.
    pub fn to_standard_response(&self) -> Result<StandardResponse, http::Error> {
        let status = StatusCode::from_u16(self.status_code)?;

        let mut cookies: Vec<(usize, &str)> = Vec::new();
        let mut headers = HeaderMap::new();
        for (key, value) in &self.headers {
            if codec::is_multi_value_header(key)
                && let Some((_, index)) = codec::decode(key)
            {
                cookies.push((index, value));
                continue;
            }
            match (
                HeaderName::from_bytes(key.as_bytes()),
                HeaderValue::from_str(value),
            ) {
                (Ok(name), Ok(value)) => {
                    headers.append(name, value);
                }
                _ => warn!(header = %key, "Skipping invalid response header"),
            }
        }

        cookies.sort_by_key(|(index, _)| *index);
        for (_, cookie) in cookies {
            match HeaderValue::from_str(cookie) {
                Ok(value) => {
                    headers.append(SET_COOKIE, value);
                }
                Err(e) => warn!(error = %e, "Skipping invalid Set-Cookie value"),
            }
        }

        Ok(StandardResponse {
            status,
            headers,
            body: Bytes::from(self.body.clone()),
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::models::GatewayEvent;
    use crate::request::translate;
    use crate::sink::{ResponseSink, ResponseWriter};
    use std::collections::BTreeMap;

    fn request_for(path: &str, query: HashMap<String, Vec<String>>) -> StandardRequest {
        let event = ProxyRequest {
            path: path.to_string(),
            http_method: "POST".to_string(),
            multi_value_query_string_parameters: Some(query),
            headers: Some(HashMap::from([
                ("Host".to_string(), "api.example.com".to_string()),
                ("X-Trace".to_string(), "abc".to_string()),
            ])),
            body: Some("payload".to_string()),
            ..ProxyRequest::default()
        };
        translate(&GatewayEvent::V1(event)).unwrap()
    }

    #[test]
    fn test_stage_segment_is_lifted_out_of_path() {
        let request = request_for("/prod/commentator/all", HashMap::new());
        let event = to_gateway_event(&request);
        assert_eq!(event.request_context.stage, "prod");
        assert_eq!(event.path, "/commentator/all");
    }

    #[test]
    fn test_other_paths_are_kept() {
        let request = request_for("/commentator/all", HashMap::new());
        let event = to_gateway_event(&request);
        assert_eq!(event.request_context.stage, "");
        assert_eq!(event.path, "/commentator/all");
    }

    #[test]
    fn test_path_is_decoded_again() {
        let request = request_for("/sale/50%off now", HashMap::new());
        assert_eq!(request.url.path(), "/sale/50%25off%20now");
        let event = to_gateway_event(&request);
        assert_eq!(event.path, "/sale/50%off now");
    }

    #[test]
    fn test_repeated_query_keys() {
        let request = request_for(
            "/all",
            HashMap::from([(
                "reviewFilter".to_string(),
                vec!["2".to_string(), "5".to_string(), "4".to_string()],
            )]),
        );
        let event = to_gateway_event(&request);
        assert_eq!(
            event.query_string_parameters.unwrap()["reviewFilter"],
            "4"
        );
        assert_eq!(
            event.multi_value_query_string_parameters.unwrap()["reviewFilter"],
            ["2", "5", "4"]
        );
    }

    #[test]
    fn test_headers_and_body_survive() {
        let request = request_for("/all", HashMap::new());
        let event = to_gateway_event(&request);
        let headers = event.headers.unwrap();
        assert_eq!(headers["host"], "api.example.com");
        assert_eq!(headers["x-trace"], "abc");
        assert_eq!(headers["CloudFront-Forwarded-Proto"], "https");
        assert_eq!(event.body.as_deref(), Some("payload"));
        assert!(!event.is_base64_encoded);
    }

    #[test]
    fn test_response_cookies_are_restored_in_order() {
        let mut sink = ResponseSink::new();
        for cookie in ["a=1", "b=2", "c=3"] {
            sink.headers_mut().append("Set-Cookie", cookie);
        }
        sink.headers_mut().append("X-Id", "7");
        let response = sink.to_response().unwrap().to_standard_response().unwrap();

        let cookies: Vec<_> = response.headers.get_all(SET_COOKIE).iter().collect();
        assert_eq!(cookies, ["a=1", "b=2", "c=3"]);
        assert_eq!(response.headers["x-id"], "7");
        assert_eq!(response.status, StatusCode::OK);
    }

    #[test]
    fn test_invalid_status_is_an_error() {
        let response = GatewayResponse {
            status_code: 42,
            headers: BTreeMap::new(),
            body: String::new(),
        };
        assert!(response.to_standard_response().is_err());
    }
}
