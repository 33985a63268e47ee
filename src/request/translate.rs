use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use bytes::Bytes;
use http::header::{COOKIE, HeaderName, HeaderValue};
use http::uri::PathAndQuery;
use http::{HeaderMap, Method};
use lambda_runtime::tracing::{debug, warn};
use std::collections::BTreeMap;

use super::{RequestUrl, StandardRequest};
use crate::models::{GatewayEvent, TranslateError};
use crate::utils::{escape_path, escape_raw_path, escape_raw_query, find_header};

/// Host used when the event names none.
const PLACEHOLDER_HOST: &str = "host";

/// v2 HTTP APIs serve the `$default` stage without a path segment.
const DEFAULT_STAGE: &str = "$default";

const FORWARDED_PROTO_HEADERS: [&str; 2] = ["CloudFront-Forwarded-Proto", "X-Forwarded-Proto"];

/// Rebuilds a [`StandardRequest`] from either payload format.
///
/// # Errors
///
/// Returns a [`TranslateError`] when the method is not a valid token, the path
/// does not start with `/`, the target cannot be parsed, or a base64 flagged
/// body does not decode.
pub fn translate(event: &GatewayEvent) -> Result<StandardRequest, TranslateError> {
    let method = parse_method(event.method())?;

    let path = event.path();
    if !path.is_empty() && !path.starts_with('/') {
        return Err(TranslateError::InvalidPath {
            path: path.to_string(),
        });
    }

    let path = match event {
        GatewayEvent::V1(_) => escape_path(path),
        GatewayEvent::V2(_) => escape_raw_path(path),
    };
    let target = format!("{path}{}", query_string(event));
    let path_and_query =
        PathAndQuery::try_from(target.as_str()).map_err(|source| TranslateError::InvalidTarget {
            target: target.clone(),
            source,
        })?;

    let host = request_host(event);
    let scheme = FORWARDED_PROTO_HEADERS
        .iter()
        .find_map(|name| find_header(event.headers(), name))
        .unwrap_or("https")
        .to_string();

    let body = match event.body() {
        Some(body) if event.is_base64_encoded() => Bytes::from(STANDARD.decode(body)?),
        Some(body) => Bytes::copy_from_slice(body.as_bytes()),
        None => Bytes::new(),
    };

    let request = StandardRequest {
        method,
        url: RequestUrl {
            scheme,
            host: host.clone(),
            path_and_query,
        },
        host,
        headers: request_headers(event),
        body,
        remote_addr: event.source_ip().unwrap_or_default().to_string(),
        stage_variables: event.stage_variables().clone(),
        request_id: event.request_id().to_string(),
    };

    debug!(
        method = %request.method,
        url = %request.url,
        headers = request.headers.len(),
        body_len = request.body.len(),
        "Translated gateway event"
    );

    Ok(request)
}

fn parse_method(method: &str) -> Result<Method, TranslateError> {
    if method.is_empty() {
        return Ok(Method::GET);
    }
    Method::from_bytes(method.as_bytes()).map_err(|_| TranslateError::InvalidMethod {
        method: method.to_string(),
    })
}

/// Query string of the request, with its leading `?`.
///
/// A v2 `rawQueryString` is the query exactly as the client sent it, so it is
/// used as is. Otherwise the query is rebuilt from the parameter maps.
fn query_string(event: &GatewayEvent) -> String {
    if let GatewayEvent::V2(req) = event
        && let Some(raw) = req.raw_query_string.as_deref().filter(|q| !q.is_empty())
    {
        return format!("?{}", escape_raw_query(raw));
    }
    encode_query(&query_pairs(event))
}

/// Query pairs rebuilt from the parameter maps: keys sorted, values in source
/// list order.
///
/// v1 prefers the multi-value map when the gateway sent one. v2 splits the
/// comma-joined values the gateway produces for repeated keys, which cannot
/// tell a literal comma apart, so it only serves events without a raw query.
fn query_pairs(event: &GatewayEvent) -> Vec<(&str, &str)> {
    match event {
        GatewayEvent::V1(req) => {
            if let Some(multi) = req
                .multi_value_query_string_parameters
                .as_ref()
                .filter(|m| !m.is_empty())
            {
                let sorted: BTreeMap<_, _> = multi.iter().collect();
                sorted
                    .into_iter()
                    .flat_map(|(k, values)| values.iter().map(move |v| (k.as_str(), v.as_str())))
                    .collect()
            } else {
                let sorted: BTreeMap<_, _> = req.query_string_parameters.iter().flatten().collect();
                sorted
                    .into_iter()
                    .map(|(k, v)| (k.as_str(), v.as_str()))
                    .collect()
            }
        }
        GatewayEvent::V2(req) => {
            let sorted: BTreeMap<_, _> = req.query_string_parameters.iter().flatten().collect();
            sorted
                .into_iter()
                .flat_map(|(k, joined)| joined.split(',').map(move |v| (k.as_str(), v)))
                .collect()
        }
    }
}

fn encode_query(pairs: &[(&str, &str)]) -> String {
    if pairs.is_empty() {
        return String::new();
    }
    let joined = pairs
        .iter()
        .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&");
    format!("?{joined}")
}

/// Host the client addressed, with the stage appended on execute-api domains.
///
/// The stage is part of the routing path there, yet the gateway leaves it out
/// of `path`. Custom domains map stages through base paths, so they are left alone.
fn request_host(event: &GatewayEvent) -> String {
    let domain_name = match event {
        GatewayEvent::V1(_) => None,
        GatewayEvent::V2(req) => req.request_context.domain_name.as_deref(),
    };
    let host = find_header(event.headers(), "host")
        .or(domain_name)
        .unwrap_or(PLACEHOLDER_HOST);

    let stage = event.stage();
    if is_execute_api_host(host) && !stage.is_empty() && stage != DEFAULT_STAGE {
        format!("{host}/{stage}")
    } else {
        host.to_string()
    }
}

/// Whether `host` is a default `{id}.execute-api.{region}.amazonaws.com` domain.
#[must_use]
pub fn is_execute_api_host(host: &str) -> bool {
    let host = host.split_once(':').map_or(host, |(name, _)| name);
    let labels: Vec<&str> = host.split('.').collect();
    let n = labels.len();
    n >= 5
        && labels[n - 1].eq_ignore_ascii_case("com")
        && labels[n - 2].eq_ignore_ascii_case("amazonaws")
        && labels[n - 4].eq_ignore_ascii_case("execute-api")
        && labels[..n - 4].iter().all(|l| !l.is_empty())
        && !labels[n - 3].is_empty()
}

/// Copies every inbound header, appending rather than replacing repeated names.
fn request_headers(event: &GatewayEvent) -> HeaderMap {
    let mut headers = HeaderMap::new();

    match event {
        GatewayEvent::V1(req) => {
            if let Some(multi) = req.multi_value_headers.as_ref().filter(|m| !m.is_empty()) {
                for (name, values) in multi {
                    for value in values {
                        append_header(&mut headers, name, value);
                    }
                }
            } else {
                for (name, value) in event.headers() {
                    append_header(&mut headers, name, value);
                }
            }
        }
        GatewayEvent::V2(req) => {
            for (name, value) in event.headers() {
                append_header(&mut headers, name, value);
            }
            // HTTP APIs move the Cookie header into a separate array.
            if let Some(cookies) = req.cookies.as_ref().filter(|c| !c.is_empty())
                && !headers.contains_key(COOKIE)
            {
                append_header(&mut headers, COOKIE.as_str(), &cookies.join("; "));
            }
        }
    }

    headers
}

fn append_header(headers: &mut HeaderMap, name: &str, value: &str) {
    match (
        HeaderName::from_bytes(name.as_bytes()),
        HeaderValue::from_str(value),
    ) {
        (Ok(name), Ok(value)) => {
            headers.append(name, value);
        }
        (Err(e), _) => warn!(header = %name, error = %e, "Dropping header with invalid name"),
        (_, Err(e)) => warn!(header = %name, error = %e, "Dropping header with invalid value"),
    }
}
