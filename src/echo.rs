//! Echo handler served by the `apigw-shim` binary.
//!
//! Reflects the translated request back as JSON, which makes it easy to check
//! a deployment end to end. Every `cookie` query value is sent back as its own
//! `Set-Cookie` header.

use http::StatusCode;
use serde::Serialize;
use std::collections::HashMap;

use crate::request::StandardRequest;
use crate::respond::write_response;
use crate::sink::ResponseWriter;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EchoResponse {
    pub method: String,
    pub url: String,
    pub host: String,
    pub query: Vec<(String, String)>,
    pub headers: HashMap<String, Vec<String>>,
    pub body: String,
    pub remote_addr: String,
    pub request_id: String,
    pub stage_variables: HashMap<String, String>,
}

impl From<&StandardRequest> for EchoResponse {
    fn from(request: &StandardRequest) -> Self {
        let mut headers: HashMap<String, Vec<String>> = HashMap::new();
        for (name, value) in &request.headers {
            if let Ok(value) = value.to_str() {
                headers
                    .entry(name.to_string())
                    .or_default()
                    .push(value.to_string());
            }
        }

        Self {
            method: request.method.to_string(),
            url: request.url.to_string(),
            host: request.host.clone(),
            query: request.url.query_pairs(),
            headers,
            body: String::from_utf8_lossy(&request.body).into_owned(),
            remote_addr: request.remote_addr.clone(),
            request_id: request.request_id.clone(),
            stage_variables: request.stage_variables.clone(),
        }
    }
}

pub fn echo(request: &StandardRequest, response: &mut dyn ResponseWriter) {
    for (key, value) in request.url.query_pairs() {
        if key == "cookie" {
            response.headers_mut().append("Set-Cookie", value);
        }
    }

    match serde_json::to_value(EchoResponse::from(request)) {
        Ok(body) => write_response(response, Some(body.into()), StatusCode::OK),
        Err(e) => write_response(
            response,
            Some(e.to_string().into()),
            StatusCode::INTERNAL_SERVER_ERROR,
        ),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::dispatch::serve;
    use crate::config::ShimConfig;
    use crate::models::{GatewayEvent, ProxyRequest};

    #[test]
    fn test_echo_reflects_request_and_cookies() {
        let event = GatewayEvent::V1(ProxyRequest {
            path: "/echo".to_string(),
            http_method: "PUT".to_string(),
            multi_value_query_string_parameters: Some(HashMap::from([(
                "cookie".to_string(),
                vec!["a=1".to_string(), "b=2".to_string()],
            )])),
            body: Some("hi".to_string()),
            ..ProxyRequest::default()
        });

        let response = serve(&event, &echo, &ShimConfig::default());
        assert_eq!(response.status_code, 200);
        assert_eq!(response.headers["set-cookie"], "a=1");
        assert_eq!(response.headers["SET-COOKIE"], "b=2");

        let body: serde_json::Value = serde_json::from_str(&response.body).unwrap();
        assert_eq!(body["method"], "PUT");
        assert_eq!(body["body"], "hi");
        assert_eq!(body["url"], "https://host/echo?cookie=a%3D1&cookie=b%3D2");
    }
}
