// End-to-end dispatch tests: gateway event in, gateway response out
#![allow(clippy::unwrap_used, clippy::expect_used)]

use apigw_shim::respond::{BODY_TOO_LARGE, CORS_HEADERS};
use apigw_shim::{
    Dispatcher, GatewayEvent, GatewayResponse, Handler, ResponseWriter, ShimConfig,
    StandardRequest, serve,
};
use http::StatusCode;
use lambda_runtime::{Context, Diagnostic, LambdaEvent};
use mockall::mock;
use serde_json::{Value, json};

const PROXY_V1: &str = include_str!("fixtures/proxy_v1.json");
const HTTP_API_V2: &str = include_str!("fixtures/http_api_v2.json");

mock! {
    pub RequestHandler {}

    impl Handler for RequestHandler {
        fn handle(&self, request: &StandardRequest, response: &mut dyn ResponseWriter);
    }
}

fn ok_handler(_: &StandardRequest, response: &mut dyn ResponseWriter) {
    response.write_status(StatusCode::OK);
    response.write_body(br#"{"ok":true}"#).unwrap();
}

fn broken_event() -> GatewayEvent {
    let mut value: Value = serde_json::from_str(PROXY_V1).unwrap();
    value["path"] = Value::from("path/without/leading/slash");
    serde_json::from_value(value).unwrap()
}

fn create_test_lambda_event(payload: Value) -> LambdaEvent<Value> {
    LambdaEvent::new(payload, Context::default())
}

fn cors_headers(response: &GatewayResponse) -> Vec<(&str, &str)> {
    CORS_HEADERS
        .iter()
        .map(|(name, _)| {
            (
                *name,
                response.headers.get(*name).map_or("", String::as_str),
            )
        })
        .collect()
}

#[test]
fn test_handler_receives_translated_request() {
    let event: GatewayEvent = serde_json::from_str(PROXY_V1).unwrap();
    let mut handler = MockRequestHandler::new();
    handler
        .expect_handle()
        .withf(|request, _| {
            request.url.path() == "/path/to/resource" && request.stage_variable("baz") == Some("qux")
        })
        .times(1)
        .returning(|_, response| {
            response.write_status(StatusCode::CREATED);
        });

    let response = serve(&event, &handler, &ShimConfig::default());
    assert_eq!(response.status_code, 201);
}

#[test]
fn test_translation_failure_skips_handler() {
    let mut handler = MockRequestHandler::new();
    handler.expect_handle().never();

    let response = serve(&broken_event(), &handler, &ShimConfig::default());
    assert_eq!(response.status_code, 500);
    assert!(response.body.contains("path/without/leading/slash"));
}

#[test]
fn test_cors_headers_on_success_and_failure() {
    let event: GatewayEvent = serde_json::from_str(PROXY_V1).unwrap();
    let success = serve(&event, &ok_handler, &ShimConfig::default());
    let failure = serve(&broken_event(), &ok_handler, &ShimConfig::default());

    assert_eq!(success.status_code, 200);
    assert_eq!(success.body, r#"{"ok":true}"#);
    assert_eq!(failure.status_code, 500);

    let expected: Vec<(&str, &str)> = CORS_HEADERS.to_vec();
    assert_eq!(cors_headers(&success), expected);
    assert_eq!(cors_headers(&failure), expected);
}

#[test]
fn test_set_cookies_survive_flattening() {
    let handler = |_: &StandardRequest, response: &mut dyn ResponseWriter| {
        let headers = response.headers_mut();
        headers.append("Set-Cookie", "session=abc; HttpOnly");
        headers.append("Set-Cookie", "theme=dark");
        headers.append("Set-Cookie", "lang=en");
        headers.append("Vary", "Origin");
        headers.append("Vary", "Accept-Encoding");
    };
    let event: GatewayEvent = serde_json::from_str(HTTP_API_V2).unwrap();
    let response = serve(&event, &handler, &ShimConfig::default());

    let mut cookies: Vec<&str> = response
        .headers
        .iter()
        .filter(|(name, _)| name.eq_ignore_ascii_case("set-cookie"))
        .map(|(_, value)| value.as_str())
        .collect();
    cookies.sort_unstable();
    assert_eq!(cookies, ["lang=en", "session=abc; HttpOnly", "theme=dark"]);
    assert_eq!(response.headers["Vary"], "Origin,Accept-Encoding");
}

#[test]
fn test_oversized_body_is_rejected() {
    let handler = |_: &StandardRequest, response: &mut dyn ResponseWriter| {
        response.write_body(&vec![b'a'; 2048]).unwrap();
    };
    let config = ShimConfig {
        max_body_bytes: 1024,
        ..ShimConfig::default()
    };
    let event: GatewayEvent = serde_json::from_str(PROXY_V1).unwrap();
    let response = serve(&event, &handler, &config);

    assert_eq!(response.status_code, 500);
    assert_eq!(response.body, BODY_TOO_LARGE);
}

#[tokio::test]
async fn test_handle_event_round_trip() {
    let dispatcher = Dispatcher::new(ok_handler, ShimConfig::default());
    let payload: Value = serde_json::from_str(PROXY_V1).unwrap();

    let result = dispatcher.handle_event(create_test_lambda_event(payload)).unwrap();
    let response: GatewayResponse = serde_json::from_value(result).unwrap();
    assert_eq!(response.status_code, 200);
    assert_eq!(response.body, r#"{"ok":true}"#);
}

#[tokio::test]
async fn test_handle_event_rejects_non_gateway_events() {
    let dispatcher = Dispatcher::new(ok_handler, ShimConfig::default());
    let result = dispatcher.handle_event(create_test_lambda_event(json!({"Records": []})));

    let err = result.unwrap_err();
    assert_eq!(err.error_type, "UnsupportedEvent");
}

#[tokio::test]
async fn test_handle_event_uses_fallback() {
    let dispatcher = Dispatcher::new(ok_handler, ShimConfig::default()).with_fallback(
        |payload: Value| -> Result<Value, Diagnostic> {
            Ok(json!({ "fallback": payload["Records"].as_array().map_or(0, Vec::len) }))
        },
    );
    let result = dispatcher
        .handle_event(create_test_lambda_event(json!({"Records": [1, 2]})))
        .unwrap();
    assert_eq!(result, json!({"fallback": 2}));
}

#[tokio::test]
async fn test_malformed_gateway_event_gets_server_error() {
    let mut handler = MockRequestHandler::new();
    handler.expect_handle().never();
    let dispatcher = Dispatcher::new(handler, ShimConfig::default());

    let mut payload: Value = serde_json::from_str(PROXY_V1).unwrap();
    payload["isBase64Encoded"] = Value::Null;

    let result = dispatcher.handle_event(create_test_lambda_event(payload)).unwrap();
    let response: GatewayResponse = serde_json::from_value(result).unwrap();
    assert_eq!(response.status_code, 500);
    assert!(response.body.contains("malformed API Gateway event"));
    assert_eq!(cors_headers(&response), CORS_HEADERS.to_vec());
}

#[tokio::test]
async fn test_malformed_v2_event_skips_fallback() {
    let dispatcher = Dispatcher::new(ok_handler, ShimConfig::default())
        .with_fallback(|_: Value| -> Result<Value, Diagnostic> { Ok(json!("fallback")) });

    let mut payload: Value = serde_json::from_str(HTTP_API_V2).unwrap();
    payload["requestContext"]["stage"] = json!(42);

    let result = dispatcher.handle_event(create_test_lambda_event(payload)).unwrap();
    let response: GatewayResponse = serde_json::from_value(result).unwrap();
    assert_eq!(response.status_code, 500);
}
