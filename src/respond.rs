//! Building gateway responses outside the captured-handler path.
//!
//! [`respond`] produces a complete [`GatewayResponse`] for either payload
//! format; [`write_response`] and [`write_error`] are for handler code that
//! wants to emit a typed body through any [`ResponseWriter`].

use http::StatusCode;
use lambda_runtime::tracing::{error, warn};
use std::collections::BTreeMap;
use std::error::Error;

use crate::models::{GatewayResponse, ResponseBody, ShimError};
use crate::sink::ResponseWriter;

/// Largest body Lambda accepts in a synchronous invocation response.
pub const MAX_BODY_BYTES: usize = 6 * 1000 * 1000;

/// Body substituted for one that exceeds the payload limit.
pub const BODY_TOO_LARGE: &str = "Response body too large";

/// Headers stamped on every response this crate returns to the gateway.
pub const CORS_HEADERS: [(&str, &str); 4] = [
    ("Access-Control-Allow-Origin", "*"),
    (
        "Access-Control-Allow-Methods",
        "DELETE,GET,HEAD,OPTIONS,PATCH,POST,PUT",
    ),
    (
        "Access-Control-Allow-Headers",
        "Content-Type,Authorization,X-Amz-Date,X-Api-Key,X-Amz-Security-Token",
    ),
    ("Content-Type", "application/json"),
];

/// Builds a response from an optional body, a status and an optional error.
///
/// - status `0` means `200`
/// - with an error, a `200` becomes `500` and a missing body becomes the error text
/// - a JSON `null` body is sent as an empty body
/// - a body that cannot be rendered as text is dropped and a `2xx` becomes `500`
///
/// CORS headers are always applied.
#[must_use]
pub fn respond(body: Option<&ResponseBody>, status: u16, err: Option<&dyn Error>) -> GatewayResponse {
    let mut response = GatewayResponse {
        status_code: if status == 0 { 200 } else { status },
        ..GatewayResponse::default()
    };

    if let Some(body) = body {
        match body_text(body) {
            Ok(text) => response.body = text,
            Err(e) => {
                error!(error = %e, "Failed to serialize response body");
                if (200..300).contains(&response.status_code) {
                    response.status_code = 500;
                }
            }
        }
    }

    if let Some(err) = err {
        error!(error = %err, status = response.status_code, "Responding with error");
        if response.status_code == 200 {
            response.status_code = 500;
        }
        if body.is_none() {
            response.body = err.to_string();
        }
    }

    apply_cors(&mut response.headers);
    response
}

/// Renders a body as the outbound string.
///
/// # Errors
///
/// Returns an error if a JSON value fails to serialize or raw bytes are not UTF-8.
pub fn body_text(body: &ResponseBody) -> Result<String, ShimError> {
    match body {
        ResponseBody::Text(text) => Ok(text.clone()),
        ResponseBody::Bytes(bytes) => Ok(String::from_utf8(bytes.clone())?),
        ResponseBody::Json(serde_json::Value::Null) => Ok(String::new()),
        ResponseBody::Json(value) => Ok(serde_json::to_string(value)?),
    }
}

/// Replaces CORS headers and `Content-Type` with the fixed set, whatever their casing.
pub fn apply_cors(headers: &mut BTreeMap<String, String>) {
    headers.retain(|name, _| {
        !CORS_HEADERS
            .iter()
            .any(|(cors, _)| cors.eq_ignore_ascii_case(name))
    });
    for (name, value) in CORS_HEADERS {
        headers.insert(name.to_string(), value.to_string());
    }
}

/// Swaps an over-limit body for [`BODY_TOO_LARGE`] with a `500`.
#[must_use]
pub fn enforce_body_limit(response: GatewayResponse, max_body_bytes: usize) -> GatewayResponse {
    let size = response.body.len();
    if size <= max_body_bytes {
        return response;
    }
    let err = ShimError::BodyTooLarge { size };
    respond(
        Some(&ResponseBody::Text(BODY_TOO_LARGE.to_string())),
        500,
        Some(&err),
    )
}

/// Writes a typed body and status through a [`ResponseWriter`].
///
/// Without a body only the status is written, with `Content-Type: plaintext`.
/// Bodies over [`MAX_BODY_BYTES`] are replaced by a `500` error response.
pub fn write_response<W>(rw: &mut W, body: Option<ResponseBody>, status: StatusCode)
where
    W: ResponseWriter + ?Sized,
{
    let Some(body) = body else {
        rw.headers_mut().set("Content-Type", "plaintext");
        rw.write_status(status);
        return;
    };

    let bytes = match body {
        ResponseBody::Bytes(bytes) => bytes,
        ResponseBody::Text(text) => text.into_bytes(),
        ResponseBody::Json(value) => match serde_json::to_vec(&value) {
            Ok(bytes) => bytes,
            Err(e) => {
                error!(error = %e, "Failed to marshal response body");
                write_error(rw, "Error marshalling response", StatusCode::INTERNAL_SERVER_ERROR);
                return;
            }
        },
    };

    if bytes.len() > MAX_BODY_BYTES {
        error!(size = bytes.len(), "Response body too large");
        write_error(rw, BODY_TOO_LARGE, StatusCode::INTERNAL_SERVER_ERROR);
        return;
    }

    rw.write_status(status);
    match rw.write_body(&bytes) {
        Ok(written) if written != bytes.len() => {
            warn!(
                written,
                expected = bytes.len(),
                "Unable to finish writing body"
            );
        }
        Ok(_) => {}
        Err(e) => error!(error = %e, "Failed to write response body"),
    }
}

/// Writes a plain-text error. Statuses below 400 are raised to 500.
pub fn write_error<W>(rw: &mut W, message: &str, status: StatusCode)
where
    W: ResponseWriter + ?Sized,
{
    let status = if status.as_u16() < 400 {
        StatusCode::INTERNAL_SERVER_ERROR
    } else {
        status
    };
    let headers = rw.headers_mut();
    headers.set("Content-Type", "text/plain; charset=utf-8");
    headers.set("X-Content-Type-Options", "nosniff");
    rw.write_status(status);
    if let Err(e) = rw.write_body(format!("{message}\n").as_bytes()) {
        error!(error = %e, "Failed to write error body");
    }
}
