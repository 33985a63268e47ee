//! Error types for the gateway shim.
//!
//! Each stage of a dispatch has its own error so callers can tell a malformed
//! inbound event apart from a response that could not be delivered.

use thiserror::Error;

/// Errors produced by the header multiplicity codec.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    /// The value index is past the fixed modulus and would collide with a lower index.
    #[error("header value index {index} exceeds the supported maximum of {max}")]
    IndexOutOfRange { index: usize, max: usize },
    /// The header name has too few letters to carry the case pattern.
    #[error("header name `{name}` has {letters} letters, at least {required} are needed")]
    NameTooShort {
        name: String,
        letters: usize,
        required: usize,
    },
}

/// Errors raised while rebuilding a standard request from a gateway event.
#[derive(Debug, Error)]
pub enum TranslateError {
    #[error("invalid HTTP method `{method}`")]
    InvalidMethod { method: String },
    #[error("invalid request path `{path}`: must start with `/`")]
    InvalidPath { path: String },
    #[error("invalid request target `{target}`: {source}")]
    InvalidTarget {
        target: String,
        #[source]
        source: http::uri::InvalidUri,
    },
    #[error("request body is flagged base64 but does not decode: {0}")]
    InvalidBase64Body(#[from] base64::DecodeError),
}

/// Top level error for one dispatch.
#[derive(Debug, Error)]
pub enum ShimError {
    #[error("failed to translate gateway event: {0}")]
    Translate(#[from] TranslateError),
    #[error("too many values for header `{name}`: {source}")]
    TooManyHeaderValues {
        name: String,
        #[source]
        source: CodecError,
    },
    #[error("Response body too large: {size}")]
    BodyTooLarge { size: usize },
    #[error("event is not an API Gateway HTTP event")]
    UnsupportedEvent,
    #[error("malformed API Gateway event: {source}")]
    MalformedEvent {
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to serialize response: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("response body is not valid UTF-8: {0}")]
    InvalidUtf8Body(#[from] std::string::FromUtf8Error),
}
