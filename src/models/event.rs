//! API Gateway proxy event shapes.
//!
//! Gateway delivers two incompatible envelopes: the REST API proxy event
//! (payload format 1.0) and the HTTP API event (payload format 2.0). Both are
//! wrapped in [`GatewayEvent`] so the rest of the crate dispatches on one tag.

use schemars::JsonSchema;
use serde::{Deserialize, Deserializer, Serialize, de};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::LazyLock;

/// Payload format of an inbound event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
    V1,
    V2,
}

/// REST API proxy event (payload format 1.0).
#[derive(Deserialize, Serialize, Debug, Clone, Default, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProxyRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource: Option<String>,
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub http_method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headers: Option<HashMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub multi_value_headers: Option<HashMap<String, Vec<String>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query_string_parameters: Option<HashMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub multi_value_query_string_parameters: Option<HashMap<String, Vec<String>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path_parameters: Option<HashMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stage_variables: Option<HashMap<String, String>>,
    #[serde(default)]
    pub request_context: ProxyRequestContext,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(default)]
    pub is_base64_encoded: bool,
}

#[derive(Deserialize, Serialize, Debug, Clone, Default, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProxyRequestContext {
    #[serde(default)]
    pub stage: String,
    #[serde(default)]
    pub request_id: String,
    #[serde(default)]
    pub identity: ProxyIdentity,
}

#[derive(Deserialize, Serialize, Debug, Clone, Default, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProxyIdentity {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_ip: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
}

/// HTTP API event (payload format 2.0).
#[derive(Deserialize, Serialize, Debug, Clone, Default, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct HttpApiRequest {
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub route_key: Option<String>,
    #[serde(default)]
    pub raw_path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_query_string: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cookies: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headers: Option<HashMap<String, String>>,
    /// Repeated keys arrive comma-joined into one value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query_string_parameters: Option<HashMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path_parameters: Option<HashMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stage_variables: Option<HashMap<String, String>>,
    #[serde(default)]
    pub request_context: HttpApiRequestContext,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(default)]
    pub is_base64_encoded: bool,
}

#[derive(Deserialize, Serialize, Debug, Clone, Default, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct HttpApiRequestContext {
    #[serde(default)]
    pub stage: String,
    #[serde(default)]
    pub request_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain_name: Option<String>,
    #[serde(default)]
    pub http: HttpDescription,
}

#[derive(Deserialize, Serialize, Debug, Clone, Default, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct HttpDescription {
    #[serde(default)]
    pub method: String,
    #[serde(default)]
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protocol: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_ip: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
}

/// An inbound gateway event of either payload format.
#[derive(Serialize, Debug, Clone, JsonSchema)]
#[serde(untagged)]
pub enum GatewayEvent {
    V1(ProxyRequest),
    V2(HttpApiRequest),
}

impl<'de> Deserialize<'de> for GatewayEvent {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        Self::from_payload(&value).map_err(de::Error::custom)
    }
}

fn is_v2_payload(payload: &Value) -> bool {
    payload
        .get("version")
        .and_then(Value::as_str)
        .is_some_and(|v| v.starts_with('2'))
}

static EMPTY: LazyLock<HashMap<String, String>> = LazyLock::new(HashMap::new);

impl GatewayEvent {
    /// Parses a raw Lambda payload, picking the format from `version`.
    ///
    /// # Errors
    ///
    /// Returns the `serde_json` error when a field has the wrong type.
    pub fn from_payload(payload: &Value) -> Result<Self, serde_json::Error> {
        if is_v2_payload(payload) {
            HttpApiRequest::deserialize(payload).map(Self::V2)
        } else {
            ProxyRequest::deserialize(payload).map(Self::V1)
        }
    }

    /// Whether a raw payload has the shape of a gateway HTTP event.
    ///
    /// Checked before parsing, so an event with a malformed field is still
    /// recognised as coming from the gateway.
    #[must_use]
    pub fn is_gateway_payload(payload: &Value) -> bool {
        let Some(fields) = payload.as_object() else {
            return false;
        };
        if is_v2_payload(payload) {
            fields.contains_key("rawPath") || payload.pointer("/requestContext/http").is_some()
        } else {
            fields.contains_key("path") || fields.contains_key("httpMethod")
        }
    }

    #[must_use]
    pub const fn protocol(&self) -> Protocol {
        match self {
            Self::V1(_) => Protocol::V1,
            Self::V2(_) => Protocol::V2,
        }
    }

    #[must_use]
    pub fn method(&self) -> &str {
        match self {
            Self::V1(req) => &req.http_method,
            Self::V2(req) => &req.request_context.http.method,
        }
    }

    #[must_use]
    pub fn path(&self) -> &str {
        match self {
            Self::V1(req) => &req.path,
            Self::V2(req) => &req.raw_path,
        }
    }

    #[must_use]
    pub fn headers(&self) -> &HashMap<String, String> {
        let headers = match self {
            Self::V1(req) => req.headers.as_ref(),
            Self::V2(req) => req.headers.as_ref(),
        };
        headers.unwrap_or(&*EMPTY)
    }

    #[must_use]
    pub fn stage_variables(&self) -> &HashMap<String, String> {
        let vars = match self {
            Self::V1(req) => req.stage_variables.as_ref(),
            Self::V2(req) => req.stage_variables.as_ref(),
        };
        vars.unwrap_or(&*EMPTY)
    }

    #[must_use]
    pub fn stage(&self) -> &str {
        match self {
            Self::V1(req) => &req.request_context.stage,
            Self::V2(req) => &req.request_context.stage,
        }
    }

    #[must_use]
    pub fn request_id(&self) -> &str {
        match self {
            Self::V1(req) => &req.request_context.request_id,
            Self::V2(req) => &req.request_context.request_id,
        }
    }

    /// Caller address. v1 keeps it on the identity object, v2 on the http description.
    #[must_use]
    pub fn source_ip(&self) -> Option<&str> {
        match self {
            Self::V1(req) => req.request_context.identity.source_ip.as_deref(),
            Self::V2(req) => req.request_context.http.source_ip.as_deref(),
        }
    }

    #[must_use]
    pub fn body(&self) -> Option<&str> {
        match self {
            Self::V1(req) => req.body.as_deref(),
            Self::V2(req) => req.body.as_deref(),
        }
    }

    #[must_use]
    pub const fn is_base64_encoded(&self) -> bool {
        match self {
            Self::V1(req) => req.is_base64_encoded,
            Self::V2(req) => req.is_base64_encoded,
        }
    }
}
