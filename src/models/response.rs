use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Response returned to API Gateway.
///
/// Headers hold a single string per exact key. Repeated `Set-Cookie` values
/// are carried under case-scrambled keys (see [`crate::codec`]).
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct GatewayResponse {
    pub status_code: u16,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    #[serde(default)]
    pub body: String,
}

/// Body accepted by [`crate::respond::respond`] and [`crate::respond::write_response`].
///
/// Only these three shapes can be turned into a response body.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseBody {
    Bytes(Vec<u8>),
    Text(String),
    Json(Value),
}

impl From<Value> for ResponseBody {
    fn from(value: Value) -> Self {
        Self::Json(value)
    }
}

impl From<String> for ResponseBody {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<&str> for ResponseBody {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<Vec<u8>> for ResponseBody {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Bytes(bytes)
    }
}
