//! Runtime settings for the shim, read from the function's environment.

use lambda_runtime::tracing::warn;

use crate::respond::MAX_BODY_BYTES;

const MAX_BODY_BYTES_VAR: &str = "APIGW_SHIM_MAX_BODY_BYTES";
const ENVIRONMENT_VAR: &str = "ENVIRONMENT";
const DEFAULT_ENVIRONMENT: &str = "dev";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShimConfig {
    /// Responses with a larger body are replaced by a `500`.
    pub max_body_bytes: usize,
    /// Deployment name attached to log output.
    pub environment: String,
}

impl Default for ShimConfig {
    fn default() -> Self {
        Self {
            max_body_bytes: MAX_BODY_BYTES,
            environment: DEFAULT_ENVIRONMENT.to_string(),
        }
    }
}

impl ShimConfig {
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the config from any variable source. Unset, empty or invalid
    /// values keep their defaults.
    #[must_use]
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(raw) = lookup(MAX_BODY_BYTES_VAR).filter(|v| !v.is_empty()) {
            match raw.parse::<usize>() {
                Ok(limit) => config.max_body_bytes = limit,
                Err(e) => warn!(
                    variable = MAX_BODY_BYTES_VAR,
                    value = %raw,
                    error = %e,
                    "Ignoring invalid body limit"
                ),
            }
        }

        if let Some(environment) = lookup(ENVIRONMENT_VAR).filter(|v| !v.is_empty()) {
            config.environment = environment;
        }

        config
    }
}
