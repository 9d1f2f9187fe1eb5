//! Static API key authentication strategy.

use axum::http::HeaderMap;

use super::verify::constant_time_eq;
use super::{AuthErrorCode, AuthResult, Principal};

/// Authenticates requests against one statically configured API key.
///
/// The key may be presented in the `x-api-key` header (preferred) or as
/// `Authorization: ApiKey <key>`. Header name lookup is case-insensitive.
#[derive(Debug, Clone)]
pub struct ApiKeyStrategy {
    api_key: String,
}

impl ApiKeyStrategy {
    /// Create a strategy for the given configured key.
    #[must_use]
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
        }
    }

    /// Validate the request headers against the configured key.
    #[must_use]
    pub fn validate(&self, headers: &HeaderMap) -> AuthResult {
        let Some(provided) = extract_api_key(headers) else {
            tracing::debug!("api key auth: missing API key header");
            return AuthResult::rejected(
                AuthErrorCode::MissingApiKey,
                "Missing API key. Provide via x-api-key header or Authorization: ApiKey <key>",
            );
        };

        if self.api_key.is_empty() {
            tracing::error!("api key auth: API key not configured");
            return AuthResult::rejected(
                AuthErrorCode::Misconfigured,
                "API key authentication not properly configured",
            );
        }

        if !constant_time_eq(&provided, &self.api_key) {
            tracing::warn!("api key auth: invalid API key provided");
            return AuthResult::rejected(AuthErrorCode::InvalidApiKey, "Invalid API key");
        }

        tracing::debug!("api key auth: key validated successfully");
        AuthResult::authorized(Principal {
            id: "api-key-user".to_string(),
            roles: vec!["api-user".to_string()],
        })
    }
}

/// Extract a candidate API key from the request headers.
///
/// Priority: `x-api-key`, then `Authorization: ApiKey <key>`.
fn extract_api_key(headers: &HeaderMap) -> Option<String> {
    if let Some(value) = headers.get("x-api-key").and_then(|v| v.to_str().ok()) {
        if !value.is_empty() {
            return Some(value.to_string());
        }
    }

    let auth = headers.get("authorization")?.to_str().ok()?;
    let key = auth.strip_prefix("ApiKey ")?.trim();
    if key.is_empty() {
        None
    } else {
        Some(key.to_string())
    }
}
