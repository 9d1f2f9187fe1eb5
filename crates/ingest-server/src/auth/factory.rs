//! Authentication middleware factory.
//!
//! [`AuthGate::new`] reads the configuration exactly once and resolves it into
//! one of three fixed behaviors, so per-request handling never constructs
//! strategies or re-reads the environment:
//!
//! - **Passthrough**: auth disabled, every request proceeds.
//! - **Broken**: strategy construction failed; every request receives the
//!   same 500 response. The failure is captured once and replayed
//!   consistently, keeping the service observably broken rather than
//!   intermittently failing.
//! - **Active**: the selected strategy validates each request.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::config::AuthConfig;
use crate::error::ErrorBody;

use super::{ApiKeyStrategy, AuthStrategy, JwtStrategy};

/// Strategy construction failure, captured at gate construction time.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StrategyError {
    /// The configured method name is not in the closed method set.
    #[error("invalid authentication method: {0}")]
    InvalidMethod(String),

    /// `method = jwt` without a secret.
    #[error("JWT authentication requires MCP_JWT_SECRET to be configured")]
    MissingJwtSecret,

    /// `method = apikey` without a key.
    #[error("API key authentication requires MCP_API_KEY to be configured")]
    MissingApiKey,
}

/// The resolved authentication behavior for this process.
#[derive(Debug)]
pub enum AuthGate {
    /// Auth disabled; all requests proceed untouched.
    Passthrough,
    /// Construction failed; all requests receive the same 500.
    Broken,
    /// A strategy validates every request.
    Active(AuthStrategy),
}

impl AuthGate {
    /// Resolve the gate from a configuration snapshot.
    ///
    /// Never fails: construction errors are logged once and degrade to
    /// [`AuthGate::Broken`].
    #[must_use]
    pub fn new(config: &AuthConfig) -> Self {
        tracing::info!(
            enabled = config.enabled,
            method = %config.method,
            issuer = config.issuer.as_deref().unwrap_or(""),
            audience = config.audience.as_deref().unwrap_or(""),
            has_jwt_secret = config.jwt_secret.is_some(),
            has_api_key = config.api_key.is_some(),
            "auth middleware configuration loaded"
        );

        if !config.enabled {
            tracing::info!("authentication disabled, using pass-through middleware");
            return Self::Passthrough;
        }

        match build_strategy(config) {
            Ok(strategy) => {
                tracing::info!(method = strategy.method_name(), "authentication enabled");
                Self::Active(strategy)
            }
            Err(error) => {
                tracing::error!(%error, "failed to create authentication strategy");
                Self::Broken
            }
        }
    }

    /// Resolve the gate from the process environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self::new(&AuthConfig::from_env())
    }
}

/// Construct the strategy for the configured method.
pub fn build_strategy(config: &AuthConfig) -> Result<AuthStrategy, StrategyError> {
    match config.method.to_lowercase().as_str() {
        "none" => Ok(AuthStrategy::None),
        "jwt" => {
            let secret = config
                .jwt_secret
                .as_deref()
                .filter(|s| !s.is_empty())
                .ok_or(StrategyError::MissingJwtSecret)?;
            Ok(AuthStrategy::Jwt(JwtStrategy::new(
                secret,
                config.issuer.clone(),
                config.audience.clone(),
            )))
        }
        "apikey" => {
            let key = config
                .api_key
                .as_deref()
                .filter(|k| !k.is_empty())
                .ok_or(StrategyError::MissingApiKey)?;
            Ok(AuthStrategy::ApiKey(ApiKeyStrategy::new(key)))
        }
        other => Err(StrategyError::InvalidMethod(other.to_string())),
    }
}

/// Request-intercepting middleware driven by the resolved [`AuthGate`].
///
/// Installed with `axum::middleware::from_fn_with_state`. On success the
/// [`Principal`] (if any) is attached to request extensions; on failure the
/// request short-circuits with `{error, message}` and the status selected by
/// the error code. This function itself has no failure path.
pub async fn auth_middleware(
    State(gate): State<Arc<AuthGate>>,
    mut request: Request,
    next: Next,
) -> Response {
    match gate.as_ref() {
        AuthGate::Passthrough => next.run(request).await,
        AuthGate::Broken => {
            tracing::error!("auth middleware: misconfigured");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorBody {
                    error: "server_error".to_string(),
                    message: "Authentication not properly configured".to_string(),
                }),
            )
                .into_response()
        }
        AuthGate::Active(strategy) => {
            let result = strategy.validate(request.headers());

            if result.authorized {
                if let Some(principal) = result.principal {
                    request.extensions_mut().insert(principal);
                }
                return next.run(request).await;
            }

            let status = result
                .error
                .as_ref()
                .map_or(StatusCode::INTERNAL_SERVER_ERROR, |e| e.code.status());
            let (code, message) = result.error.map_or_else(
                || ("server_error".to_string(), "Authentication failed".to_string()),
                |e| (e.code.as_str().to_string(), e.message),
            );
            tracing::warn!(error_code = %code, "auth middleware: validation failed");

            (status, Json(ErrorBody { error: code, message })).into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::AuthErrorCode;

    fn config(method: &str) -> AuthConfig {
        AuthConfig {
            enabled: true,
            method: method.to_string(),
            jwt_secret: None,
            api_key: None,
            issuer: None,
            audience: None,
        }
    }

    #[test]
    fn test_disabled_config_is_passthrough() {
        let gate = AuthGate::new(&AuthConfig::disabled());
        assert!(matches!(gate, AuthGate::Passthrough));
    }

    #[test]
    fn test_enabled_none_method_is_active() {
        let gate = AuthGate::new(&config("none"));
        assert!(matches!(gate, AuthGate::Active(AuthStrategy::None)));
    }

    #[test]
    fn test_method_name_is_case_insensitive() {
        let gate = AuthGate::new(&config("NONE"));
        assert!(matches!(gate, AuthGate::Active(AuthStrategy::None)));
    }

    #[test]
    fn test_jwt_without_secret_is_broken() {
        let gate = AuthGate::new(&config("jwt"));
        assert!(matches!(gate, AuthGate::Broken));
        assert_eq!(
            build_strategy(&config("jwt")).unwrap_err(),
            StrategyError::MissingJwtSecret
        );
    }

    #[test]
    fn test_apikey_without_key_is_broken() {
        assert_eq!(
            build_strategy(&config("apikey")).unwrap_err(),
            StrategyError::MissingApiKey
        );
    }

    #[test]
    fn test_unknown_method_is_broken() {
        let gate = AuthGate::new(&config("oauth"));
        assert!(matches!(gate, AuthGate::Broken));
        assert!(matches!(
            build_strategy(&config("oauth")).unwrap_err(),
            StrategyError::InvalidMethod(_)
        ));
    }

    #[test]
    fn test_configured_jwt_strategy_validates() {
        let mut cfg = config("jwt");
        cfg.jwt_secret = Some("S".to_string());
        let AuthGate::Active(strategy) = AuthGate::new(&cfg) else {
            panic!("expected active gate");
        };
        // No Authorization header: rejected with missing_token.
        let result = strategy.validate(&axum::http::HeaderMap::new());
        assert_eq!(result.error.unwrap().code, AuthErrorCode::MissingToken);
    }

    #[test]
    fn test_empty_secret_counts_as_missing() {
        let mut cfg = config("jwt");
        cfg.jwt_secret = Some(String::new());
        assert!(matches!(AuthGate::new(&cfg), AuthGate::Broken));
    }
}
