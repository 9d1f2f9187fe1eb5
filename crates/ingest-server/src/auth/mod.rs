//! Authentication strategy framework.
//!
//! Authentication is polymorphic over a closed set of strategies selected
//! once at middleware construction time:
//!
//! - [`AuthStrategy::None`] — always authorizes (auth enabled with method
//!   "none").
//! - [`AuthStrategy::ApiKey`] — static key checked with a constant-time
//!   comparison.
//! - [`AuthStrategy::Jwt`] — bearer token with structural and claim checks.
//!
//! Every strategy reports all failure modes through [`AuthResult`]; the
//! `validate` entry point never panics and never returns a transport-level
//! error, so the middleware can map outcomes to HTTP statuses uniformly.

pub mod api_key;
pub mod factory;
pub mod jwt;
pub mod verify;

pub use api_key::ApiKeyStrategy;
pub use factory::{AuthGate, StrategyError, auth_middleware};
pub use jwt::JwtStrategy;
pub use verify::constant_time_eq;

use axum::http::HeaderMap;
use serde::{Deserialize, Serialize};

/// Closed set of authentication error codes.
///
/// Doubles as the wire error code and the HTTP status selector:
/// `ServerError` and `Misconfigured` map to 500, everything else to 401.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthErrorCode {
    MissingToken,
    InvalidToken,
    ExpiredToken,
    InvalidSignature,
    MissingApiKey,
    InvalidApiKey,
    ServerError,
    Misconfigured,
}

impl AuthErrorCode {
    /// Wire name of the error code.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::MissingToken => "missing_token",
            Self::InvalidToken => "invalid_token",
            Self::ExpiredToken => "expired_token",
            Self::InvalidSignature => "invalid_signature",
            Self::MissingApiKey => "missing_api_key",
            Self::InvalidApiKey => "invalid_api_key",
            Self::ServerError => "server_error",
            Self::Misconfigured => "misconfigured",
        }
    }

    /// HTTP status this code maps to.
    ///
    /// Operator-attributable failures surface as 500, client-attributable
    /// ones as 401.
    #[must_use]
    pub const fn status(&self) -> axum::http::StatusCode {
        match self {
            Self::ServerError | Self::Misconfigured => {
                axum::http::StatusCode::INTERNAL_SERVER_ERROR
            }
            _ => axum::http::StatusCode::UNAUTHORIZED,
        }
    }
}

impl std::fmt::Display for AuthErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An authentication failure: error code plus a client-safe message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthError {
    pub code: AuthErrorCode,
    pub message: String,
}

impl AuthError {
    #[must_use]
    pub fn new(code: AuthErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

/// The identity attached to a request after successful authentication.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    /// Subject identifier.
    pub id: String,
    /// Role names granted to this principal.
    pub roles: Vec<String>,
}

/// Outcome of one strategy validation, produced fresh per request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthResult {
    pub authorized: bool,
    pub principal: Option<Principal>,
    pub error: Option<AuthError>,
}

impl AuthResult {
    /// Authorized without a principal.
    #[must_use]
    pub const fn authorized_anonymous() -> Self {
        Self {
            authorized: true,
            principal: None,
            error: None,
        }
    }

    /// Authorized with an attached principal.
    #[must_use]
    pub fn authorized(principal: Principal) -> Self {
        Self {
            authorized: true,
            principal: Some(principal),
            error: None,
        }
    }

    /// Rejected with an error code and message.
    #[must_use]
    pub fn rejected(code: AuthErrorCode, message: impl Into<String>) -> Self {
        Self {
            authorized: false,
            principal: None,
            error: Some(AuthError::new(code, message)),
        }
    }
}

/// One concrete, swappable authentication strategy.
#[derive(Debug, Clone)]
pub enum AuthStrategy {
    /// Pass-through strategy for `method = none`.
    None,
    /// Static API key strategy.
    ApiKey(ApiKeyStrategy),
    /// JWT bearer token strategy.
    Jwt(JwtStrategy),
}

impl AuthStrategy {
    /// Validate an incoming request's headers.
    ///
    /// Infallible at the type level: every failure mode is reported through
    /// [`AuthResult::error`].
    #[must_use]
    pub fn validate(&self, headers: &HeaderMap) -> AuthResult {
        match self {
            Self::None => AuthResult::authorized_anonymous(),
            Self::ApiKey(strategy) => strategy.validate(headers),
            Self::Jwt(strategy) => strategy.validate(headers),
        }
    }

    /// Method name for logging and metadata.
    #[must_use]
    pub const fn method_name(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::ApiKey(_) => "apikey",
            Self::Jwt(_) => "jwt",
        }
    }
}
