//! JWT bearer token authentication strategy.
//!
//! # Security note: no signature verification
//!
//! This strategy validates token *structure and claims* only. It does **not**
//! verify the cryptographic signature against the configured secret — the
//! third token segment is never checked. This reproduces the observed
//! baseline behavior of the service it is compatible with and is a known,
//! deliberate gap, not an oversight: any caller able to mint a well-formed
//! token with acceptable claims will be authorized. Do not rely on this
//! strategy as a trust boundary until signature verification is added.

use axum::http::HeaderMap;
use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::Deserialize;

use super::{AuthErrorCode, AuthResult, Principal};

/// Authenticates requests carrying an `Authorization: Bearer <token>` header.
#[derive(Debug, Clone)]
pub struct JwtStrategy {
    secret: String,
    issuer: Option<String>,
    audience: Option<String>,
}

/// Claims extracted from the token payload. Unknown claims are ignored.
#[derive(Debug, Deserialize)]
struct Claims {
    #[serde(default)]
    sub: Option<String>,
    #[serde(default)]
    user_id: Option<String>,
    #[serde(default)]
    exp: Option<i64>,
    #[serde(default)]
    iss: Option<String>,
    #[serde(default)]
    aud: Option<String>,
    #[serde(default)]
    roles: Option<Vec<String>>,
    #[serde(default)]
    scope: Option<String>,
}

impl JwtStrategy {
    /// Create a strategy with the given secret and optional issuer/audience
    /// restrictions.
    #[must_use]
    pub fn new(
        secret: impl Into<String>,
        issuer: Option<String>,
        audience: Option<String>,
    ) -> Self {
        Self {
            secret: secret.into(),
            issuer,
            audience,
        }
    }

    /// Validate the request headers.
    #[must_use]
    pub fn validate(&self, headers: &HeaderMap) -> AuthResult {
        let auth = headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();

        let Some(token) = auth.strip_prefix("Bearer ") else {
            tracing::debug!("jwt auth: missing or invalid Authorization header");
            return AuthResult::rejected(
                AuthErrorCode::MissingToken,
                "Missing or invalid Bearer token",
            );
        };

        let token = token.trim();
        if token.is_empty() {
            tracing::debug!("jwt auth: empty token");
            return AuthResult::rejected(AuthErrorCode::MissingToken, "Empty Bearer token");
        }

        if self.secret.is_empty() {
            tracing::error!("jwt auth: secret not configured");
            return AuthResult::rejected(
                AuthErrorCode::Misconfigured,
                "JWT authentication not properly configured",
            );
        }

        match self.check_token(token) {
            Ok(principal) => {
                tracing::debug!(subject = %principal.id, "jwt auth: token validated successfully");
                AuthResult::authorized(principal)
            }
            Err((code, message)) => {
                tracing::warn!(code = %code, "jwt auth: token validation failed");
                AuthResult::rejected(code, message)
            }
        }
    }

    /// Structural and claim checks. Signature is intentionally not verified
    /// (see module docs).
    fn check_token(&self, token: &str) -> Result<Principal, (AuthErrorCode, &'static str)> {
        let parts: Vec<&str> = token.split('.').collect();
        if parts.len() != 3 {
            return Err((AuthErrorCode::InvalidToken, "Invalid JWT format"));
        }

        let payload = URL_SAFE_NO_PAD
            .decode(parts[1])
            .map_err(|_| (AuthErrorCode::InvalidToken, "Token parsing failed"))?;
        let claims: Claims = serde_json::from_slice(&payload)
            .map_err(|_| (AuthErrorCode::InvalidToken, "Token parsing failed"))?;

        if let Some(exp) = claims.exp {
            if chrono::Utc::now().timestamp() >= exp {
                return Err((AuthErrorCode::ExpiredToken, "Token expired"));
            }
        }

        if let Some(issuer) = &self.issuer {
            if claims.iss.as_deref() != Some(issuer.as_str()) {
                return Err((AuthErrorCode::InvalidToken, "Invalid token issuer"));
            }
        }

        if let Some(audience) = &self.audience {
            if claims.aud.as_deref() != Some(audience.as_str()) {
                return Err((AuthErrorCode::InvalidToken, "Invalid token audience"));
            }
        }

        let id = claims
            .sub
            .or(claims.user_id)
            .unwrap_or_else(|| "unknown".to_string());
        let roles = claims.roles.unwrap_or_else(|| {
            claims
                .scope
                .map(|s| s.split(' ').map(str::to_string).collect())
                .unwrap_or_default()
        });

        Ok(Principal { id, roles })
    }
}
