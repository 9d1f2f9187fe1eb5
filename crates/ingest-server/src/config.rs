//! Server and authentication configuration from environment variables.

use std::env;

/// Default issuer expected in JWT `iss` claims.
pub const DEFAULT_ISSUER: &str = "content-automation-platform";

/// Default audience expected in JWT `aud` claims.
pub const DEFAULT_AUDIENCE: &str = "mcp-ingestion";

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Server port to listen on.
    pub port: u16,
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
    /// CORS allowed origins (comma-separated or "*" for all).
    pub cors_allowed_origins: String,
    /// Maximum number of events retained in the event queue backlog.
    pub max_events: usize,
}

impl ServerConfig {
    /// Load configuration from environment variables.
    ///
    /// All variables are optional:
    /// - `PORT`: Server port (default: 3001)
    /// - `LOG_LEVEL`: Logging level (default: "info")
    /// - `CORS_ALLOWED_ORIGINS`: Allowed CORS origins (default: "*")
    /// - `MAX_EVENTS`: Event queue backlog capacity (default: 100)
    pub fn from_env() -> Result<Self, ConfigError> {
        let port = parse_or_default("PORT", 3001)?;
        let log_level = env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
        let cors_allowed_origins =
            env::var("CORS_ALLOWED_ORIGINS").unwrap_or_else(|_| "*".to_string());
        let max_events = parse_or_default("MAX_EVENTS", 100)?;

        Ok(Self {
            port,
            log_level,
            cors_allowed_origins,
            max_events,
        })
    }

    /// Get the socket address for the server.
    pub fn socket_addr(&self) -> std::net::SocketAddr {
        std::net::SocketAddr::from(([0, 0, 0, 0], self.port))
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 3001,
            log_level: "info".to_string(),
            cors_allowed_origins: "*".to_string(),
            max_events: 100,
        }
    }
}

/// Authentication configuration, read once per middleware construction and
/// immutable afterwards.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// Whether authentication is enforced at all.
    pub enabled: bool,
    /// Requested method name; validated by the strategy factory, not here.
    pub method: String,
    /// Secret for the JWT strategy.
    pub jwt_secret: Option<String>,
    /// Static key for the API key strategy.
    pub api_key: Option<String>,
    /// Expected `iss` claim, when set.
    pub issuer: Option<String>,
    /// Expected `aud` claim, when set.
    pub audience: Option<String>,
}

impl AuthConfig {
    /// Load authentication configuration from environment variables.
    ///
    /// - `MCP_AUTH_ENABLED`: "true" to enforce auth (default: false)
    /// - `MCP_AUTH_METHOD`: one of none|jwt|apikey (default: "none")
    /// - `MCP_JWT_SECRET`: secret for the jwt method
    /// - `MCP_API_KEY`: key for the apikey method
    /// - `MCP_AUTH_ISSUER`: expected issuer (default: "content-automation-platform")
    /// - `MCP_AUTH_AUDIENCE`: expected audience (default: "mcp-ingestion")
    pub fn from_env() -> Self {
        let enabled = env::var("MCP_AUTH_ENABLED")
            .map(|v| v.eq_ignore_ascii_case("true"))
            .unwrap_or(false);
        let method = env::var("MCP_AUTH_METHOD").unwrap_or_else(|_| "none".to_string());

        Self {
            enabled,
            method,
            jwt_secret: env::var("MCP_JWT_SECRET").ok(),
            api_key: env::var("MCP_API_KEY").ok(),
            issuer: Some(
                env::var("MCP_AUTH_ISSUER").unwrap_or_else(|_| DEFAULT_ISSUER.to_string()),
            ),
            audience: Some(
                env::var("MCP_AUTH_AUDIENCE").unwrap_or_else(|_| DEFAULT_AUDIENCE.to_string()),
            ),
        }
    }

    /// Disabled-auth configuration, used as a baseline in tests.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            method: "none".to_string(),
            jwt_secret: None,
            api_key: None,
            issuer: None,
            audience: None,
        }
    }
}

fn parse_or_default<T: std::str::FromStr>(name: &str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw.parse().map_err(|_| ConfigError::InvalidValue {
            name: name.to_string(),
            reason: format!("could not parse {raw:?}"),
        }),
        Err(_) => Ok(default),
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Invalid environment variable value.
    #[error("invalid value for environment variable {name}: {reason}")]
    InvalidValue { name: String, reason: String },
}
