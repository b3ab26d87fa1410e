//! Application configuration loaded from environment variables.
//!
//! Everything is read once at startup. The hardened/minimal deployment
//! variants of this service are expressed as configuration flags rather
//! than forked code paths.

use std::env;

/// Default session lifetime: 30 days (a 24-hour deployment sets
/// `SESSION_TTL_SECS=86400` instead).
const DEFAULT_SESSION_TTL_SECS: u64 = 30 * 24 * 60 * 60;

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    // --- OAuth (Google) ---
    /// Google OAuth client ID (public)
    pub google_client_id: String,
    /// Google OAuth client secret
    pub google_client_secret: String,
    /// Registered OAuth redirect URI
    pub google_redirect_uri: String,

    // --- Service ---
    /// Frontend origin for CORS and the post-login redirect
    pub frontend_url: String,
    /// Server port
    pub port: u16,
    /// Deployment environment ("production" toggles Secure cookies)
    pub environment: String,

    // --- Sessions ---
    /// HMAC key for session cookie and OAuth state signing (raw bytes)
    pub session_secret: Vec<u8>,
    /// Sliding session TTL in seconds
    pub session_ttl_secs: u64,

    // --- Hardening toggles ---
    /// Emit security headers on every response
    pub security_headers_enabled: bool,
    /// Apply the fixed-window rate limiter to /api routes
    pub rate_limit_enabled: bool,
    /// Require an authenticated session for the member roster endpoints
    pub roster_auth_required: bool,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        Ok(Self {
            google_client_id: env::var("GOOGLE_CLIENT_ID")
                .map_err(|_| ConfigError::Missing("GOOGLE_CLIENT_ID"))?,
            google_client_secret: env::var("GOOGLE_CLIENT_SECRET")
                .map(|v| v.trim().to_string())
                .map_err(|_| ConfigError::Missing("GOOGLE_CLIENT_SECRET"))?,
            google_redirect_uri: env::var("GOOGLE_REDIRECT_URI")
                .map_err(|_| ConfigError::Missing("GOOGLE_REDIRECT_URI"))?,
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:3000".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "5000".to_string())
                .parse()
                .unwrap_or(5000),
            environment: env::var("ENVIRONMENT")
                .unwrap_or_else(|_| "development".to_string()),
            session_secret: env::var("SESSION_SECRET")
                .map_err(|_| ConfigError::Missing("SESSION_SECRET"))?
                .into_bytes(),
            session_ttl_secs: env::var("SESSION_TTL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_SESSION_TTL_SECS),
            security_headers_enabled: env_flag("SECURITY_HEADERS_ENABLED", true),
            rate_limit_enabled: env_flag("RATE_LIMIT_ENABLED", true),
            roster_auth_required: env_flag("ROSTER_AUTH_REQUIRED", true),
        })
    }

    /// Whether this is a production deployment (affects cookie attributes
    /// and upstream-failure behavior).
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// Default config for testing only.
    pub fn test_default() -> Self {
        Self {
            google_client_id: "test-client-id.apps.googleusercontent.com".to_string(),
            google_client_secret: "test_client_secret".to_string(),
            google_redirect_uri: "http://localhost:5000/auth/callback".to_string(),
            frontend_url: "http://localhost:3000".to_string(),
            port: 5000,
            environment: "development".to_string(),
            session_secret: b"test_session_secret_32_bytes_min".to_vec(),
            session_ttl_secs: DEFAULT_SESSION_TTL_SECS,
            security_headers_enabled: true,
            rate_limit_enabled: false,
            roster_auth_required: true,
        }
    }
}

/// Parse a boolean env flag, accepting "true"/"false"/"1"/"0".
fn env_flag(name: &str, default: bool) -> bool {
    match env::var(name) {
        Ok(v) => matches!(v.trim(), "true" | "1" | "yes"),
        Err(_) => default,
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),
}
