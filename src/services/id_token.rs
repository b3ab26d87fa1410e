// SPDX-License-Identifier: MIT

//! Google ID-token (identity assertion) verification.
//!
//! After the code exchange, Google hands back a signed ID token. Before any
//! identity lands in a session, the token must verify against this app's
//! client id: RS256 signature via Google's published JWKS, issuer and
//! audience checks, and expiry/issued-at windows with bounded clock skew.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use reqwest::header::CACHE_CONTROL;
use serde::Deserialize;
use tokio::sync::{Mutex, RwLock};

const DISCOVERY_URL: &str = "https://accounts.google.com/.well-known/openid-configuration";
const FALLBACK_JWKS_URL: &str = "https://www.googleapis.com/oauth2/v3/certs";
const HTTP_TIMEOUT: Duration = Duration::from_secs(5);
const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(300);
const CLOCK_SKEW_SECS: u64 = 60;

/// Identity extracted from a verified ID token.
#[derive(Debug, Clone)]
pub struct VerifiedIdentity {
    pub subject: String,
    pub email: String,
    pub name: Option<String>,
}

/// Verification failure categories.
#[derive(Debug, Clone)]
pub enum IdTokenError {
    /// The token is malformed, expired, or its claims do not match.
    Invalid(String),
    /// A transient infrastructure failure (JWKS fetch) occurred.
    Transient(String),
}

impl std::fmt::Display for IdTokenError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IdTokenError::Invalid(msg) => write!(f, "invalid ID token: {}", msg),
            IdTokenError::Transient(msg) => write!(f, "ID token verification unavailable: {}", msg),
        }
    }
}

impl From<IdTokenError> for crate::error::AppError {
    fn from(err: IdTokenError) -> Self {
        crate::error::AppError::OAuth(err.to_string())
    }
}

enum VerifierMode {
    /// Discover and cache Google's JWKS keys.
    Google,
    /// Fixed key and algorithm, for deterministic tests.
    StaticKey {
        kid: String,
        algorithm: Algorithm,
        decoding_key: Arc<DecodingKey>,
    },
}

struct KeyCache {
    keys_by_kid: HashMap<String, Arc<DecodingKey>>,
    expires_at: Instant,
}

struct DiscoveredJwksUri {
    uri: String,
    expires_at: Instant,
}

/// Verifier for Google-issued ID tokens.
pub struct IdTokenVerifier {
    http_client: reqwest::Client,
    expected_audience: String,
    mode: VerifierMode,
    jwks_uri_cache: RwLock<Option<DiscoveredJwksUri>>,
    key_cache: RwLock<Option<KeyCache>>,
    refresh_lock: Mutex<()>,
}

impl IdTokenVerifier {
    /// Production verifier bound to the configured OAuth client id.
    pub fn new(client_id: &str) -> anyhow::Result<Self> {
        let http_client = reqwest::Client::builder().timeout(HTTP_TIMEOUT).build()?;

        tracing::info!(audience = %client_id, "Initialized Google ID token verifier");

        Ok(Self {
            http_client,
            expected_audience: client_id.to_string(),
            mode: VerifierMode::Google,
            jwks_uri_cache: RwLock::new(None),
            key_cache: RwLock::new(None),
            refresh_lock: Mutex::new(()),
        })
    }

    /// Verifier with a fixed key, for deterministic local/integration tests.
    pub fn new_with_static_key(
        client_id: &str,
        kid: impl Into<String>,
        algorithm: Algorithm,
        decoding_key: DecodingKey,
    ) -> anyhow::Result<Self> {
        let kid = kid.into();
        if kid.trim().is_empty() {
            anyhow::bail!("static kid must not be empty");
        }

        let http_client = reqwest::Client::builder().timeout(HTTP_TIMEOUT).build()?;

        Ok(Self {
            http_client,
            expected_audience: client_id.to_string(),
            mode: VerifierMode::StaticKey {
                kid,
                algorithm,
                decoding_key: Arc::new(decoding_key),
            },
            jwks_uri_cache: RwLock::new(None),
            key_cache: RwLock::new(None),
            refresh_lock: Mutex::new(()),
        })
    }

    /// Verify an ID token and extract the user's identity.
    pub async fn verify(&self, id_token: &str) -> Result<VerifiedIdentity, IdTokenError> {
        let header = decode_header(id_token)
            .map_err(|e| IdTokenError::Invalid(format!("invalid JWT header: {e}")))?;

        let expected_alg = match &self.mode {
            VerifierMode::Google => Algorithm::RS256,
            VerifierMode::StaticKey { algorithm, .. } => *algorithm,
        };
        if header.alg != expected_alg {
            return Err(IdTokenError::Invalid(format!(
                "unexpected JWT alg: {:?}",
                header.alg
            )));
        }

        let kid = header
            .kid
            .ok_or_else(|| IdTokenError::Invalid("missing JWT kid".to_string()))?;
        let decoding_key = self.decoding_key_for_kid(&kid).await?;

        let mut validation = Validation::new(expected_alg);
        validation.set_required_spec_claims(&["exp", "iss", "aud", "sub"]);
        validation.set_issuer(&["https://accounts.google.com", "accounts.google.com"]);
        validation.set_audience(&[self.expected_audience.as_str()]);
        validation.leeway = CLOCK_SKEW_SECS;

        let token_data = decode::<IdTokenClaims>(id_token, decoding_key.as_ref(), &validation)
            .map_err(|e| IdTokenError::Invalid(format!("JWT validation failed: {e}")))?;
        let claims = token_data.claims;

        validate_iat(claims.iat)?;

        let email = claims
            .email
            .ok_or_else(|| IdTokenError::Invalid("missing email claim".to_string()))?;

        match claims.email_verified {
            Some(true) => {}
            Some(false) => {
                return Err(IdTokenError::Invalid(
                    "email_verified claim is false".to_string(),
                ));
            }
            None => {
                return Err(IdTokenError::Invalid(
                    "email_verified claim is missing".to_string(),
                ));
            }
        }

        tracing::debug!(email = %email, subject = %claims.sub, "ID token verified");

        Ok(VerifiedIdentity {
            subject: claims.sub,
            email,
            name: claims.name,
        })
    }

    async fn decoding_key_for_kid(&self, kid: &str) -> Result<Arc<DecodingKey>, IdTokenError> {
        if let VerifierMode::StaticKey {
            kid: static_kid,
            decoding_key,
            ..
        } = &self.mode
        {
            if kid == static_kid {
                return Ok(decoding_key.clone());
            }
            return Err(IdTokenError::Invalid(format!(
                "unknown JWT kid for static verifier: {kid}"
            )));
        }

        if let Some(key) = self.lookup_cached_key(kid).await {
            return Ok(key);
        }

        // Key rotation: retry once with a forced refresh before giving up.
        for force_refresh in [false, true] {
            self.refresh_keys(force_refresh).await?;
            if let Some(key) = self.lookup_cached_key(kid).await {
                return Ok(key);
            }
        }

        Err(IdTokenError::Invalid(format!(
            "JWT kid not found in JWKS after refresh: {kid}"
        )))
    }

    async fn lookup_cached_key(&self, kid: &str) -> Option<Arc<DecodingKey>> {
        let cache = self.key_cache.read().await;
        let now = Instant::now();
        cache
            .as_ref()
            .filter(|entry| entry.expires_at > now)
            .and_then(|entry| entry.keys_by_kid.get(kid))
            .cloned()
    }

    async fn refresh_keys(&self, force_refresh: bool) -> Result<(), IdTokenError> {
        let _guard = self.refresh_lock.lock().await;

        if !force_refresh {
            let cache = self.key_cache.read().await;
            if cache
                .as_ref()
                .is_some_and(|entry| entry.expires_at > Instant::now())
            {
                return Ok(());
            }
        }

        let jwks_uri = self.resolve_jwks_uri(force_refresh).await;
        tracing::debug!(jwks_uri = %jwks_uri, "Refreshing Google JWKS cache");

        let response = self
            .http_client
            .get(&jwks_uri)
            .send()
            .await
            .map_err(|e| IdTokenError::Transient(format!("JWKS request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(IdTokenError::Transient(format!(
                "JWKS request returned status {}",
                response.status()
            )));
        }

        let ttl = cache_ttl_from_headers(response.headers(), DEFAULT_CACHE_TTL);
        let jwks: Jwks = response
            .json()
            .await
            .map_err(|e| IdTokenError::Transient(format!("invalid JWKS JSON: {e}")))?;

        let mut keys_by_kid: HashMap<String, Arc<DecodingKey>> = HashMap::new();
        for jwk in jwks.keys {
            if jwk.kty != "RSA" || jwk.kid.trim().is_empty() {
                continue;
            }
            if jwk.alg.as_deref().is_some_and(|alg| alg != "RS256") {
                continue;
            }
            if jwk.use_.as_deref().is_some_and(|u| u != "sig") {
                continue;
            }

            match DecodingKey::from_rsa_components(&jwk.n, &jwk.e) {
                Ok(key) => {
                    keys_by_kid.insert(jwk.kid, Arc::new(key));
                }
                Err(e) => {
                    tracing::warn!(error = %e, kid = %jwk.kid, "Skipping invalid RSA JWKS key");
                }
            }
        }

        if keys_by_kid.is_empty() {
            return Err(IdTokenError::Transient(
                "JWKS response did not include any usable RSA keys".to_string(),
            ));
        }

        *self.key_cache.write().await = Some(KeyCache {
            keys_by_kid,
            expires_at: Instant::now() + ttl,
        });

        Ok(())
    }

    /// Resolve the JWKS URI from the OpenID discovery document, falling
    /// back to the cached or well-known URI when discovery is unavailable.
    async fn resolve_jwks_uri(&self, force_refresh: bool) -> String {
        if !force_refresh {
            let cache = self.jwks_uri_cache.read().await;
            if let Some(entry) = cache
                .as_ref()
                .filter(|entry| entry.expires_at > Instant::now())
            {
                return entry.uri.clone();
            }
        }

        let stale_uri = self
            .jwks_uri_cache
            .read()
            .await
            .as_ref()
            .map(|entry| entry.uri.clone());

        match self.http_client.get(DISCOVERY_URL).send().await {
            Ok(resp) if resp.status().is_success() => {
                let ttl = cache_ttl_from_headers(resp.headers(), DEFAULT_CACHE_TTL);
                match resp.json::<OpenIdConfig>().await {
                    Ok(discovery) => {
                        *self.jwks_uri_cache.write().await = Some(DiscoveredJwksUri {
                            uri: discovery.jwks_uri.clone(),
                            expires_at: Instant::now() + ttl,
                        });
                        discovery.jwks_uri
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "Invalid OIDC discovery document");
                        stale_uri.unwrap_or_else(|| FALLBACK_JWKS_URL.to_string())
                    }
                }
            }
            Ok(resp) => {
                tracing::warn!(status = %resp.status(), "OIDC discovery returned non-success");
                stale_uri.unwrap_or_else(|| FALLBACK_JWKS_URL.to_string())
            }
            Err(e) => {
                tracing::warn!(error = %e, "OIDC discovery request failed");
                stale_uri.unwrap_or_else(|| FALLBACK_JWKS_URL.to_string())
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct OpenIdConfig {
    jwks_uri: String,
}

#[derive(Debug, Deserialize)]
struct Jwks {
    keys: Vec<Jwk>,
}

#[derive(Debug, Deserialize)]
struct Jwk {
    kid: String,
    kty: String,
    alg: Option<String>,
    n: String,
    e: String,
    #[serde(rename = "use")]
    use_: Option<String>,
}

#[derive(Debug, Deserialize)]
struct IdTokenClaims {
    #[allow(dead_code)]
    iss: String,
    #[allow(dead_code)]
    aud: String,
    sub: String,
    #[allow(dead_code)]
    exp: usize,
    iat: Option<usize>,
    email: Option<String>,
    email_verified: Option<bool>,
    name: Option<String>,
}

fn validate_iat(iat: Option<usize>) -> Result<(), IdTokenError> {
    let now = now_unix_secs();

    let Some(iat) = iat else {
        return Err(IdTokenError::Invalid("missing iat claim".to_string()));
    };

    if iat as u64 > now + CLOCK_SKEW_SECS {
        return Err(IdTokenError::Invalid("iat claim is in the future".to_string()));
    }

    Ok(())
}

fn cache_ttl_from_headers(headers: &reqwest::header::HeaderMap, fallback: Duration) -> Duration {
    headers
        .get(CACHE_CONTROL)
        .and_then(|v| v.to_str().ok())
        .and_then(parse_cache_control_max_age)
        .map_or(fallback, Duration::from_secs)
}

fn parse_cache_control_max_age(value: &str) -> Option<u64> {
    for directive in value.split(',') {
        if let Some(raw) = directive.trim().strip_prefix("max-age=") {
            if let Ok(seconds) = raw.trim_matches('"').parse::<u64>() {
                return Some(seconds);
            }
        }
    }

    None
}

fn now_unix_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};
    use serde::Serialize;

    const TEST_SECRET: &[u8] = b"id-token-test-secret";
    const TEST_KID: &str = "test-kid";
    const TEST_CLIENT_ID: &str = "test-client-id.apps.googleusercontent.com";

    #[derive(Serialize)]
    struct TestClaims {
        iss: String,
        aud: String,
        sub: String,
        exp: usize,
        iat: usize,
        email: Option<String>,
        email_verified: Option<bool>,
        name: Option<String>,
    }

    fn test_claims() -> TestClaims {
        let now = now_unix_secs() as usize;
        TestClaims {
            iss: "https://accounts.google.com".to_string(),
            aud: TEST_CLIENT_ID.to_string(),
            sub: "1234567890".to_string(),
            exp: now + 3600,
            iat: now,
            email: Some("asha@example.com".to_string()),
            email_verified: Some(true),
            name: Some("Asha Patel".to_string()),
        }
    }

    fn encode_token(claims: &TestClaims) -> String {
        let mut header = Header::new(Algorithm::HS256);
        header.kid = Some(TEST_KID.to_string());
        encode(&header, claims, &EncodingKey::from_secret(TEST_SECRET)).unwrap()
    }

    fn static_verifier() -> IdTokenVerifier {
        IdTokenVerifier::new_with_static_key(
            TEST_CLIENT_ID,
            TEST_KID,
            Algorithm::HS256,
            DecodingKey::from_secret(TEST_SECRET),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn valid_token_yields_identity() {
        let identity = static_verifier()
            .verify(&encode_token(&test_claims()))
            .await
            .expect("token should verify");

        assert_eq!(identity.email, "asha@example.com");
        assert_eq!(identity.name.as_deref(), Some("Asha Patel"));
        assert_eq!(identity.subject, "1234567890");
    }

    #[tokio::test]
    async fn wrong_audience_rejected() {
        let mut claims = test_claims();
        claims.aud = "someone-else.apps.googleusercontent.com".to_string();

        let result = static_verifier().verify(&encode_token(&claims)).await;
        assert!(matches!(result, Err(IdTokenError::Invalid(_))));
    }

    #[tokio::test]
    async fn expired_token_rejected() {
        let mut claims = test_claims();
        claims.exp = (now_unix_secs() as usize).saturating_sub(7200);
        claims.iat = claims.exp.saturating_sub(3600);

        let result = static_verifier().verify(&encode_token(&claims)).await;
        assert!(matches!(result, Err(IdTokenError::Invalid(_))));
    }

    #[tokio::test]
    async fn unverified_email_rejected() {
        let mut claims = test_claims();
        claims.email_verified = Some(false);

        let result = static_verifier().verify(&encode_token(&claims)).await;
        assert!(matches!(result, Err(IdTokenError::Invalid(_))));
    }

    #[tokio::test]
    async fn missing_email_rejected() {
        let mut claims = test_claims();
        claims.email = None;

        let result = static_verifier().verify(&encode_token(&claims)).await;
        assert!(matches!(result, Err(IdTokenError::Invalid(_))));
    }

    #[tokio::test]
    async fn unknown_kid_rejected() {
        let claims = test_claims();
        let mut header = Header::new(Algorithm::HS256);
        header.kid = Some("other-kid".to_string());
        let token = encode(&header, &claims, &EncodingKey::from_secret(TEST_SECRET)).unwrap();

        let result = static_verifier().verify(&token).await;
        assert!(matches!(result, Err(IdTokenError::Invalid(_))));
    }

    #[test]
    fn parse_cache_control_max_age_valid() {
        assert_eq!(
            parse_cache_control_max_age("public, max-age=3600"),
            Some(3600)
        );
        assert_eq!(parse_cache_control_max_age("max-age=60"), Some(60));
        assert_eq!(parse_cache_control_max_age("max-age=\"120\""), Some(120));
    }

    #[test]
    fn parse_cache_control_max_age_invalid() {
        assert_eq!(parse_cache_control_max_age("public, immutable"), None);
        assert_eq!(parse_cache_control_max_age("max-age=abc"), None);
        assert_eq!(parse_cache_control_max_age(""), None);
    }

    #[test]
    fn iat_in_future_rejected() {
        let future = (now_unix_secs() + 3600) as usize;
        assert!(validate_iat(Some(future)).is_err());
        assert!(validate_iat(None).is_err());
        assert!(validate_iat(Some(now_unix_secs() as usize)).is_ok());
    }
}
