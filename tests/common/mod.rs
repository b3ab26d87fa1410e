// SPDX-License-Identifier: MIT

//! Shared helpers for integration tests: app construction against mock
//! Google endpoints and session seeding.

use std::sync::Arc;
use std::time::Duration;

use calbridge::config::Config;
use calbridge::db::{InMemoryRoster, SessionStore};
use calbridge::middleware::rate_limit::RateLimiter;
use calbridge::models::{SessionData, SessionUser, TokenSet};
use calbridge::routes::create_router;
use calbridge::services::{GoogleClient, IdTokenVerifier};
use calbridge::AppState;
use jsonwebtoken::{Algorithm, DecodingKey};

/// Signing material for the static-key ID token verifier.
#[allow(dead_code)]
pub const ID_TOKEN_TEST_SECRET: &[u8] = b"integration-id-token-secret";
#[allow(dead_code)]
pub const ID_TOKEN_TEST_KID: &str = "integration-kid";

const AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const CALENDAR_URL: &str = "https://www.googleapis.com/calendar/v3";

/// Build app state with explicit Google endpoints (mock servers in tests).
#[allow(dead_code)]
pub fn test_state(config: Config, token_url: &str, calendar_url: &str) -> Arc<AppState> {
    let sessions = SessionStore::new_memory(&config.session_secret, config.session_ttl_secs);
    let roster = Arc::new(InMemoryRoster::with_seed_members());
    let google = GoogleClient::with_base_urls(&config, AUTH_URL, token_url, calendar_url)
        .expect("Google client");
    let id_verifier = Arc::new(
        IdTokenVerifier::new_with_static_key(
            &config.google_client_id,
            ID_TOKEN_TEST_KID,
            Algorithm::HS256,
            DecodingKey::from_secret(ID_TOKEN_TEST_SECRET),
        )
        .expect("ID token verifier"),
    );
    let rate_limiter = Arc::new(RateLimiter::new(2, Duration::from_secs(60)));

    Arc::new(AppState {
        config,
        sessions,
        roster,
        google,
        id_verifier,
        rate_limiter,
    })
}

/// Test app against the production Google endpoints (for tests that must
/// never reach the network anyway).
#[allow(dead_code)]
pub fn create_test_app() -> (axum::Router, Arc<AppState>) {
    let state = test_state(Config::test_default(), TOKEN_URL, CALENDAR_URL);
    (create_router(state.clone()), state)
}

/// Test app whose Google endpoints point at mock servers.
#[allow(dead_code)]
pub fn create_test_app_with_urls(token_url: &str, calendar_url: &str) -> (axum::Router, Arc<AppState>) {
    create_test_app_with_config(Config::test_default(), token_url, calendar_url)
}

/// Test app with a custom config and mock Google endpoints.
#[allow(dead_code)]
pub fn create_test_app_with_config(
    config: Config,
    token_url: &str,
    calendar_url: &str,
) -> (axum::Router, Arc<AppState>) {
    let state = test_state(config, token_url, calendar_url);
    (create_router(state.clone()), state)
}

/// Write session data into the store and return the Cookie header value a
/// browser holding that session would send.
#[allow(dead_code)]
pub async fn seed_session(state: &Arc<AppState>, data: SessionData) -> (String, String) {
    let sid = state.sessions.mint_id().expect("mint sid");
    state.sessions.save(&sid, &data).await.expect("save session");

    let cookie = format!(
        "{}={}",
        calbridge::middleware::session::SESSION_COOKIE,
        state.sessions.cookie_value(&sid).expect("sign cookie")
    );
    (sid, cookie)
}

/// Session data for a fully authenticated user.
#[allow(dead_code)]
pub fn authed_user() -> SessionData {
    SessionData {
        user: Some(SessionUser {
            email: "asha.patel@example.com".to_string(),
            name: Some("Asha Patel".to_string()),
            tokens: Some(TokenSet {
                access_token: "ya29.integration-test".to_string(),
                refresh_token: Some("1//refresh-integration".to_string()),
                expiry: None,
            }),
        }),
    }
}

/// Session data for a user whose tokens were cleared.
#[allow(dead_code)]
pub fn tokenless_user() -> SessionData {
    SessionData {
        user: Some(SessionUser {
            email: "asha.patel@example.com".to_string(),
            name: Some("Asha Patel".to_string()),
            tokens: None,
        }),
    }
}
