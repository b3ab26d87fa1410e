// SPDX-License-Identifier: MIT

//! Google OAuth authentication routes.

use axum::{
    extract::{Query, State},
    response::Redirect,
    routing::{get, post},
    Json, Router,
};
use axum_extra::extract::cookie::CookieJar;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::{AppError, Result};
use crate::middleware::session::{removal_cookie, session_cookie, SessionContext};
use crate::models::{SessionUser, TokenSet};
use crate::AppState;

// Type alias for HMAC-SHA256
type HmacSha256 = Hmac<Sha256>;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/google", get(auth_start))
        .route("/auth/callback", get(auth_callback))
        .route("/logout", post(logout))
}

/// Start OAuth flow - redirect to Google's consent screen.
///
/// No session state is created here; the signed `state` parameter is the
/// only thing tying the eventual callback to this service.
async fn auth_start(State(state): State<Arc<AppState>>) -> Result<Redirect> {
    let oauth_state = create_oauth_state(&state.config.session_secret)?;
    let url = state.google.consent_url(&oauth_state);

    tracing::info!(
        client_id = %state.config.google_client_id,
        "Starting OAuth flow, redirecting to Google"
    );

    Ok(Redirect::temporary(&url))
}

#[derive(Deserialize)]
pub struct CallbackParams {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    state: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// OAuth callback - exchange the one-time code, verify the identity
/// assertion, and persist the session before redirecting to the frontend.
async fn auth_callback(
    State(state): State<Arc<AppState>>,
    ctx: SessionContext,
    jar: CookieJar,
    Query(params): Query<CallbackParams>,
) -> Result<(CookieJar, Redirect)> {
    if let Some(error) = params.error {
        tracing::warn!(error = %error, "OAuth error from Google");
        return Err(AppError::OAuth(format!(
            "Provider returned error: {}",
            error
        )));
    }

    // Invalid state means the redirect did not originate from our consent
    // URL. Tolerated with a warning: bare callbacks predate state signing.
    match &params.state {
        Some(s) if verify_oauth_state(s, &state.config.session_secret) => {}
        _ => tracing::warn!("Missing or invalid OAuth state parameter"),
    }

    let code = params
        .code
        .ok_or_else(|| AppError::OAuth("Missing authorization code".to_string()))?;

    tracing::info!("Exchanging authorization code for tokens");
    let token_response = state.google.exchange_code(&code).await?;

    let id_token = token_response
        .id_token
        .as_deref()
        .ok_or_else(|| AppError::OAuth("Token response missing id_token".to_string()))?;
    let identity = state.id_verifier.verify(id_token).await?;

    tracing::info!(email = %identity.email, "User authenticated");

    let expiry = token_response
        .expires_in
        .map(|secs| chrono::Utc::now() + chrono::Duration::seconds(secs));

    let mut data = ctx.data;
    data.user = Some(SessionUser {
        email: identity.email,
        name: identity.name,
        tokens: Some(TokenSet {
            access_token: token_response.access_token,
            refresh_token: token_response.refresh_token,
            expiry,
        }),
    });

    // Reuse the presented session id if it was valid; otherwise mint one.
    let sid = match ctx.id {
        Some(sid) => sid,
        None => state.sessions.mint_id()?,
    };

    // The write must complete before the redirect leaves, or the frontend
    // could race ahead to /api/me and find an empty session.
    state.sessions.save(&sid, &data).await?;

    let cookie = session_cookie(&state.config, state.sessions.cookie_value(&sid)?);

    Ok((
        jar.add(cookie),
        Redirect::temporary(&state.config.frontend_url),
    ))
}

#[derive(Serialize)]
pub struct LogoutResponse {
    pub success: bool,
}

/// Destroy the session and expire the cookie. Idempotent: logging out an
/// already-anonymous browser still succeeds.
async fn logout(
    State(state): State<Arc<AppState>>,
    ctx: SessionContext,
    jar: CookieJar,
) -> Result<(CookieJar, Json<LogoutResponse>)> {
    if let Some(sid) = &ctx.id {
        state.sessions.destroy(sid).await?;
        tracing::info!("Session destroyed");
    }

    Ok((
        jar.add(removal_cookie(&state.config)),
        Json(LogoutResponse { success: true }),
    ))
}

/// Create a signed OAuth state parameter: `timestamp_hex|signature_hex`,
/// base64url-encoded for the query string.
fn create_oauth_state(secret: &[u8]) -> Result<String> {
    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("System time error: {}", e)))?
        .as_millis();

    let payload = format!("{:x}", timestamp);

    let mut mac = HmacSha256::new_from_slice(secret)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("HMAC init failed: {}", e)))?;
    mac.update(payload.as_bytes());
    let signature = hex::encode(mac.finalize().into_bytes());

    Ok(URL_SAFE_NO_PAD.encode(format!("{}|{}", payload, signature).as_bytes()))
}

/// Verify the HMAC signature on an OAuth state parameter.
fn verify_oauth_state(state: &str, secret: &[u8]) -> bool {
    let Ok(bytes) = URL_SAFE_NO_PAD.decode(state) else {
        return false;
    };
    let Ok(state_str) = String::from_utf8(bytes) else {
        return false;
    };

    let Some((payload, signature_hex)) = state_str.split_once('|') else {
        return false;
    };

    let Ok(mut mac) = HmacSha256::new_from_slice(secret) else {
        return false;
    };
    mac.update(payload.as_bytes());
    let expected = hex::encode(mac.finalize().into_bytes());

    if signature_hex != expected {
        tracing::error!("OAuth state signature mismatch");
        return false;
    }

    true
}
