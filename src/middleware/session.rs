// SPDX-License-Identifier: MIT

//! Session extraction from the signed session cookie.
//!
//! Every handler receives an explicit [`SessionContext`] instead of poking
//! at ambient request state: either a loaded session (valid cookie, live
//! store entry) or an anonymous one. Handlers that mutate session data save
//! it back through the store and await the write before responding.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use std::convert::Infallible;
use std::sync::Arc;

use crate::config::Config;
use crate::error::AppError;
use crate::models::{SessionData, SessionUser, TokenSet};
use crate::AppState;

/// Name of the session cookie.
pub const SESSION_COOKIE: &str = "calbridge_sid";

/// Per-request session state.
#[derive(Debug, Clone)]
pub struct SessionContext {
    /// Session id, present when the request carried a valid cookie whose
    /// entry is still live in the store.
    pub id: Option<String>,
    pub data: SessionData,
}

impl SessionContext {
    fn anonymous() -> Self {
        Self {
            id: None,
            data: SessionData::default(),
        }
    }

    /// The session's user, if the OAuth callback has completed.
    pub fn user(&self) -> Option<&SessionUser> {
        self.data.user.as_ref()
    }

    /// Tokens for the authenticated user, enforcing the invariant that a
    /// request is authenticated iff both `user` and `tokens` are present.
    ///
    /// Returns `Unauthorized` when there is no user and `TokenMissing` when
    /// the user exists but their tokens were cleared.
    pub fn require_tokens(&self) -> Result<&TokenSet, AppError> {
        let user = self.user().ok_or(AppError::Unauthorized)?;
        user.tokens.as_ref().ok_or(AppError::TokenMissing)
    }
}

impl FromRequestParts<Arc<AppState>> for SessionContext {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_headers(&parts.headers);

        let Some(cookie) = jar.get(SESSION_COOKIE) else {
            return Ok(Self::anonymous());
        };

        let Some(sid) = state.sessions.verify_cookie(cookie.value()) else {
            // Tampered or malformed cookie: treat as no session at all.
            return Ok(Self::anonymous());
        };

        match state.sessions.load(&sid).await {
            Ok(Some(data)) => Ok(Self {
                id: Some(sid),
                data,
            }),
            Ok(None) => Ok(Self::anonymous()),
            Err(e) => {
                tracing::error!(error = %e, "Session load failed, treating as anonymous");
                Ok(Self::anonymous())
            }
        }
    }
}

/// Build the session cookie handed to the client after login.
pub fn session_cookie(config: &Config, value: String) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, value))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(config.is_production())
        .max_age(time_duration_secs(config.session_ttl_secs as i64))
        .build()
}

/// Build the removal cookie sent on logout. Attributes must match the
/// creation attributes or browsers will keep the original cookie.
pub fn removal_cookie(config: &Config) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, ""))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(config.is_production())
        .max_age(time_duration_secs(0))
        .build()
}

fn time_duration_secs(secs: i64) -> time::Duration {
    time::Duration::seconds(secs)
}
