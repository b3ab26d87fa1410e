// SPDX-License-Identifier: MIT

//! Google OAuth and Calendar API client.
//!
//! Handles:
//! - Consent URL construction (offline access, forced re-consent)
//! - Authorization-code exchange
//! - Single-page availability queries against a member's calendar
//! - Auth-expiry detection (401 / invalid_grant) for the token lifecycle

use serde::Deserialize;
use std::time::Duration;

use crate::config::Config;
use crate::error::AppError;
use crate::models::CalendarEvent;

const AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const CALENDAR_BASE_URL: &str = "https://www.googleapis.com/calendar/v3";

/// Outbound calls carry a bounded timeout so a stalled upstream cannot pin
/// request handlers indefinitely.
const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Availability queries are a single bounded page.
const MAX_RESULTS: u32 = 100;

/// Scopes requested at consent: read-only calendar plus the user's email.
pub const OAUTH_SCOPES: [&str; 2] = [
    "https://www.googleapis.com/auth/calendar.readonly",
    "https://www.googleapis.com/auth/userinfo.email",
];

/// Google API client.
#[derive(Clone)]
pub struct GoogleClient {
    http: reqwest::Client,
    auth_url: String,
    token_url: String,
    calendar_base_url: String,
    client_id: String,
    client_secret: String,
    redirect_uri: String,
}

/// Time window for one availability query, passed through verbatim.
#[derive(Debug, Clone, Default)]
pub struct EventsQuery {
    pub time_min: Option<String>,
    pub time_max: Option<String>,
    pub time_zone: Option<String>,
}

impl GoogleClient {
    /// Create a client against the production Google endpoints.
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        Self::with_base_urls(config, AUTH_URL, TOKEN_URL, CALENDAR_BASE_URL)
    }

    /// Create a client against explicit endpoints (tests and local mocks).
    pub fn with_base_urls(
        config: &Config,
        auth_url: &str,
        token_url: &str,
        calendar_base_url: &str,
    ) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder().timeout(HTTP_TIMEOUT).build()?;

        Ok(Self {
            http,
            auth_url: auth_url.to_string(),
            token_url: token_url.to_string(),
            calendar_base_url: calendar_base_url.trim_end_matches('/').to_string(),
            client_id: config.google_client_id.clone(),
            client_secret: config.google_client_secret.clone(),
            redirect_uri: config.google_redirect_uri.clone(),
        })
    }

    /// Consent-screen URL for the authorization-code flow.
    ///
    /// `access_type=offline` plus `prompt=consent` forces Google to issue a
    /// refresh token even on repeat logins.
    pub fn consent_url(&self, state: &str) -> String {
        format!(
            "{}?client_id={}&redirect_uri={}&response_type=code&scope={}&access_type=offline&prompt=consent&state={}",
            self.auth_url,
            urlencoding::encode(&self.client_id),
            urlencoding::encode(&self.redirect_uri),
            urlencoding::encode(&OAUTH_SCOPES.join(" ")),
            urlencoding::encode(state),
        )
    }

    /// Exchange a one-time authorization code for tokens.
    pub async fn exchange_code(&self, code: &str) -> Result<TokenExchangeResponse, AppError> {
        let response = self
            .http
            .post(&self.token_url)
            .form(&[
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("code", code),
                ("grant_type", "authorization_code"),
                ("redirect_uri", self.redirect_uri.as_str()),
            ])
            .send()
            .await
            .map_err(|e| AppError::OAuth(format!("Token exchange request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "Google token exchange failed");
            return Err(AppError::OAuth(format!(
                "Token exchange failed with status {}",
                status
            )));
        }

        response
            .json()
            .await
            .map_err(|e| AppError::OAuth(format!("Token exchange JSON parse error: {}", e)))
    }

    /// Fetch one page of events from a member's calendar, ordered by start
    /// time with recurring events expanded to single occurrences.
    pub async fn list_events(
        &self,
        access_token: &str,
        calendar_id: &str,
        query: &EventsQuery,
    ) -> Result<Vec<CalendarEvent>, AppError> {
        let url = format!(
            "{}/calendars/{}/events",
            self.calendar_base_url,
            urlencoding::encode(calendar_id)
        );

        let mut params: Vec<(&str, String)> = vec![
            ("maxResults", MAX_RESULTS.to_string()),
            ("singleEvents", "true".to_string()),
            ("orderBy", "startTime".to_string()),
        ];
        if let Some(start) = &query.time_min {
            params.push(("timeMin", start.clone()));
        }
        if let Some(end) = &query.time_max {
            params.push(("timeMax", end.clone()));
        }
        if let Some(tz) = &query.time_zone {
            params.push(("timeZone", tz.clone()));
        }

        let response = self
            .http
            .get(&url)
            .bearer_auth(access_token)
            .query(&params)
            .send()
            .await
            .map_err(|e| AppError::Upstream(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();

            // Expired or revoked credentials surface as 401, or as an
            // invalid_grant error body. Both force re-authentication.
            if status.as_u16() == 401 || body.contains("invalid_grant") {
                tracing::warn!(status = %status, "Calendar API rejected credentials");
                return Err(AppError::UpstreamAuthExpired);
            }

            return Err(AppError::Upstream(format!("HTTP {}: {}", status, body)));
        }

        let page: EventsResponse = response
            .json()
            .await
            .map_err(|e| AppError::Upstream(format!("Events JSON parse error: {}", e)))?;

        Ok(page.items.unwrap_or_default())
    }
}

/// Token endpoint response for the authorization-code grant.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenExchangeResponse {
    pub access_token: String,
    /// Absent when the user previously granted offline access elsewhere.
    pub refresh_token: Option<String>,
    /// Seconds until the access token expires.
    pub expires_in: Option<i64>,
    /// Identity assertion to verify against the configured client id.
    pub id_token: Option<String>,
}

/// Events list envelope; only `items` matters for the passthrough.
#[derive(Debug, Deserialize)]
struct EventsResponse {
    items: Option<Vec<CalendarEvent>>,
}
