//! Session state for one browser.
//!
//! Tokens live only inside the session store. They are serializable so a
//! durable backend can persist them, but no route handler ever writes them
//! into a response body.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Everything stored under one session id.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionData {
    /// Present once the OAuth callback has completed successfully.
    pub user: Option<SessionUser>,
}

/// Authenticated user identity plus their calendar credentials.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionUser {
    pub email: String,
    /// Display name from the identity assertion, when the provider shares it.
    pub name: Option<String>,
    /// Cleared when the provider rejects them; `None` forces re-authentication.
    pub tokens: Option<TokenSet>,
}

/// OAuth credential bundle authorizing calendar reads on the user's behalf.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenSet {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expiry: Option<DateTime<Utc>>,
}

impl SessionData {
    /// An authenticated session is one with a user AND tokens.
    pub fn authenticated_user(&self) -> Option<&SessionUser> {
        self.user.as_ref().filter(|u| u.tokens.is_some())
    }
}
