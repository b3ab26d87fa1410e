// SPDX-License-Identifier: MIT

//! Services module - external API integration.

pub mod google;
pub mod id_token;

pub use google::{EventsQuery, GoogleClient, TokenExchangeResponse, OAUTH_SCOPES};
pub use id_token::{IdTokenError, IdTokenVerifier, VerifiedIdentity};
