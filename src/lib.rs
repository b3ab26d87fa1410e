// SPDX-License-Identifier: MIT

//! Calbridge: team calendar availability backend.
//!
//! This crate provides an HTTP API that authenticates users with Google
//! OAuth, keeps the granted tokens server-side in a cookie-keyed session
//! store, and proxies read-only Google Calendar availability queries for
//! a roster of team members.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;

use std::sync::Arc;

use config::Config;
use db::{MemberRepository, SessionStore};
use middleware::rate_limit::RateLimiter;
use services::{GoogleClient, IdTokenVerifier};

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub sessions: SessionStore,
    pub roster: Arc<dyn MemberRepository>,
    pub google: GoogleClient,
    pub id_verifier: Arc<IdTokenVerifier>,
    pub rate_limiter: Arc<RateLimiter>,
}
