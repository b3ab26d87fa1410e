// SPDX-License-Identifier: MIT

//! Calbridge API Server
//!
//! Authenticates users with Google OAuth, keeps their calendar tokens in a
//! server-side session store, and proxies availability queries for the
//! team roster.

use calbridge::{
    config::Config,
    db::{InMemoryRoster, MemberRepository, SessionStore},
    middleware::rate_limit::{RateLimiter, DEFAULT_LIMIT, DEFAULT_WINDOW},
    services::{GoogleClient, IdTokenVerifier},
    AppState,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging
    init_logging();

    // Load configuration from environment
    let config = Config::from_env().expect("Failed to load configuration");
    tracing::info!(
        port = config.port,
        environment = %config.environment,
        "Starting Calbridge API"
    );

    // Session store (in-memory backend; a durable backend plugs in here)
    let sessions = SessionStore::new_memory(&config.session_secret, config.session_ttl_secs);
    tracing::info!(ttl_secs = config.session_ttl_secs, "Session store initialized");

    // Seeded member roster
    let roster = Arc::new(InMemoryRoster::with_seed_members());
    tracing::info!(count = roster.list().len(), "Roster loaded");

    // Google OAuth + Calendar client and ID token verifier
    let google = GoogleClient::new(&config).expect("Failed to initialize Google client");
    let id_verifier = Arc::new(
        IdTokenVerifier::new(&config.google_client_id)
            .expect("Failed to initialize ID token verifier"),
    );

    // Rate limiter for the /api surface
    let rate_limiter = Arc::new(RateLimiter::new(DEFAULT_LIMIT, DEFAULT_WINDOW));
    rate_limiter
        .clone()
        .spawn_cleanup_task(Duration::from_secs(300));

    // Build shared state
    let state = Arc::new(AppState {
        config: config.clone(),
        sessions,
        roster,
        google,
        id_verifier,
        rate_limiter,
    });

    // Build router
    let app = calbridge::routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;
    Ok(())
}

/// Initialize structured JSON logging.
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("calbridge=debug".parse().unwrap())
                .add_directive("info".parse().unwrap()),
        )
        .with(format)
        .init();
}
