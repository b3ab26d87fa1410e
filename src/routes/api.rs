// SPDX-License-Identifier: MIT

//! API routes: user info, member roster, and calendar availability.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;

use crate::error::{AppError, Result};
use crate::middleware::session::SessionContext;
use crate::models::{CalendarEvent, CreateMemberRequest, Member};
use crate::services::EventsQuery;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/me", get(get_me))
        .route("/api/members", get(list_members).post(create_member))
        .route("/api/availability/{member_id}", get(get_availability))
}

// ─── User Info ───────────────────────────────────────────────

/// Current user response. Tokens themselves are never exposed, only
/// whether the session holds them.
#[derive(Serialize)]
pub struct MeResponse {
    pub user: Option<MeUser>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MeUser {
    pub email: String,
    pub name: Option<String>,
    pub has_tokens: bool,
}

/// Get the current user's identity, or `{user: null}` when anonymous.
async fn get_me(ctx: SessionContext) -> Json<MeResponse> {
    let user = ctx.user().map(|u| MeUser {
        email: u.email.clone(),
        name: u.name.clone(),
        has_tokens: u.tokens.is_some(),
    });

    Json(MeResponse { user })
}

// ─── Member Roster ───────────────────────────────────────────

/// List all roster members.
async fn list_members(
    State(state): State<Arc<AppState>>,
    ctx: SessionContext,
) -> Result<Json<Vec<Member>>> {
    require_roster_auth(&state, &ctx)?;
    Ok(Json(state.roster.list()))
}

/// Add a roster member. All three fields are required.
async fn create_member(
    State(state): State<Arc<AppState>>,
    ctx: SessionContext,
    Json(req): Json<CreateMemberRequest>,
) -> Result<(StatusCode, Json<Member>)> {
    require_roster_auth(&state, &ctx)?;

    req.validate()
        .map_err(|_| AppError::Validation("Name, email, and calendarId are required".to_string()))?;

    let member = state.roster.insert(
        req.name.unwrap_or_default(),
        req.email.unwrap_or_default(),
        req.calendar_id.unwrap_or_default(),
    );

    tracing::info!(member_id = member.id, "Roster member created");

    Ok((StatusCode::CREATED, Json(member)))
}

/// Roster endpoints require a session user when the deployment says so.
fn require_roster_auth(state: &AppState, ctx: &SessionContext) -> Result<()> {
    if state.config.roster_auth_required && ctx.user().is_none() {
        return Err(AppError::Unauthorized);
    }
    Ok(())
}

// ─── Availability ────────────────────────────────────────────

#[derive(Deserialize)]
struct AvailabilityParams {
    timezone: Option<String>,
    start: Option<String>,
    end: Option<String>,
}

/// Fetch calendar availability for one member.
///
/// Guards run in order - session user, tokens, member lookup - and each
/// failure returns before any external call is made.
async fn get_availability(
    State(state): State<Arc<AppState>>,
    ctx: SessionContext,
    Path(member_id): Path<u32>,
    Query(params): Query<AvailabilityParams>,
) -> Result<Json<Vec<CalendarEvent>>> {
    let tokens = ctx.require_tokens()?.clone();

    let member = state
        .roster
        .find(member_id)
        .ok_or_else(|| AppError::NotFound(format!("Member {} not found", member_id)))?;

    tracing::info!(
        member_id,
        calendar_id = %member.calendar_id,
        "Fetching availability"
    );

    let query = EventsQuery {
        time_min: params.start,
        time_max: params.end,
        time_zone: params.timezone,
    };

    match state
        .google
        .list_events(&tokens.access_token, &member.calendar_id, &query)
        .await
    {
        Ok(events) => {
            tracing::info!(member_id, count = events.len(), "Fetched events");
            Ok(Json(events))
        }
        Err(AppError::UpstreamAuthExpired) => {
            // The provider rejected the stored tokens: clear them so the
            // next request short-circuits to 401 without another upstream
            // call, then report re-authentication-required.
            if let Some(sid) = &ctx.id {
                let mut data = ctx.data.clone();
                data.user = None;
                state.sessions.save(sid, &data).await?;
                tracing::info!("Cleared expired tokens from session");
            }
            Err(AppError::UpstreamAuthExpired)
        }
        Err(AppError::Upstream(msg)) if !state.config.is_production() => {
            // Development keeps the frontend alive on upstream hiccups.
            tracing::warn!(error = %msg, "Upstream failure, returning empty availability");
            Ok(Json(Vec::new()))
        }
        Err(e) => Err(e),
    }
}
