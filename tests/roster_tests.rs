// SPDX-License-Identifier: MIT

//! Member roster endpoint tests.

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use tower::ServiceExt;

mod common;

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn post_member(cookie: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/members")
        .header(header::COOKIE, cookie)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn list_requires_session_by_default() {
    let (app, _) = common::create_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/api/members")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn list_returns_seeded_roster() {
    let (app, state) = common::create_test_app();
    let (_, cookie) = common::seed_session(&state, common::authed_user()).await;

    let response = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/api/members")
                .header(header::COOKIE, &cookie)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    let members = body.as_array().unwrap();
    assert_eq!(members.len(), 5);
    assert_eq!(members[0]["id"], 1);
    assert!(members[0]["calendarId"].is_string());
}

#[tokio::test]
async fn anonymous_list_allowed_when_roster_auth_disabled() {
    let mut config = calbridge::config::Config::test_default();
    config.roster_auth_required = false;

    let (app, _) = common::create_test_app_with_config(
        config,
        "https://oauth2.googleapis.com/token",
        "https://www.googleapis.com/calendar/v3",
    );

    let response = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/api/members")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn create_assigns_strictly_increasing_ids() {
    let (app, state) = common::create_test_app();
    let (_, cookie) = common::seed_session(&state, common::authed_user()).await;

    let response = app
        .clone()
        .oneshot(post_member(
            &cookie,
            serde_json::json!({
                "name": "Noor Haddad",
                "email": "noor.haddad@example.com",
                "calendarId": "noor.haddad@example.com",
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    let first = body_json(response).await;
    assert_eq!(first["id"], 6);
    assert_eq!(first["name"], "Noor Haddad");

    let response = app
        .oneshot(post_member(
            &cookie,
            serde_json::json!({
                "name": "Ravi Iyer",
                "email": "ravi.iyer@example.com",
                "calendarId": "ravi.iyer@example.com",
            }),
        ))
        .await
        .unwrap();

    let second = body_json(response).await;
    assert!(second["id"].as_u64().unwrap() > first["id"].as_u64().unwrap());

    use calbridge::db::MemberRepository as _;
    assert_eq!(state.roster.list().len(), 7);
}

#[tokio::test]
async fn create_with_missing_field_is_400_and_roster_unchanged() {
    let (app, state) = common::create_test_app();
    let (_, cookie) = common::seed_session(&state, common::authed_user()).await;

    for body in [
        serde_json::json!({ "email": "x@example.com", "calendarId": "x@example.com" }),
        serde_json::json!({ "name": "X", "calendarId": "x@example.com" }),
        serde_json::json!({ "name": "X", "email": "x@example.com" }),
        serde_json::json!({}),
    ] {
        let response = app.clone().oneshot(post_member(&cookie, body)).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    use calbridge::db::MemberRepository as _;
    assert_eq!(state.roster.list().len(), 5);
}

#[tokio::test]
async fn create_requires_session() {
    let (app, _) = common::create_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/members")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(
                    serde_json::json!({
                        "name": "X",
                        "email": "x@example.com",
                        "calendarId": "x@example.com",
                    })
                    .to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}
