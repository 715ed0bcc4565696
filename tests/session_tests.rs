// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Session establishment from identity tokens and session cookies.

use axum::http::{header, Request, StatusCode};
use axum::body::Body;
use chrono::{Duration, Utc};
use std::sync::atomic::Ordering;
use tower::ServiceExt;

mod common;
use common::{body_string, create_test_app, find_cookie, get, set_cookie_headers};

const CLIENT_ID: &str = "test-client-id.apps.googleusercontent.com";

#[tokio::test]
async fn test_signed_out_home_shows_sign_in_only() {
    let app = create_test_app();

    let response = app.router.oneshot(get("/", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(find_cookie(&set_cookie_headers(&response), "SESSIONID").is_none());

    let html = body_string(response).await;
    assert!(html.contains("signInButton"));
    assert!(!html.contains("xsrftoken"));
}

#[tokio::test]
async fn test_fresh_token_starts_session() {
    let app = create_test_app();
    app.identity.add_user("id-alice", "alice@example.com", "Alice");
    app.identity
        .issue_token("tok-fresh", "id-alice", CLIENT_ID, Utc::now() - Duration::minutes(1));

    let response = app
        .router
        .oneshot(get("/", Some("gtoken=tok-fresh")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let cookies = set_cookie_headers(&response);
    let session = find_cookie(&cookies, "SESSIONID").expect("session cookie");
    assert!(session.contains("HttpOnly"));
    assert!(session.contains("Max-Age=604800"));
    assert!(session.contains("Path=/"));

    let html = body_string(response).await;
    assert!(html.contains("Alice (alice@example.com)"));
    assert!(html.contains("<option value=\"0\" selected>Sunday</option>"));
    assert!(html.contains("name=\"xsrftoken\""));
}

#[tokio::test]
async fn test_bearer_header_is_accepted() {
    let app = create_test_app();
    app.identity.add_user("id-alice", "alice@example.com", "Alice");
    app.identity
        .issue_token("tok-bearer", "id-alice", CLIENT_ID, Utc::now());

    let request = Request::builder()
        .uri("/")
        .header(header::AUTHORIZATION, "Bearer tok-bearer")
        .body(Body::empty())
        .unwrap();
    let response = app.router.oneshot(request).await.unwrap();

    assert!(find_cookie(&set_cookie_headers(&response), "SESSIONID").is_some());
}

#[tokio::test]
async fn test_stale_token_is_rejected() {
    let app = create_test_app();
    app.identity.add_user("id-alice", "alice@example.com", "Alice");
    app.identity.issue_token(
        "tok-stale",
        "id-alice",
        CLIENT_ID,
        Utc::now() - Duration::minutes(16),
    );

    let response = app
        .router
        .oneshot(get("/", Some("gtoken=tok-stale")))
        .await
        .unwrap();

    assert!(find_cookie(&set_cookie_headers(&response), "SESSIONID").is_none());
    let html = body_string(response).await;
    assert!(!html.contains("alice@example.com"));
}

#[tokio::test]
async fn test_token_for_other_audience_is_rejected() {
    let app = create_test_app();
    app.identity.add_user("id-alice", "alice@example.com", "Alice");
    app.identity
        .issue_token("tok-other", "id-alice", "other-client", Utc::now());

    let response = app
        .router
        .oneshot(get("/", Some("gtoken=tok-other")))
        .await
        .unwrap();

    assert!(find_cookie(&set_cookie_headers(&response), "SESSIONID").is_none());
}

#[tokio::test]
async fn test_profile_lookup_failure_means_signed_out() {
    let app = create_test_app();
    // Token is valid but the account no longer exists.
    app.identity
        .issue_token("tok-orphan", "id-gone", CLIENT_ID, Utc::now());

    let response = app
        .router
        .oneshot(get("/", Some("gtoken=tok-orphan")))
        .await
        .unwrap();

    assert!(find_cookie(&set_cookie_headers(&response), "SESSIONID").is_none());
}

#[tokio::test]
async fn test_existing_session_skips_token_validation() {
    let app = create_test_app();
    let (_, session) = app.signed_in_user("id-bob", "bob@example.com");

    let cookie = format!("{session}; gtoken=garbage");
    let response = app.router.oneshot(get("/", Some(&cookie))).await.unwrap();

    assert_eq!(app.identity.validate_calls.load(Ordering::SeqCst), 0);
    let html = body_string(response).await;
    assert!(html.contains("bob@example.com"));
}

#[tokio::test]
async fn test_forged_session_falls_back_to_token() {
    let app = create_test_app();
    app.identity.add_user("id-alice", "alice@example.com", "Alice");
    app.identity
        .issue_token("tok-fresh", "id-alice", CLIENT_ID, Utc::now());

    let response = app
        .router
        .oneshot(get("/", Some("SESSIONID=forged; gtoken=tok-fresh")))
        .await
        .unwrap();

    assert_eq!(app.identity.validate_calls.load(Ordering::SeqCst), 1);
    let html = body_string(response).await;
    assert!(html.contains("alice@example.com"));
}
