// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Favourite weekday update workflow.

use axum::http::{header, StatusCode};
use favweekday::services::{xsrf, PreferenceStore};
use tower::ServiceExt;

mod common;
use common::{body_string, create_test_app, get, post_form};

#[tokio::test]
async fn test_update_stores_weekday_and_redirects_home() {
    let app = create_test_app();
    let (user, session) = app.signed_in_user("id-carol", "carol@example.com");
    let token = xsrf::generate(&app.state.config.xsrf_key, &user.id, "/update");

    let response = app
        .router
        .clone()
        .oneshot(post_form(
            "/update",
            Some(&session),
            &format!("xsrftoken={token}&favorite=3"),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(response.headers().get(header::LOCATION).unwrap(), "/");

    let record = app.store.get_favorite("id-carol").await.unwrap().unwrap();
    assert_eq!(record.weekday, 3);

    let response = app.router.oneshot(get("/", Some(&session))).await.unwrap();
    let html = body_string(response).await;
    assert!(html.contains("<option value=\"3\" selected>Wednesday</option>"));
}

#[tokio::test]
async fn test_invalid_xsrf_leaves_preference_untouched() {
    let app = create_test_app();
    let (user, session) = app.signed_in_user("id-carol", "carol@example.com");
    // Token minted for the delete action is not valid for update.
    let token = xsrf::generate(&app.state.config.xsrf_key, &user.id, "/deleteAccount");

    let response = app
        .router
        .oneshot(post_form(
            "/update",
            Some(&session),
            &format!("xsrftoken={token}&favorite=5"),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FOUND);
    assert!(app.store.is_empty());
}

#[tokio::test]
async fn test_token_of_other_user_is_rejected() {
    let app = create_test_app();
    let (_, session) = app.signed_in_user("id-carol", "carol@example.com");
    let token = xsrf::generate(&app.state.config.xsrf_key, "id-mallory", "/update");

    app.router
        .oneshot(post_form(
            "/update",
            Some(&session),
            &format!("xsrftoken={token}&favorite=5"),
        ))
        .await
        .unwrap();

    assert!(app.store.is_empty());
}

#[tokio::test]
async fn test_unparsable_favorite_is_ignored() {
    let app = create_test_app();
    let (user, session) = app.signed_in_user("id-carol", "carol@example.com");
    let token = xsrf::generate(&app.state.config.xsrf_key, &user.id, "/update");

    let response = app
        .router
        .oneshot(post_form(
            "/update",
            Some(&session),
            &format!("xsrftoken={token}&favorite=friday"),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FOUND);
    assert!(app.store.is_empty());
}

#[tokio::test]
async fn test_out_of_range_favorite_is_still_stored() {
    let app = create_test_app();
    let (user, session) = app.signed_in_user("id-carol", "carol@example.com");
    let token = xsrf::generate(&app.state.config.xsrf_key, &user.id, "/update");

    app.router
        .oneshot(post_form(
            "/update",
            Some(&session),
            &format!("xsrftoken={token}&favorite=9"),
        ))
        .await
        .unwrap();

    let record = app.store.get_favorite("id-carol").await.unwrap().unwrap();
    assert_eq!(record.weekday, 9);
}

#[tokio::test]
async fn test_update_without_user_redirects() {
    let app = create_test_app();

    let response = app
        .router
        .oneshot(post_form("/update", None, "xsrftoken=x&favorite=2"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FOUND);
    assert!(app.store.is_empty());
}
