// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! HTTP route handlers.

pub mod account;
pub mod pages;
pub mod templates;

use crate::AppState;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::{middleware, routing::get, Json, Router};
use serde::Serialize;
use std::sync::Arc;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

pub const HOME_URL: &str = "/";
pub const WIDGET_URL: &str = "/gitkit";
pub const SIGN_OUT_URL: &str = "/signOut";
pub const OOB_ACTION_URL: &str = "/oobAction";
pub const UPDATE_URL: &str = "/update";
pub const DELETE_ACCOUNT_URL: &str = "/deleteAccount";

/// Name of the hidden XSRF form field.
pub const XSRF_TOKEN_FIELD: &str = "xsrftoken";

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub build_id: String,
}

/// Health check response
async fn health_check() -> Json<HealthResponse> {
    let build_id = option_env!("BUILD_ID").unwrap_or("unknown").to_string();
    Json(HealthResponse {
        status: "ok".to_string(),
        build_id,
    })
}

/// `302 Found` back to the home page.
pub fn redirect_home() -> Response {
    (StatusCode::FOUND, [(header::LOCATION, HOME_URL)]).into_response()
}

/// Build the complete router with all routes.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .merge(pages::routes())
        .merge(account::routes())
        .layer(middleware::from_fn(
            crate::middleware::security::add_security_headers,
        ))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .with_state(state)
}
