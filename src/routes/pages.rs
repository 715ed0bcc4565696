// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Home page, sign-in widget and sign-out.

use axum::{
    body::Bytes,
    extract::State,
    http::HeaderMap,
    response::{Html, IntoResponse, Response},
    routing::{any, get},
    Router,
};
use axum_extra::extract::cookie::CookieJar;
use std::sync::Arc;

use super::templates::{render_home, render_widget, HomePage, WidgetPage};
use super::{redirect_home, DELETE_ACCOUNT_URL, HOME_URL, OOB_ACTION_URL, SIGN_OUT_URL};
use super::{UPDATE_URL, WIDGET_URL};
use crate::middleware::session::{clear_session, persist_session, resolve_current_user};
use crate::services::xsrf;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(HOME_URL, get(home))
        .route(WIDGET_URL, get(widget).post(widget))
        .route(SIGN_OUT_URL, any(sign_out))
}

/// Show the user's favourite weekday, or a sign-in button.
async fn home(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    headers: HeaderMap,
) -> Response {
    let user = resolve_current_user(&state, &jar, &headers).await;

    let mut weekday_index = 0;
    let mut update_token = String::new();
    let mut delete_token = String::new();
    if let Some(user) = &user {
        weekday_index = state.preferences.weekday_for_user(user).await;
        update_token = xsrf::generate(&state.config.xsrf_key, &user.id, UPDATE_URL);
        delete_token = xsrf::generate(&state.config.xsrf_key, &user.id, DELETE_ACCOUNT_URL);
    }

    let jar = persist_session(jar, &state.config, user.as_ref());

    let html = render_home(&HomePage {
        user: user.as_ref(),
        weekday_index,
        update_xsrf_token: &update_token,
        delete_xsrf_token: &delete_token,
    });

    (jar, Html(html)).into_response()
}

/// Serve the sign-in widget, replaying any body posted to it.
async fn widget(State(state): State<Arc<AppState>>, body: Bytes) -> Html<String> {
    let post_body = decode_post_body(&body);

    Html(render_widget(&WidgetPage {
        browser_api_key: &state.config.browser_api_key,
        sign_in_success_url: HOME_URL,
        oob_action_url: OOB_ACTION_URL,
        post_body: &post_body,
    }))
}

/// Query-unescape a form body; undecodable input yields an empty string.
fn decode_post_body(body: &[u8]) -> String {
    let raw = String::from_utf8_lossy(body).replace('+', " ");
    match urlencoding::decode(&raw) {
        Ok(decoded) => decoded.into_owned(),
        Err(e) => {
            tracing::debug!(error = %e, "Ignoring undecodable widget body");
            String::new()
        }
    }
}

async fn sign_out(State(state): State<Arc<AppState>>, jar: CookieJar) -> Response {
    (clear_session(jar, &state.config), redirect_home()).into_response()
}
