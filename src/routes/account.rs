// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Account workflows: OOB emails, preference update, account deletion.

use axum::{
    extract::{rejection::FormRejection, State},
    http::HeaderMap,
    response::{IntoResponse, Response},
    routing::{any, post},
    Form, Json, Router,
};
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

use super::{redirect_home, DELETE_ACCOUNT_URL, OOB_ACTION_URL, UPDATE_URL, WIDGET_URL};
use crate::middleware::session::{clear_session, identity_token, resolve_current_user};
use crate::services::identity::{OobAction, OobRequest};
use crate::services::{mail, xsrf};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(OOB_ACTION_URL, any(oob_action))
        .route(UPDATE_URL, post(update))
        .route(DELETE_ACCOUNT_URL, post(delete_account))
}

/// Form posted by the widget for an out-of-band action.
#[derive(Debug, Default, Deserialize)]
pub struct OobForm {
    #[serde(default)]
    pub action: String,
    #[serde(default)]
    pub email: String,
    #[serde(default, rename = "newEmail")]
    pub new_email: String,
    /// CAPTCHA challenge and answer
    #[serde(default)]
    pub challenge: String,
    #[serde(default)]
    pub response: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateForm {
    #[serde(default)]
    pub xsrftoken: String,
    #[serde(default)]
    pub favorite: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct DeleteAccountForm {
    #[serde(default)]
    pub xsrftoken: String,
}

// ─── OOB Action ──────────────────────────────────────────────

/// Obtain an OOB code for the widget's request and email the link.
///
/// The widget reads the JSON body: `{"success": true}` or
/// `{"error": "..."}`. Both are sent with status 200.
async fn oob_action(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    headers: HeaderMap,
    form: Result<Form<OobForm>, FormRejection>,
) -> Json<serde_json::Value> {
    match send_oob_email(&state, &jar, &headers, form).await {
        Ok(()) => Json(json!({ "success": true })),
        Err(message) => Json(json!({ "error": message })),
    }
}

async fn send_oob_email(
    state: &AppState,
    jar: &CookieJar,
    headers: &HeaderMap,
    form: Result<Form<OobForm>, FormRejection>,
) -> Result<(), String> {
    let Form(form) = form.map_err(|e| {
        tracing::error!(error = %e, "Malformed OOB request");
        e.body_text()
    })?;

    let action = OobAction::parse(&form.action).ok_or_else(|| {
        tracing::error!(action = %form.action, "Unknown OOB action");
        format!("unknown action: {}", form.action)
    })?;

    let request = OobRequest {
        action,
        email: form.email,
        new_email: non_empty(form.new_email),
        id_token: identity_token(jar, headers),
        user_ip: client_ip(headers),
        captcha_challenge: non_empty(form.challenge),
        captcha_response: non_empty(form.response),
    };

    let code = state
        .identity
        .generate_oob_code(&request)
        .await
        .map_err(|e| {
            tracing::error!(action = %action, error = %e, "Failed to get an OOB code");
            e.to_string()
        })?;

    let link = format!(
        "{}{}?mode={}&oobCode={}",
        state.config.public_url,
        WIDGET_URL,
        code.action,
        urlencoding::encode(&code.code)
    );
    let message = mail::oob_message(&state.config.mail_sender, &code, &link);

    state.mailer.send(&message).await.map_err(|e| {
        tracing::error!(action = %code.action, email = %code.email, error = %e, "Failed to send OOB message");
        e.to_string()
    })?;

    tracing::info!(action = %code.action, email = %code.email, "OOB message sent");
    Ok(())
}

/// First address of `X-Forwarded-For`.
fn client_ip(headers: &HeaderMap) -> Option<String> {
    headers
        .get("x-forwarded-for")
        .and_then(|h| h.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|ip| !ip.is_empty())
        .map(str::to_string)
}

fn non_empty(s: String) -> Option<String> {
    if s.is_empty() {
        None
    } else {
        Some(s)
    }
}

// ─── Preference Update ───────────────────────────────────────

async fn update(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    headers: HeaderMap,
    form: Result<Form<UpdateForm>, FormRejection>,
) -> Response {
    let Some(user) = resolve_current_user(&state, &jar, &headers).await else {
        tracing::warn!("No signed in user for update");
        return redirect_home();
    };

    let Ok(Form(form)) = form else {
        tracing::warn!(user_id = %user.id, "Malformed update form");
        return redirect_home();
    };

    if !xsrf::valid(&form.xsrftoken, &state.config.xsrf_key, &user.id, UPDATE_URL) {
        tracing::warn!(user_id = %user.id, "XSRF token validation failed");
        return redirect_home();
    }

    match form.favorite.parse::<i64>() {
        Ok(weekday) => {
            state
                .preferences
                .update_weekday_for_user(&user, weekday)
                .await
        }
        Err(e) => {
            tracing::warn!(user_id = %user.id, value = %form.favorite, error = %e, "Invalid favourite weekday");
        }
    }

    redirect_home()
}

// ─── Account Deletion ────────────────────────────────────────

async fn delete_account(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    headers: HeaderMap,
    form: Result<Form<DeleteAccountForm>, FormRejection>,
) -> Response {
    let Some(user) = resolve_current_user(&state, &jar, &headers).await else {
        tracing::warn!("No signed in user for account deletion");
        return redirect_home();
    };

    let Ok(Form(form)) = form else {
        tracing::warn!(user_id = %user.id, "Malformed delete form");
        return redirect_home();
    };

    if !xsrf::valid(
        &form.xsrftoken,
        &state.config.xsrf_key,
        &user.id,
        DELETE_ACCOUNT_URL,
    ) {
        tracing::warn!(user_id = %user.id, "XSRF token validation failed");
        return redirect_home();
    }

    if let Err(e) = state.identity.delete_user(&user.id).await {
        tracing::error!(user_id = %user.id, error = %e, "Failed to delete user");
        return redirect_home();
    }

    tracing::info!(user_id = %user.id, "Account deleted");
    state.preferences.forget_user(&user).await;

    (clear_session(jar, &state.config), redirect_home()).into_response()
}
