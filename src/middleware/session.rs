// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Session cookie and identity-token resolution.
//!
//! A request is signed in when it carries either a valid `SESSIONID` cookie
//! or a recently issued identity token (`gtoken` cookie or bearer header).
//! The session cookie is an HS256 JWT holding the full [`User`].

use crate::config::Config;
use crate::models::User;
use crate::AppState;
use axum::http::{header, HeaderMap};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

/// Session cookie name.
pub const SESSION_COOKIE: &str = "SESSIONID";

/// Cookie set by the sign-in widget with the identity token.
pub const TOKEN_COOKIE: &str = "gtoken";

/// Session lifetime.
pub const SESSION_MAX_AGE: Duration = Duration::days(7);

/// Identity tokens issued longer ago than this do not start a session.
pub const TOKEN_MAX_AGE: Duration = Duration::minutes(15);

#[derive(Debug, Serialize, Deserialize)]
struct SessionClaims {
    user: User,
    iat: usize,
    exp: usize,
}

/// Sign a session token for `user`.
pub fn encode_session(user: &User, key: &[u8]) -> anyhow::Result<String> {
    let now = Utc::now();
    let claims = SessionClaims {
        user: user.clone(),
        iat: now.timestamp() as usize,
        exp: (now + SESSION_MAX_AGE).timestamp() as usize,
    };

    Ok(encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(key),
    )?)
}

/// Verify a session token; `None` if it is forged, malformed or expired.
pub fn decode_session(token: &str, key: &[u8]) -> Option<User> {
    let validation = Validation::new(Algorithm::HS256);
    decode::<SessionClaims>(token, &DecodingKey::from_secret(key), &validation)
        .map(|data| data.claims.user)
        .ok()
}

/// Identity token from the widget cookie, else from `Authorization: Bearer`.
pub fn identity_token(jar: &CookieJar, headers: &HeaderMap) -> Option<String> {
    if let Some(cookie) = jar.get(TOKEN_COOKIE) {
        if !cookie.value().is_empty() {
            return Some(cookie.value().to_string());
        }
    }

    headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
}

/// Determine the signed-in user, if any.
pub async fn resolve_current_user(
    state: &AppState,
    jar: &CookieJar,
    headers: &HeaderMap,
) -> Option<User> {
    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        match decode_session(cookie.value(), &state.config.session_key) {
            Some(user) => return Some(user),
            None => tracing::debug!("Ignoring invalid or expired session cookie"),
        }
    }

    let token = identity_token(jar, headers)?;

    let audiences = [state.config.client_id.clone()];
    let verified = match state.identity.validate_token(&token, &audiences).await {
        Ok(verified) => verified,
        Err(e) => {
            tracing::warn!(error = %e, "Identity token rejected");
            return None;
        }
    };

    let age = Utc::now() - verified.issued_at;
    if age > TOKEN_MAX_AGE {
        tracing::info!(
            local_id = %verified.local_id,
            age_secs = age.num_seconds(),
            "Identity token too old to start a session"
        );
        return None;
    }

    match state.identity.user_by_local_id(&verified.local_id).await {
        Ok(user) => Some(User::from(user)),
        Err(e) => {
            tracing::error!(local_id = %verified.local_id, error = %e, "Failed to fetch user profile");
            None
        }
    }
}

/// Store `user` in the session cookie. Does nothing when `user` is `None`.
pub fn persist_session(jar: CookieJar, config: &Config, user: Option<&User>) -> CookieJar {
    let Some(user) = user else {
        return jar;
    };

    match encode_session(user, &config.session_key) {
        Ok(token) => jar.add(
            Cookie::build((SESSION_COOKIE, token))
                .path("/")
                .http_only(true)
                .same_site(SameSite::Lax)
                .secure(config.secure_cookies())
                .max_age(time::Duration::seconds(SESSION_MAX_AGE.num_seconds()))
                .build(),
        ),
        Err(e) => {
            tracing::error!(user_id = %user.id, error = %e, "Failed to sign session");
            jar
        }
    }
}

/// Expire the session and identity-token cookies.
pub fn clear_session(jar: CookieJar, config: &Config) -> CookieJar {
    let secure = config.secure_cookies();
    jar.add(
        Cookie::build((SESSION_COOKIE, ""))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax)
            .secure(secure)
            .removal()
            .build(),
    )
    .add(
        Cookie::build((TOKEN_COOKIE, ""))
            .path("/")
            .same_site(SameSite::Lax)
            .secure(secure)
            .removal()
            .build(),
    )
}
