// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! XSRF tokens bound to a user and an action URL.
//!
//! Token format: `base64url(HMAC-SHA256(key, len(user) user len(action) action millis)) ":" millis`,
//! with lengths and millis as big-endian 64-bit integers.
//! Tokens are stateless and expire after [`TOKEN_TIMEOUT`].

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// How long a generated token stays valid.
pub const TOKEN_TIMEOUT: Duration = Duration::hours(24);

/// Tolerated clock difference for tokens issued "in the future".
const CLOCK_SKEW: Duration = Duration::minutes(1);

/// Generate a token for `user_id` performing `action_id`.
pub fn generate(key: &[u8], user_id: &str, action_id: &str) -> String {
    generate_at(key, user_id, action_id, Utc::now())
}

/// Generate a token as if issued at `now`.
pub fn generate_at(key: &[u8], user_id: &str, action_id: &str, now: DateTime<Utc>) -> String {
    let millis = now.timestamp_millis();
    format!(
        "{}:{}",
        URL_SAFE_NO_PAD.encode(signature(key, user_id, action_id, millis)),
        millis
    )
}

/// Check a token for `user_id` performing `action_id`.
pub fn valid(token: &str, key: &[u8], user_id: &str, action_id: &str) -> bool {
    valid_at(token, key, user_id, action_id, Utc::now())
}

/// Check a token against the clock reading `now`.
pub fn valid_at(
    token: &str,
    key: &[u8],
    user_id: &str,
    action_id: &str,
    now: DateTime<Utc>,
) -> bool {
    let Some((mac, millis)) = token.rsplit_once(':') else {
        return false;
    };
    let Ok(millis) = millis.parse::<i64>() else {
        return false;
    };
    let Some(issued) = DateTime::from_timestamp_millis(millis) else {
        return false;
    };

    if now - issued >= TOKEN_TIMEOUT || issued - now > CLOCK_SKEW {
        return false;
    }

    let Ok(provided) = URL_SAFE_NO_PAD.decode(mac) else {
        return false;
    };
    let expected = signature(key, user_id, action_id, millis);
    provided.ct_eq(&expected).into()
}

fn signature(key: &[u8], user_id: &str, action_id: &str, millis: i64) -> Vec<u8> {
    let mut mac = match HmacSha256::new_from_slice(key) {
        Ok(mac) => mac,
        Err(_) => unreachable!("HMAC-SHA256 accepts any key length"),
    };
    update_field(&mut mac, user_id.as_bytes());
    update_field(&mut mac, action_id.as_bytes());
    mac.update(&millis.to_be_bytes());
    mac.finalize().into_bytes().to_vec()
}

/// Feed one length-prefixed field, so no two (user, action) pairs share an input.
fn update_field(mac: &mut HmacSha256, field: &[u8]) {
    mac.update(&(field.len() as u64).to_be_bytes());
    mac.update(field);
}
