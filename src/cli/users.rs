// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Account helpers for the CLI: identifier lookup, locally created
//! accounts, and batched reading of account files.

use crate::services::identity::{GitkitUser, IdentityError, IdentityToolkit};
use ring::hmac;
use ring::rand::{SecureRandom, SystemRandom};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::io::Read;
use validator::ValidateEmail;

/// Hash algorithm name for accounts made by `createuser`.
pub const CREATE_USER_ALGORITHM: &str = "HMAC_SHA1";

const HASH_KEY_LEN: usize = 32;
const SALT_LEN: usize = 10;
/// Local IDs are `id` followed by a number below this bound.
const LOCAL_ID_BOUND: u64 = 10_000_000_000_000_000;

/// Fields printed by `validatetoken`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenInfo {
    pub local_id: String,
    pub email: String,
    pub email_verified: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider_id: Option<String>,
}

/// Look up a user by email address, ID token or local ID, in that order.
pub async fn user_by_identifier(
    identity: &dyn IdentityToolkit,
    client_id: &str,
    identifier: &str,
) -> Result<GitkitUser, IdentityError> {
    if identifier.validate_email() {
        return identity.user_by_email(identifier).await;
    }

    let audiences = [client_id.to_string()];
    if identity.validate_token(identifier, &audiences).await.is_ok() {
        return identity.user_by_token(identifier).await;
    }

    identity.user_by_local_id(identifier).await
}

/// Random hash key and salt for a new account.
pub fn random_key_and_salt(rng: &dyn SecureRandom) -> anyhow::Result<(Vec<u8>, Vec<u8>)> {
    let mut key = vec![0u8; HASH_KEY_LEN];
    let mut salt = vec![0u8; SALT_LEN];
    rng.fill(&mut key)
        .map_err(|_| anyhow::anyhow!("failed to generate hash key"))?;
    rng.fill(&mut salt)
        .map_err(|_| anyhow::anyhow!("failed to generate salt"))?;
    Ok((key, salt))
}

/// Build an account whose password hash is HMAC-SHA1(key, password || salt).
pub fn generate_user(
    rng: &dyn SecureRandom,
    email: &str,
    password: &str,
    key: &[u8],
    salt: &[u8],
) -> anyhow::Result<GitkitUser> {
    let hmac_key = hmac::Key::new(hmac::HMAC_SHA1_FOR_LEGACY_USE_ONLY, key);
    let mut ctx = hmac::Context::with_key(&hmac_key);
    ctx.update(password.as_bytes());
    ctx.update(salt);
    let hash = ctx.sign();

    Ok(GitkitUser {
        local_id: random_local_id(rng)?,
        email: email.to_string(),
        password_hash: Some(hash.as_ref().to_vec()),
        salt: Some(salt.to_vec()),
        ..Default::default()
    })
}

/// `id` followed by a uniformly random number, right-aligned in 16 columns.
fn random_local_id(rng: &dyn SecureRandom) -> anyhow::Result<String> {
    let zone = u64::MAX - (u64::MAX % LOCAL_ID_BOUND);
    loop {
        let mut buf = [0u8; 8];
        rng.fill(&mut buf)
            .map_err(|_| anyhow::anyhow!("failed to generate local ID"))?;
        let n = u64::from_le_bytes(buf);
        if n < zone {
            return Ok(format!("id{:16}", n % LOCAL_ID_BOUND));
        }
    }
}

/// Default random source.
pub fn system_random() -> SystemRandom {
    SystemRandom::new()
}

/// Reads JSON values from a stream in fixed-size batches.
///
/// The stream may hold whitespace-separated objects in any layout.
pub struct BatchReader<R: Read, T> {
    values: serde_json::StreamDeserializer<'static, serde_json::de::IoRead<R>, T>,
    batch_size: usize,
}

impl<R: Read, T: DeserializeOwned> BatchReader<R, T> {
    pub fn new(reader: R, batch_size: usize) -> Self {
        Self {
            values: serde_json::Deserializer::from_reader(reader).into_iter(),
            batch_size,
        }
    }

    /// Next batch; empty at end of input.
    pub fn next_batch(&mut self) -> Result<Vec<T>, serde_json::Error> {
        let mut batch = Vec::with_capacity(self.batch_size);
        while batch.len() < self.batch_size {
            match self.values.next() {
                Some(value) => batch.push(value?),
                None => break,
            }
        }
        Ok(batch)
    }
}
