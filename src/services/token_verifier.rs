// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Verification of identity tokens issued to signed-in users.
//!
//! Signing keys come from a JWKS endpoint and are cached according to the
//! response's `Cache-Control: max-age`. An unknown `kid` forces one refresh
//! before the token is rejected (keys rotate).

use crate::services::identity::{IdentityError, VerifiedToken};
use anyhow::Context;
use chrono::{DateTime, Utc};
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use reqwest::header::CACHE_CONTROL;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, RwLock};

const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(5);
const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(300);
const CLOCK_SKEW_SECS: u64 = 60;

enum KeySource {
    Jwks {
        url: String,
    },
    Static {
        kid: String,
        algorithm: Algorithm,
        decoding_key: Arc<DecodingKey>,
    },
}

struct JwksCacheEntry {
    keys_by_kid: HashMap<String, Arc<DecodingKey>>,
    expires_at: Instant,
}

/// Verifier for identity tokens.
pub struct TokenVerifier {
    http_client: reqwest::Client,
    issuers: Vec<String>,
    source: KeySource,
    jwks_cache: RwLock<Option<JwksCacheEntry>>,
    refresh_lock: Mutex<()>,
}

impl TokenVerifier {
    /// Create a verifier that fetches RS256 keys from `jwks_url`.
    pub fn new(jwks_url: impl Into<String>, issuers: Vec<String>) -> anyhow::Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .context("failed building JWKS HTTP client")?;

        let url = jwks_url.into();
        tracing::info!(jwks_url = %url, issuers = ?issuers, "Initialized identity token verifier");

        Ok(Self {
            http_client,
            issuers,
            source: KeySource::Jwks { url },
            jwks_cache: RwLock::new(None),
            refresh_lock: Mutex::new(()),
        })
    }

    /// Create a verifier with a single fixed key.
    ///
    /// Tokens are checked against this key only and the JWKS endpoint is
    /// never fetched. Any algorithm may be used. The server always builds
    /// the JWKS verifier.
    pub fn new_with_static_key(
        kid: impl Into<String>,
        algorithm: Algorithm,
        decoding_key: DecodingKey,
        issuers: Vec<String>,
    ) -> anyhow::Result<Self> {
        let kid = kid.into();
        if kid.trim().is_empty() {
            anyhow::bail!("static token kid must not be empty");
        }

        Ok(Self {
            http_client: reqwest::Client::new(),
            issuers,
            source: KeySource::Static {
                kid,
                algorithm,
                decoding_key: Arc::new(decoding_key),
            },
            jwks_cache: RwLock::new(None),
            refresh_lock: Mutex::new(()),
        })
    }

    /// Verify `token` and require one of `audiences` in its `aud` claim.
    pub async fn verify(
        &self,
        token: &str,
        audiences: &[String],
    ) -> Result<VerifiedToken, IdentityError> {
        let header = decode_header(token)
            .map_err(|e| IdentityError::InvalidToken(format!("invalid JWT header: {e}")))?;

        let expected_alg = match &self.source {
            KeySource::Jwks { .. } => Algorithm::RS256,
            KeySource::Static { algorithm, .. } => *algorithm,
        };
        if header.alg != expected_alg {
            return Err(IdentityError::InvalidToken(format!(
                "unexpected JWT alg: {:?}",
                header.alg
            )));
        }

        let kid = header
            .kid
            .ok_or_else(|| IdentityError::InvalidToken("missing JWT kid".to_string()))?;
        let decoding_key = self.decoding_key_for_kid(&kid).await?;

        let mut validation = Validation::new(expected_alg);
        validation.set_required_spec_claims(&["exp", "iss", "aud"]);
        validation.set_audience(audiences);
        validation.leeway = CLOCK_SKEW_SECS;

        let claims = decode::<IdentityTokenClaims>(token, decoding_key.as_ref(), &validation)
            .map_err(|e| IdentityError::InvalidToken(format!("JWT validation failed: {e}")))?
            .claims;

        if !self.issuer_accepted(&claims.iss) {
            return Err(IdentityError::InvalidToken(format!(
                "unexpected issuer: {}",
                claims.iss
            )));
        }

        let issued_at = validate_iat(claims.iat)?;
        let local_id = claims
            .user_id
            .or(claims.sub)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| IdentityError::InvalidToken("missing user id claim".to_string()))?;

        tracing::debug!(local_id = %local_id, issuer = %claims.iss, "Identity token verified");

        Ok(VerifiedToken {
            local_id,
            email: claims.email.unwrap_or_default(),
            email_verified: claims.verified.unwrap_or(false),
            display_name: claims.display_name,
            provider_id: claims.provider_id,
            audience: claims.aud,
            issued_at,
        })
    }

    /// Issuers match exactly or as a path prefix (`https://securetoken.google.com/<project>`).
    fn issuer_accepted(&self, iss: &str) -> bool {
        self.issuers.iter().any(|accepted| {
            let accepted = accepted.trim_end_matches('/');
            let iss = iss.trim_end_matches('/');
            iss == accepted
                || iss
                    .strip_prefix(accepted)
                    .is_some_and(|rest| rest.starts_with('/'))
        })
    }

    async fn decoding_key_for_kid(&self, kid: &str) -> Result<Arc<DecodingKey>, IdentityError> {
        let url = match &self.source {
            KeySource::Static {
                kid: static_kid,
                decoding_key,
                ..
            } => {
                if kid == static_kid {
                    return Ok(decoding_key.clone());
                }
                return Err(IdentityError::InvalidToken(format!(
                    "unknown JWT kid for static verifier: {kid}"
                )));
            }
            KeySource::Jwks { url } => url,
        };

        if let Some(key) = self.lookup_cached_key(kid).await {
            return Ok(key);
        }

        for force_refresh in [false, true] {
            self.refresh_jwks(url, force_refresh).await?;
            if let Some(key) = self.lookup_cached_key(kid).await {
                return Ok(key);
            }
        }

        Err(IdentityError::InvalidToken(format!(
            "JWT kid not found in JWKS after refresh: {kid}"
        )))
    }

    async fn lookup_cached_key(&self, kid: &str) -> Option<Arc<DecodingKey>> {
        let cache = self.jwks_cache.read().await;
        let now = Instant::now();
        cache
            .as_ref()
            .filter(|entry| entry.expires_at > now)
            .and_then(|entry| entry.keys_by_kid.get(kid))
            .cloned()
    }

    async fn refresh_jwks(&self, url: &str, force_refresh: bool) -> Result<(), IdentityError> {
        let _guard = self.refresh_lock.lock().await;

        if !force_refresh {
            let cache = self.jwks_cache.read().await;
            if cache
                .as_ref()
                .is_some_and(|entry| entry.expires_at > Instant::now())
            {
                return Ok(());
            }
        }

        tracing::debug!(jwks_url = %url, "Refreshing identity token JWKS cache");

        let response = self
            .http_client
            .get(url)
            .send()
            .await
            .map_err(|e| IdentityError::Transport(format!("JWKS request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(IdentityError::Transport(format!(
                "JWKS request returned status {}",
                response.status()
            )));
        }

        let ttl = cache_ttl_from_headers(response.headers(), DEFAULT_CACHE_TTL);
        let jwks: Jwks = response
            .json()
            .await
            .map_err(|e| IdentityError::Transport(format!("invalid JWKS JSON: {e}")))?;

        let keys_by_kid = usable_keys(jwks);
        if keys_by_kid.is_empty() {
            return Err(IdentityError::Transport(
                "JWKS response did not include any usable RSA keys".to_string(),
            ));
        }

        *self.jwks_cache.write().await = Some(JwksCacheEntry {
            keys_by_kid,
            expires_at: Instant::now() + ttl,
        });

        tracing::debug!(ttl_secs = ttl.as_secs(), "JWKS cache refreshed");
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct Jwks {
    keys: Vec<Jwk>,
}

#[derive(Debug, Deserialize)]
struct Jwk {
    kid: String,
    kty: String,
    alg: Option<String>,
    n: String,
    e: String,
    #[serde(rename = "use")]
    use_: Option<String>,
}

/// Claims of an identity token.
///
/// Older Identity Toolkit tokens carry `user_id`/`verified`/`display_name`;
/// newer ones use `sub`/`email_verified`/`name`. Both are accepted.
#[derive(Debug, Deserialize)]
struct IdentityTokenClaims {
    iss: String,
    aud: String,
    iat: Option<i64>,
    sub: Option<String>,
    user_id: Option<String>,
    email: Option<String>,
    #[serde(alias = "email_verified")]
    verified: Option<bool>,
    #[serde(alias = "name")]
    display_name: Option<String>,
    provider_id: Option<String>,
}

/// RS256 signing keys from a JWKS document, by `kid`.
fn usable_keys(jwks: Jwks) -> HashMap<String, Arc<DecodingKey>> {
    let mut keys_by_kid = HashMap::new();

    for jwk in jwks.keys {
        if jwk.kty != "RSA" || jwk.kid.trim().is_empty() {
            continue;
        }
        if jwk.alg.as_deref().is_some_and(|alg| alg != "RS256") {
            continue;
        }
        if jwk.use_.as_deref().is_some_and(|use_| use_ != "sig") {
            continue;
        }

        match DecodingKey::from_rsa_components(&jwk.n, &jwk.e) {
            Ok(key) => {
                keys_by_kid.insert(jwk.kid, Arc::new(key));
            }
            Err(e) => {
                tracing::warn!(error = %e, kid = %jwk.kid, "Skipping invalid RSA JWKS key");
            }
        }
    }

    keys_by_kid
}

fn validate_iat(iat: Option<i64>) -> Result<DateTime<Utc>, IdentityError> {
    let Some(iat) = iat else {
        return Err(IdentityError::InvalidToken("missing iat claim".to_string()));
    };

    if iat > Utc::now().timestamp() + CLOCK_SKEW_SECS as i64 {
        return Err(IdentityError::InvalidToken(
            "iat claim is in the future".to_string(),
        ));
    }

    DateTime::from_timestamp(iat, 0)
        .ok_or_else(|| IdentityError::InvalidToken("iat claim out of range".to_string()))
}

fn cache_ttl_from_headers(headers: &reqwest::header::HeaderMap, fallback: Duration) -> Duration {
    headers
        .get(CACHE_CONTROL)
        .and_then(|v| v.to_str().ok())
        .and_then(parse_cache_control_max_age)
        .map(Duration::from_secs)
        .unwrap_or(fallback)
}

fn parse_cache_control_max_age(value: &str) -> Option<u64> {
    value.split(',').find_map(|directive| {
        directive
            .trim()
            .strip_prefix("max-age=")
            .and_then(|raw| raw.trim_matches('"').parse::<u64>().ok())
    })
}
