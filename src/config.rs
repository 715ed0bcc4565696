// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Configuration for the web server (environment) and the CLI (JSON file
//! plus flag overrides).
//!
//! The server keeps a single `APP_SECRET`; the session signing key and the
//! XSRF key are derived from it with HKDF so the two never share key material.

use hkdf::Hkdf;
use serde::Deserialize;
use sha2::Sha256;
use std::env;
use std::path::{Path, PathBuf};

/// Default JWKS endpoint for Google-issued identity tokens.
pub const DEFAULT_TOKEN_JWKS_URL: &str =
    "https://www.googleapis.com/service_accounts/v1/jwk/securetoken@system.gserviceaccount.com";

/// Default issuers accepted on identity tokens.
pub const DEFAULT_TOKEN_ISSUERS: &[&str] = &[
    "https://identitytoolkit.google.com/",
    "https://securetoken.google.com",
];

const DEFAULT_MAIL_SENDER: &str = "FavWeekday Support <support@favweekday.appspot.com>";

/// Which backend holds the favourite-weekday records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreferenceBackend {
    Firestore,
    Memory,
}

/// Server configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// OAuth client ID of this server; the only accepted token audience.
    pub client_id: String,
    /// Browser API key handed to the sign-in widget.
    pub browser_api_key: String,
    /// Externally visible base URL, used for links in emails.
    pub public_url: String,
    /// GCP project ID (Firestore)
    pub gcp_project_id: String,
    /// Server port
    pub port: u16,
    /// Service account key file; ambient credentials are used when unset.
    pub google_app_credentials_path: Option<PathBuf>,
    /// JWKS endpoint for identity token signing keys
    pub token_jwks_url: String,
    /// Accepted `iss` values on identity tokens
    pub token_issuers: Vec<String>,
    /// `From` header of outgoing mail
    pub mail_sender: String,
    /// HTTP mail relay; mail is only logged when unset.
    pub mail_relay_url: Option<String>,
    pub preference_backend: PreferenceBackend,

    // --- Derived secrets ---
    /// HS256 key for session cookies
    pub session_key: Vec<u8>,
    /// HMAC key for XSRF tokens
    pub xsrf_key: Vec<u8>,
}

impl Config {
    /// Load configuration from environment variables (and `.env` if present).
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let app_secret = env::var("APP_SECRET").map_err(|_| ConfigError::Missing("APP_SECRET"))?;
        if app_secret.len() < 32 {
            return Err(ConfigError::Invalid {
                name: "APP_SECRET",
                reason: "must be at least 32 bytes".to_string(),
            });
        }

        let preference_backend = match env::var("PREFERENCE_STORE").as_deref() {
            Ok("memory") => PreferenceBackend::Memory,
            Ok("firestore") | Err(_) => PreferenceBackend::Firestore,
            Ok(other) => {
                return Err(ConfigError::Invalid {
                    name: "PREFERENCE_STORE",
                    reason: format!("unknown backend {other:?}"),
                })
            }
        };

        Ok(Self {
            client_id: env::var("CLIENT_ID").map_err(|_| ConfigError::Missing("CLIENT_ID"))?,
            browser_api_key: env::var("BROWSER_API_KEY")
                .map_err(|_| ConfigError::Missing("BROWSER_API_KEY"))?,
            public_url: env::var("PUBLIC_URL")
                .map(|v| v.trim_end_matches('/').to_string())
                .unwrap_or_else(|_| "http://localhost:8080".to_string()),
            gcp_project_id: env::var("GCP_PROJECT_ID").unwrap_or_else(|_| "local-dev".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .unwrap_or(8080),
            google_app_credentials_path: env::var("GOOGLE_APP_CREDENTIALS_PATH")
                .ok()
                .map(PathBuf::from),
            token_jwks_url: env::var("TOKEN_JWKS_URL")
                .unwrap_or_else(|_| DEFAULT_TOKEN_JWKS_URL.to_string()),
            token_issuers: env::var("TOKEN_ISSUERS")
                .map(|v| split_list(&v))
                .unwrap_or_else(|_| default_issuers()),
            mail_sender: env::var("MAIL_SENDER").unwrap_or_else(|_| DEFAULT_MAIL_SENDER.to_string()),
            mail_relay_url: env::var("MAIL_RELAY_URL").ok().filter(|v| !v.is_empty()),
            preference_backend,
            session_key: derive_key(app_secret.as_bytes(), b"favweekday session")?,
            xsrf_key: derive_key(app_secret.as_bytes(), b"favweekday xsrf")?,
        })
    }

    /// Config for tests: memory store, log-only mail, fixed keys.
    pub fn test_default() -> Self {
        Self {
            client_id: "test-client-id.apps.googleusercontent.com".to_string(),
            browser_api_key: "test_browser_key".to_string(),
            public_url: "http://localhost:8080".to_string(),
            gcp_project_id: "test-project".to_string(),
            port: 8080,
            google_app_credentials_path: None,
            token_jwks_url: DEFAULT_TOKEN_JWKS_URL.to_string(),
            token_issuers: default_issuers(),
            mail_sender: DEFAULT_MAIL_SENDER.to_string(),
            mail_relay_url: None,
            preference_backend: PreferenceBackend::Memory,
            session_key: b"test_session_key_32_bytes_long!!".to_vec(),
            xsrf_key: b"test_xsrf_key_32_bytes_minimum!!".to_vec(),
        }
    }

    /// Cookies carry `Secure` only when the site is served over https.
    pub fn secure_cookies(&self) -> bool {
        self.public_url.starts_with("https://")
    }
}

/// Expand a 32-byte subkey for `info` from the application secret.
fn derive_key(secret: &[u8], info: &[u8]) -> Result<Vec<u8>, ConfigError> {
    let hk = Hkdf::<Sha256>::new(None, secret);
    let mut okm = vec![0u8; 32];
    hk.expand(info, &mut okm).map_err(|e| ConfigError::Invalid {
        name: "APP_SECRET",
        reason: e.to_string(),
    })?;
    Ok(okm)
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn default_issuers() -> Vec<String> {
    DEFAULT_TOKEN_ISSUERS.iter().map(|s| s.to_string()).collect()
}

// ─── CLI Configuration ───────────────────────────────────────

/// Contents of the `--config_file` JSON document.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CliConfig {
    #[serde(default)]
    pub client_id: String,
    #[serde(default)]
    pub google_app_credentials_path: Option<PathBuf>,
}

impl CliConfig {
    /// Read the config file when one is given; an absent path yields defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::File {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Command line flags win over the file.
    pub fn with_overrides(
        mut self,
        client_id: Option<String>,
        google_app_credentials_path: Option<PathBuf>,
    ) -> Self {
        if let Some(client_id) = client_id {
            self.client_id = client_id;
        }
        if let Some(path) = google_app_credentials_path {
            self.google_app_credentials_path = Some(path);
        }
        self
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {name}: {reason}")]
    Invalid { name: &'static str, reason: String },

    #[error("Cannot read config file {path}: {source}")]
    File {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}
