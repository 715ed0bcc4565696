// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Identity Toolkit account service: data types and the client interface.
//!
//! Both the web server and `gitkitcli` talk to the account service only
//! through [`IdentityToolkit`], so tests can substitute an in-process fake.

use async_trait::async_trait;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Account record as exchanged with the Identity Toolkit API.
///
/// This is also the JSON format of `uploadusers` / `downloadusers` files.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GitkitUser {
    pub local_id: String,
    #[serde(default)]
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
    #[serde(default)]
    pub email_verified: bool,
    /// Plaintext password, only ever sent on update.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "base64_bytes"
    )]
    pub password_hash: Option<Vec<u8>>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "base64_bytes"
    )]
    pub salt: Option<Vec<u8>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub provider_user_info: Vec<ProviderUserInfo>,
}

/// Federated identity linked to an account.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderUserInfo {
    pub provider_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub federated_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
}

/// Identity extracted from a token that passed signature and audience checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedToken {
    pub local_id: String,
    pub email: String,
    pub email_verified: bool,
    pub display_name: Option<String>,
    pub provider_id: Option<String>,
    pub audience: String,
    pub issued_at: DateTime<Utc>,
}

/// Out-of-band account actions that deliver a one-time code by email.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OobAction {
    ResetPassword,
    ChangeEmail,
    VerifyEmail,
}

impl OobAction {
    /// Parse the widget's `action` form value.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "resetPassword" => Some(Self::ResetPassword),
            "changeEmail" => Some(Self::ChangeEmail),
            "verifyEmail" => Some(Self::VerifyEmail),
            _ => None,
        }
    }

    /// Value used in form posts and in the widget `mode` parameter.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ResetPassword => "resetPassword",
            Self::ChangeEmail => "changeEmail",
            Self::VerifyEmail => "verifyEmail",
        }
    }

    /// `requestType` of the `getOobConfirmationCode` call.
    pub fn request_type(&self) -> &'static str {
        match self {
            Self::ResetPassword => "PASSWORD_RESET",
            Self::ChangeEmail => "NEW_EMAIL_ACCEPT",
            Self::VerifyEmail => "VERIFY_EMAIL",
        }
    }
}

impl fmt::Display for OobAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Request for an OOB confirmation code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OobRequest {
    pub action: OobAction,
    pub email: String,
    /// Target address for `ChangeEmail`.
    pub new_email: Option<String>,
    /// Signed-in user's identity token, required for `ChangeEmail`.
    pub id_token: Option<String>,
    pub user_ip: Option<String>,
    pub captcha_challenge: Option<String>,
    pub captcha_response: Option<String>,
}

/// Code issued by the service for an OOB action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OobCode {
    pub action: OobAction,
    pub email: String,
    pub new_email: Option<String>,
    pub code: String,
}

/// Password hash parameters for bulk upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HashOptions {
    pub algorithm: String,
    pub key: Vec<u8>,
    pub salt_separator: Vec<u8>,
}

/// One page of the account listing.
#[derive(Debug, Clone, Default)]
pub struct UserPage {
    pub users: Vec<GitkitUser>,
    pub next_page_token: Option<String>,
}

/// A record rejected by a bulk upload.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UploadFailure {
    /// Position of the record in the uploaded batch
    pub index: usize,
    pub message: String,
}

/// Identity Toolkit errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum IdentityError {
    #[error("invalid token: {0}")]
    InvalidToken(String),

    #[error("user not found: {0}")]
    NotFound(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("{} of the uploaded users failed", .0.len())]
    Upload(Vec<UploadFailure>),

    #[error("API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    #[error("authorization failed: {0}")]
    Auth(String),

    #[error("transport error: {0}")]
    Transport(String),
}

/// Client interface to the Identity Toolkit account service.
#[async_trait]
pub trait IdentityToolkit: Send + Sync {
    /// Check a token's signature, expiry and audience.
    async fn validate_token(
        &self,
        token: &str,
        audiences: &[String],
    ) -> Result<VerifiedToken, IdentityError>;

    async fn user_by_local_id(&self, local_id: &str) -> Result<GitkitUser, IdentityError>;

    async fn user_by_email(&self, email: &str) -> Result<GitkitUser, IdentityError>;

    async fn user_by_token(&self, token: &str) -> Result<GitkitUser, IdentityError>;

    /// Push display name, email-verified flag and, when set, a new password.
    async fn update_user(&self, user: &GitkitUser) -> Result<(), IdentityError>;

    async fn delete_user(&self, local_id: &str) -> Result<(), IdentityError>;

    /// Upload a batch; per-record rejections come back as [`IdentityError::Upload`].
    async fn upload_users(
        &self,
        users: &[GitkitUser],
        hash: &HashOptions,
    ) -> Result<(), IdentityError>;

    /// Fetch one page of accounts; `None` starts from the beginning.
    async fn download_users(
        &self,
        page_token: Option<&str>,
        max_results: u32,
    ) -> Result<UserPage, IdentityError>;

    async fn generate_oob_code(&self, request: &OobRequest) -> Result<OobCode, IdentityError>;
}

/// URL-safe base64 that accepts input with or without padding.
pub const URL_SAFE_LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Serde helper for binary fields carried as URL-safe base64 strings.
mod base64_bytes {
    use super::URL_SAFE_LENIENT;
    use base64::{engine::general_purpose::URL_SAFE, Engine as _};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Option<Vec<u8>>, s: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(bytes) => s.serialize_str(&URL_SAFE.encode(bytes)),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Vec<u8>>, D::Error> {
        let raw: Option<String> = Option::deserialize(d)?;
        raw.map(|s| URL_SAFE_LENIENT.decode(s).map_err(serde::de::Error::custom))
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_json_uses_camel_case_and_base64() {
        let user = GitkitUser {
            local_id: "id123".to_string(),
            email: "a@example.com".to_string(),
            display_name: Some("Alice".to_string()),
            email_verified: true,
            password_hash: Some(vec![0xfb, 0xff, 0x01]),
            salt: Some(b"salt".to_vec()),
            ..Default::default()
        };

        let json = serde_json::to_value(&user).unwrap();
        assert_eq!(json["localId"], "id123");
        assert_eq!(json["displayName"], "Alice");
        assert_eq!(json["emailVerified"], true);
        assert_eq!(json["passwordHash"], "-_8B");
        assert!(json.get("password").is_none());
        assert!(json.get("providerUserInfo").is_none());
    }

    #[test]
    fn test_user_json_accepts_unpadded_base64() {
        let user: GitkitUser =
            serde_json::from_str(r#"{"localId":"x","salt":"c2FsdA"}"#).unwrap();
        assert_eq!(user.salt.as_deref(), Some(&b"salt"[..]));
        assert_eq!(user.email, "");
        assert!(!user.email_verified);
    }

    #[test]
    fn test_oob_action_parse() {
        assert_eq!(OobAction::parse("resetPassword"), Some(OobAction::ResetPassword));
        assert_eq!(OobAction::parse("changeEmail"), Some(OobAction::ChangeEmail));
        assert_eq!(OobAction::parse("verifyEmail"), Some(OobAction::VerifyEmail));
        assert_eq!(OobAction::parse("deleteEverything"), None);
        assert_eq!(OobAction::ChangeEmail.request_type(), "NEW_EMAIL_ACCEPT");
    }

    #[test]
    fn test_upload_error_message_counts_failures() {
        let err = IdentityError::Upload(vec![
            UploadFailure {
                index: 0,
                message: "bad".to_string(),
            },
            UploadFailure {
                index: 3,
                message: "worse".to_string(),
            },
        ]);
        assert_eq!(err.to_string(), "2 of the uploaded users failed");
    }
}
