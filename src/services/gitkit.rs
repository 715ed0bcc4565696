// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Identity Toolkit REST client.
//!
//! Handles:
//! - Account lookup, update and deletion
//! - Bulk upload and paged download
//! - OOB confirmation codes
//! - Identity token verification (delegated to [`TokenVerifier`])
//!
//! Calls are authorized with a service account OAuth token.

use crate::services::identity::{
    GitkitUser, HashOptions, IdentityError, IdentityToolkit, OobAction, OobCode, OobRequest,
    UploadFailure, UserPage, VerifiedToken,
};
use crate::services::token_verifier::TokenVerifier;
use anyhow::Context;
use async_trait::async_trait;
use base64::{engine::general_purpose::URL_SAFE, Engine as _};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

const API_BASE_URL: &str = "https://www.googleapis.com/identitytoolkit/v3/relyingparty";
const IDENTITY_TOOLKIT_SCOPE: &str = "https://www.googleapis.com/auth/identitytoolkit";
const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Settings needed to build a [`GitkitClient`].
#[derive(Debug, Clone)]
pub struct GitkitSettings {
    /// Service account JSON key; ambient credentials when `None`.
    pub credentials_path: Option<PathBuf>,
    pub token_jwks_url: String,
    pub token_issuers: Vec<String>,
}

/// Identity Toolkit API client.
pub struct GitkitClient {
    http: reqwest::Client,
    base_url: String,
    verifier: TokenVerifier,
    auth: gcloud_sdk::GoogleAuthTokenGenerator,
}

impl GitkitClient {
    /// Create a client, loading service account credentials.
    pub async fn new(settings: GitkitSettings) -> anyhow::Result<Self> {
        let token_source = match &settings.credentials_path {
            Some(path) => gcloud_sdk::TokenSourceType::File(path.clone()),
            None => gcloud_sdk::TokenSourceType::Default,
        };

        let auth = gcloud_sdk::GoogleAuthTokenGenerator::new(
            token_source,
            vec![IDENTITY_TOOLKIT_SCOPE.to_string()],
        )
        .await
        .context("failed loading Google service account credentials")?;

        let http = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .context("failed building Identity Toolkit HTTP client")?;

        let verifier = TokenVerifier::new(settings.token_jwks_url, settings.token_issuers)?;

        tracing::info!(
            credentials = ?settings.credentials_path,
            "Identity Toolkit client initialized"
        );

        Ok(Self {
            http,
            base_url: API_BASE_URL.to_string(),
            verifier,
            auth,
        })
    }

    /// POST a JSON request to a relyingparty method.
    async fn call<Req, Resp>(&self, method: &str, body: &Req) -> Result<Resp, IdentityError>
    where
        Req: Serialize + ?Sized,
        Resp: DeserializeOwned,
    {
        let token = self
            .auth
            .create_token()
            .await
            .map_err(|e| IdentityError::Auth(e.to_string()))?;

        let url = format!("{}/{}", self.base_url, method);
        let response = self
            .http
            .post(&url)
            .header(reqwest::header::AUTHORIZATION, token.header_value())
            .json(body)
            .send()
            .await
            .map_err(|e| IdentityError::Transport(format!("{method} request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::debug!(method, status = status.as_u16(), body = %body, "Identity Toolkit call failed");
            return Err(api_error(status.as_u16(), &body));
        }

        response
            .json()
            .await
            .map_err(|e| IdentityError::Transport(format!("invalid {method} response: {e}")))
    }

    async fn get_account_info(&self, request: AccountInfoRequest<'_>) -> Result<GitkitUser, IdentityError> {
        let what = request.describe();
        let response: AccountInfoResponse = self.call("getAccountInfo", &request).await?;
        response
            .users
            .into_iter()
            .next()
            .ok_or(IdentityError::NotFound(what))
    }
}

#[async_trait]
impl IdentityToolkit for GitkitClient {
    async fn validate_token(
        &self,
        token: &str,
        audiences: &[String],
    ) -> Result<VerifiedToken, IdentityError> {
        self.verifier.verify(token, audiences).await
    }

    async fn user_by_local_id(&self, local_id: &str) -> Result<GitkitUser, IdentityError> {
        self.get_account_info(AccountInfoRequest {
            local_id: Some(vec![local_id]),
            ..Default::default()
        })
        .await
    }

    async fn user_by_email(&self, email: &str) -> Result<GitkitUser, IdentityError> {
        self.get_account_info(AccountInfoRequest {
            email: Some(vec![email]),
            ..Default::default()
        })
        .await
    }

    async fn user_by_token(&self, token: &str) -> Result<GitkitUser, IdentityError> {
        self.get_account_info(AccountInfoRequest {
            id_token: Some(token),
            ..Default::default()
        })
        .await
    }

    async fn update_user(&self, user: &GitkitUser) -> Result<(), IdentityError> {
        let request = SetAccountInfoRequest {
            local_id: &user.local_id,
            email: Some(user.email.as_str()).filter(|e| !e.is_empty()),
            display_name: user.display_name.as_deref(),
            password: user.password.as_deref().filter(|p| !p.is_empty()),
            email_verified: user.email_verified,
        };
        let _: serde_json::Value = self.call("setAccountInfo", &request).await?;
        Ok(())
    }

    async fn delete_user(&self, local_id: &str) -> Result<(), IdentityError> {
        let _: serde_json::Value = self
            .call("deleteAccount", &serde_json::json!({ "localId": local_id }))
            .await?;
        Ok(())
    }

    async fn upload_users(
        &self,
        users: &[GitkitUser],
        hash: &HashOptions,
    ) -> Result<(), IdentityError> {
        let request = UploadAccountRequest {
            hash_algorithm: &hash.algorithm,
            signer_key: URL_SAFE.encode(&hash.key),
            salt_separator: (!hash.salt_separator.is_empty())
                .then(|| URL_SAFE.encode(&hash.salt_separator)),
            users,
        };
        let response: UploadAccountResponse = self.call("uploadAccount", &request).await?;
        if response.error.is_empty() {
            Ok(())
        } else {
            Err(IdentityError::Upload(response.error))
        }
    }

    async fn download_users(
        &self,
        page_token: Option<&str>,
        max_results: u32,
    ) -> Result<UserPage, IdentityError> {
        let request = DownloadAccountRequest {
            max_results,
            next_page_token: page_token,
        };
        let response: DownloadAccountResponse = self.call("downloadAccount", &request).await?;
        Ok(UserPage {
            next_page_token: response
                .next_page_token
                .filter(|t| !t.is_empty() && !response.users.is_empty()),
            users: response.users,
        })
    }

    async fn generate_oob_code(&self, request: &OobRequest) -> Result<OobCode, IdentityError> {
        if request.email.is_empty() {
            return Err(IdentityError::InvalidRequest("email is required".to_string()));
        }
        if request.action == OobAction::ChangeEmail {
            if request.new_email.as_deref().unwrap_or_default().is_empty() {
                return Err(IdentityError::InvalidRequest(
                    "newEmail is required to change email".to_string(),
                ));
            }
            if request.id_token.is_none() {
                return Err(IdentityError::InvalidRequest(
                    "a signed-in user is required to change email".to_string(),
                ));
            }
        }

        let body = OobCodeRequest {
            kind: "identitytoolkit#relyingparty",
            request_type: request.action.request_type(),
            email: &request.email,
            new_email: request.new_email.as_deref(),
            id_token: request.id_token.as_deref(),
            user_ip: request.user_ip.as_deref(),
            challenge: request.captcha_challenge.as_deref(),
            captcha_resp: request.captcha_response.as_deref(),
        };
        let response: OobCodeResponse = self.call("getOobConfirmationCode", &body).await?;

        Ok(OobCode {
            action: request.action,
            email: request.email.clone(),
            new_email: request.new_email.clone(),
            code: response.oob_code,
        })
    }
}

// ─── Wire Types ──────────────────────────────────────────────

#[derive(Serialize, Default)]
#[serde(rename_all = "camelCase")]
struct AccountInfoRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    local_id: Option<Vec<&'a str>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    email: Option<Vec<&'a str>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    id_token: Option<&'a str>,
}

impl AccountInfoRequest<'_> {
    fn describe(&self) -> String {
        if let Some(ids) = &self.local_id {
            format!("localId {}", ids.join(","))
        } else if let Some(emails) = &self.email {
            format!("email {}", emails.join(","))
        } else {
            "token holder".to_string()
        }
    }
}

#[derive(Deserialize)]
struct AccountInfoResponse {
    #[serde(default)]
    users: Vec<GitkitUser>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SetAccountInfoRequest<'a> {
    local_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    email: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    display_name: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    password: Option<&'a str>,
    email_verified: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct UploadAccountRequest<'a> {
    hash_algorithm: &'a str,
    signer_key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    salt_separator: Option<String>,
    users: &'a [GitkitUser],
}

#[derive(Deserialize)]
struct UploadAccountResponse {
    #[serde(default)]
    error: Vec<UploadFailure>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DownloadAccountRequest<'a> {
    max_results: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    next_page_token: Option<&'a str>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DownloadAccountResponse {
    #[serde(default)]
    users: Vec<GitkitUser>,
    next_page_token: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct OobCodeRequest<'a> {
    kind: &'static str,
    request_type: &'static str,
    email: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    new_email: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    id_token: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    user_ip: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    challenge: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    captcha_resp: Option<&'a str>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct OobCodeResponse {
    oob_code: String,
}

#[derive(Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Deserialize)]
struct ApiErrorDetail {
    #[serde(default)]
    message: String,
}

/// Map an error response to an [`IdentityError`].
fn api_error(status: u16, body: &str) -> IdentityError {
    let message = serde_json::from_str::<ApiErrorBody>(body)
        .map(|b| b.error.message)
        .unwrap_or_else(|_| body.to_string());

    match message.as_str() {
        "USER_NOT_FOUND" | "EMAIL_NOT_FOUND" => IdentityError::NotFound(message),
        "INVALID_ID_TOKEN" | "TOKEN_EXPIRED" => IdentityError::InvalidToken(message),
        _ if status == 401 || status == 403 => IdentityError::Auth(message),
        _ => IdentityError::Api { status, message },
    }
}
