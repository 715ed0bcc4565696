// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request};
use axum::response::Response;
use chrono::{DateTime, Utc};
use favweekday::config::Config;
use favweekday::db::{FirestoreDb, MemoryStore};
use favweekday::models::User;
use favweekday::routes::create_router;
use favweekday::services::identity::{
    GitkitUser, HashOptions, IdentityError, IdentityToolkit, OobCode, OobRequest, UploadFailure,
    UserPage, VerifiedToken,
};
use favweekday::services::{MailError, Mailer, Message, PreferenceService};
use favweekday::AppState;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Check if emulator is available via environment variable.
#[allow(dead_code)]
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

/// Create a test database connection.
#[allow(dead_code)]
pub async fn test_db() -> FirestoreDb {
    FirestoreDb::new("test-project")
        .await
        .expect("Failed to connect to Firestore emulator")
}

// ─── Fake Identity Toolkit ───────────────────────────────────

/// In-process stand-in for the Identity Toolkit service.
#[derive(Default)]
#[allow(dead_code)]
pub struct FakeIdentity {
    pub users: Mutex<Vec<GitkitUser>>,
    /// Token string -> claims it validates to
    pub tokens: Mutex<HashMap<String, VerifiedToken>>,
    /// Email -> rejection message for uploads
    pub upload_rejections: Mutex<HashMap<String, String>>,
    /// Size of every uploaded batch, in call order
    pub upload_batches: Mutex<Vec<usize>>,
    pub upload_hashes: Mutex<Vec<HashOptions>>,
    /// Number of upcoming download calls that fail
    pub download_failures: AtomicUsize,
    pub download_calls: AtomicUsize,
    pub fail_delete: AtomicBool,
    pub oob_error: Mutex<Option<IdentityError>>,
    pub oob_requests: Mutex<Vec<OobRequest>>,
    pub validate_calls: AtomicUsize,
}

#[allow(dead_code)]
impl FakeIdentity {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn add_user(&self, local_id: &str, email: &str, name: &str) -> GitkitUser {
        let user = GitkitUser {
            local_id: local_id.to_string(),
            email: email.to_string(),
            display_name: Some(name.to_string()),
            email_verified: true,
            ..Default::default()
        };
        self.users.lock().unwrap().push(user.clone());
        user
    }

    /// Register `token` as a valid identity token for `local_id`.
    pub fn issue_token(&self, token: &str, local_id: &str, audience: &str, issued_at: DateTime<Utc>) {
        let email = self
            .find(|u| u.local_id == local_id)
            .map(|u| u.email)
            .unwrap_or_default();
        self.tokens.lock().unwrap().insert(
            token.to_string(),
            VerifiedToken {
                local_id: local_id.to_string(),
                email,
                email_verified: true,
                display_name: None,
                provider_id: Some("google.com".to_string()),
                audience: audience.to_string(),
                issued_at,
            },
        );
    }

    pub fn find(&self, pred: impl Fn(&GitkitUser) -> bool) -> Option<GitkitUser> {
        self.users.lock().unwrap().iter().find(|u| pred(u)).cloned()
    }

    pub fn user_count(&self) -> usize {
        self.users.lock().unwrap().len()
    }
}

#[async_trait]
impl IdentityToolkit for FakeIdentity {
    async fn validate_token(
        &self,
        token: &str,
        audiences: &[String],
    ) -> Result<VerifiedToken, IdentityError> {
        self.validate_calls.fetch_add(1, Ordering::SeqCst);
        let tokens = self.tokens.lock().unwrap();
        match tokens.get(token) {
            Some(t) if audiences.contains(&t.audience) => Ok(t.clone()),
            Some(_) => Err(IdentityError::InvalidToken("audience mismatch".to_string())),
            None => Err(IdentityError::InvalidToken("unknown token".to_string())),
        }
    }

    async fn user_by_local_id(&self, local_id: &str) -> Result<GitkitUser, IdentityError> {
        self.find(|u| u.local_id == local_id)
            .ok_or_else(|| IdentityError::NotFound(local_id.to_string()))
    }

    async fn user_by_email(&self, email: &str) -> Result<GitkitUser, IdentityError> {
        self.find(|u| u.email == email)
            .ok_or_else(|| IdentityError::NotFound(email.to_string()))
    }

    async fn user_by_token(&self, token: &str) -> Result<GitkitUser, IdentityError> {
        let local_id = self
            .tokens
            .lock()
            .unwrap()
            .get(token)
            .map(|t| t.local_id.clone())
            .ok_or_else(|| IdentityError::InvalidToken("unknown token".to_string()))?;
        self.user_by_local_id(&local_id).await
    }

    async fn update_user(&self, user: &GitkitUser) -> Result<(), IdentityError> {
        let mut users = self.users.lock().unwrap();
        let existing = users
            .iter_mut()
            .find(|u| u.local_id == user.local_id)
            .ok_or_else(|| IdentityError::NotFound(user.local_id.clone()))?;

        let mut updated = user.clone();
        if let Some(password) = updated.password.take() {
            updated.password_hash = Some(format!("hashed:{password}").into_bytes());
            updated.salt = Some(b"fresh-salt".to_vec());
        }
        *existing = updated;
        Ok(())
    }

    async fn delete_user(&self, local_id: &str) -> Result<(), IdentityError> {
        if self.fail_delete.load(Ordering::SeqCst) {
            return Err(IdentityError::Api {
                status: 500,
                message: "backend unavailable".to_string(),
            });
        }
        let mut users = self.users.lock().unwrap();
        let before = users.len();
        users.retain(|u| u.local_id != local_id);
        if users.len() == before {
            return Err(IdentityError::NotFound(local_id.to_string()));
        }
        Ok(())
    }

    async fn upload_users(
        &self,
        batch: &[GitkitUser],
        hash: &HashOptions,
    ) -> Result<(), IdentityError> {
        self.upload_batches.lock().unwrap().push(batch.len());
        self.upload_hashes.lock().unwrap().push(hash.clone());

        let rejections = self.upload_rejections.lock().unwrap();
        let mut failures = Vec::new();
        let mut users = self.users.lock().unwrap();
        for (index, user) in batch.iter().enumerate() {
            match rejections.get(&user.email) {
                Some(message) => failures.push(UploadFailure {
                    index,
                    message: message.clone(),
                }),
                None => users.push(user.clone()),
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(IdentityError::Upload(failures))
        }
    }

    async fn download_users(
        &self,
        page_token: Option<&str>,
        max_results: u32,
    ) -> Result<UserPage, IdentityError> {
        self.download_calls.fetch_add(1, Ordering::SeqCst);
        let remaining_failures = self.download_failures.load(Ordering::SeqCst);
        if remaining_failures > 0 {
            self.download_failures
                .store(remaining_failures - 1, Ordering::SeqCst);
            return Err(IdentityError::Transport("connection reset".to_string()));
        }

        let users = self.users.lock().unwrap();
        let start: usize = page_token.and_then(|t| t.parse().ok()).unwrap_or(0);
        let end = (start + max_results as usize).min(users.len());
        let page = users.get(start..end).unwrap_or_default().to_vec();
        let next_page_token = (end < users.len()).then(|| end.to_string());

        Ok(UserPage {
            users: page,
            next_page_token,
        })
    }

    async fn generate_oob_code(&self, request: &OobRequest) -> Result<OobCode, IdentityError> {
        self.oob_requests.lock().unwrap().push(request.clone());
        if let Some(err) = self.oob_error.lock().unwrap().clone() {
            return Err(err);
        }
        Ok(OobCode {
            action: request.action,
            email: request.email.clone(),
            new_email: request.new_email.clone(),
            code: "oob-code-123".to_string(),
        })
    }
}

// ─── Recording Mailer ────────────────────────────────────────

#[derive(Default)]
#[allow(dead_code)]
pub struct RecordingMailer {
    pub sent: Mutex<Vec<Message>>,
    pub fail: AtomicBool,
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, message: &Message) -> Result<(), MailError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(MailError::Rejected {
                status: 503,
                body: "relay down".to_string(),
            });
        }
        self.sent.lock().unwrap().push(message.clone());
        Ok(())
    }
}

// ─── Test App ────────────────────────────────────────────────

#[allow(dead_code)]
pub struct TestApp {
    pub router: axum::Router,
    pub state: Arc<AppState>,
    pub identity: Arc<FakeIdentity>,
    pub mailer: Arc<RecordingMailer>,
    pub store: Arc<MemoryStore>,
}

/// Create a test app with in-process fakes for every collaborator.
#[allow(dead_code)]
pub fn create_test_app() -> TestApp {
    let config = Config::test_default();
    let identity = FakeIdentity::new();
    let mailer = Arc::new(RecordingMailer::default());
    let store = Arc::new(MemoryStore::new());

    let state = Arc::new(AppState {
        config,
        preferences: PreferenceService::new(store.clone()),
        identity: identity.clone(),
        mailer: mailer.clone(),
    });

    TestApp {
        router: create_router(state.clone()),
        state,
        identity,
        mailer,
        store,
    }
}

#[allow(dead_code)]
impl TestApp {
    /// A registered user with a session cookie value.
    pub fn signed_in_user(&self, local_id: &str, email: &str) -> (User, String) {
        let user = User::from(self.identity.add_user(local_id, email, "Test User"));
        let session = favweekday::middleware::session::encode_session(
            &user,
            &self.state.config.session_key,
        )
        .unwrap();
        (user, format!("SESSIONID={session}"))
    }
}

#[allow(dead_code)]
pub fn get(uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::empty()).unwrap()
}

#[allow(dead_code)]
pub fn post_form(uri: &str, cookie: Option<&str>, body: &str) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

#[allow(dead_code)]
pub fn set_cookie_headers(response: &Response) -> Vec<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .map(|value| value.to_str().unwrap().to_string())
        .collect()
}

#[allow(dead_code)]
pub fn find_cookie(headers: &[String], name: &str) -> Option<String> {
    headers
        .iter()
        .find(|value| value.starts_with(&format!("{name}=")))
        .cloned()
}

#[allow(dead_code)]
pub async fn body_string(response: Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}
