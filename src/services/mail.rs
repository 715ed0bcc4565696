// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Transactional email for out-of-band account actions.

use crate::services::identity::{OobAction, OobCode};
use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;

/// An outgoing HTML email.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub sender: String,
    pub to: Vec<String>,
    pub subject: String,
    pub html_body: String,
}

#[derive(Debug, thiserror::Error)]
pub enum MailError {
    #[error("mail relay request failed: {0}")]
    Transport(String),

    #[error("mail relay rejected message (HTTP {status}): {body}")]
    Rejected { status: u16, body: String },
}

/// Mail delivery backend.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: &Message) -> Result<(), MailError>;
}

/// Delivers mail by POSTing JSON to an HTTP relay.
pub struct HttpMailer {
    http: reqwest::Client,
    relay_url: String,
}

impl HttpMailer {
    pub fn new(relay_url: impl Into<String>) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            http,
            relay_url: relay_url.into(),
        })
    }
}

#[async_trait]
impl Mailer for HttpMailer {
    async fn send(&self, message: &Message) -> Result<(), MailError> {
        let response = self
            .http
            .post(&self.relay_url)
            .json(message)
            .send()
            .await
            .map_err(|e| MailError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MailError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        tracing::info!(to = ?message.to, subject = %message.subject, "Mail sent");
        Ok(())
    }
}

/// Logs mail instead of sending it (local development).
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, message: &Message) -> Result<(), MailError> {
        tracing::info!(
            to = ?message.to,
            subject = %message.subject,
            body = %message.html_body,
            "Mail delivery disabled, message logged"
        );
        Ok(())
    }
}

// ─── Templates ───────────────────────────────────────────────

/// Build the email for an OOB code; `link` is the confirmation URL.
pub fn oob_message(sender: &str, code: &OobCode, link: &str) -> Message {
    let email = escape_html(&code.email);
    let link = escape_html(link);

    let (to, subject, html_body) = match code.action {
        OobAction::ResetPassword => (
            code.email.clone(),
            "Reset your FavWeekday account password",
            format!(
                "<p>Dear user,</p>\n\
                 <p>\n\
                 Forgot your password?<br>\n\
                 FavWeekday received a request to reset the password for your account <b>{email}</b>.<br>\n\
                 To reset your password, click on the link below (or copy and paste the URL into your browser):<br>\n\
                 <a href=\"{link}\">{link}</a><br>\n\
                 </p>\n\
                 <p>FavWeekday Support</p>"
            ),
        ),
        OobAction::ChangeEmail => {
            let new_email = code.new_email.clone().unwrap_or_default();
            let new_email_html = escape_html(&new_email);
            (
                new_email,
                "FavWeekday account email address change confirmation",
                format!(
                    "<p>Dear user,</p>\n\
                     <p>\n\
                     Want to use another email address to sign into FavWeekday?<br>\n\
                     FavWeekday received a request to change your account email address from {email} to <b>{new_email_html}</b>.<br>\n\
                     To change your account email address, click on the link below (or copy and paste the URL into your browser):<br>\n\
                     <a href=\"{link}\">{link}</a><br>\n\
                     </p>\n\
                     <p>FavWeekday Support</p>"
                ),
            )
        }
        OobAction::VerifyEmail => (
            code.email.clone(),
            "FavWeekday account registration confirmation",
            format!(
                "<p>Dear user,</p>\n\
                 <p>Thank you for creating an account on FavWeekday.</p>\n\
                 <p>To verify your account email address, click on the link below (or copy and paste the URL into your browser):</p>\n\
                 <p><a href=\"{link}\">{link}</a></p>\n\
                 <br>\n\
                 <p>FavWeekday Support</p>"
            ),
        ),
    };

    Message {
        sender: sender.to_string(),
        to: vec![to],
        subject: subject.to_string(),
        html_body,
    }
}

/// Minimal HTML escaping for text and attribute values.
pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
