// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod gitkit;
pub mod identity;
pub mod mail;
pub mod preference;
pub mod token_verifier;
pub mod xsrf;

pub use gitkit::{GitkitClient, GitkitSettings};
pub use identity::{GitkitUser, IdentityError, IdentityToolkit, OobAction, OobCode, OobRequest};
pub use mail::{HttpMailer, LogMailer, MailError, Mailer, Message};
pub use preference::{PreferenceService, PreferenceStore};
pub use token_verifier::TokenVerifier;
