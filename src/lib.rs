// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! FavWeekday: remember each user's favourite day of the week.
//!
//! Sign-in and account management are delegated to the Google Identity
//! Toolkit; this crate provides the web application and the `gitkitcli`
//! administration tool that share one client for that service.

pub mod cli;
pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;

use config::Config;
use services::{IdentityToolkit, Mailer, PreferenceService};
use std::sync::Arc;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub preferences: PreferenceService,
    pub identity: Arc<dyn IdentityToolkit>,
    pub mailer: Arc<dyn Mailer>,
}
