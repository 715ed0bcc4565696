// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! FavWeekday web server.

use favweekday::{
    config::{Config, PreferenceBackend},
    db::{FirestoreDb, MemoryStore},
    services::{
        GitkitClient, GitkitSettings, HttpMailer, LogMailer, Mailer, PreferenceService,
        PreferenceStore,
    },
    AppState,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Structured JSON logging for GCP
    init_logging();

    let config = Config::from_env()?;
    tracing::info!(port = config.port, "Starting FavWeekday");

    let store: Arc<dyn PreferenceStore> = match config.preference_backend {
        PreferenceBackend::Firestore => Arc::new(FirestoreDb::new(&config.gcp_project_id).await?),
        PreferenceBackend::Memory => {
            tracing::warn!("Using in-memory preference store; data is lost on restart");
            Arc::new(MemoryStore::new())
        }
    };

    let identity = GitkitClient::new(GitkitSettings {
        credentials_path: config.google_app_credentials_path.clone(),
        token_jwks_url: config.token_jwks_url.clone(),
        token_issuers: config.token_issuers.clone(),
    })
    .await?;

    let mailer: Arc<dyn Mailer> = match &config.mail_relay_url {
        Some(url) => {
            tracing::info!(relay = %url, "Mail relay configured");
            Arc::new(HttpMailer::new(url.clone())?)
        }
        None => {
            tracing::warn!("MAIL_RELAY_URL not set; outgoing mail will only be logged");
            Arc::new(LogMailer)
        }
    };

    let state = Arc::new(AppState {
        config: config.clone(),
        preferences: PreferenceService::new(store),
        identity: Arc::new(identity),
        mailer,
    });

    let app = favweekday::routes::create_router(state);

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging (GCP-compliant).
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,favweekday=debug"));

    tracing_subscriber::registry()
        .with(filter)
        .with(format)
        .init();
}
