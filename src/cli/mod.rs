// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! `gitkitcli`: administer Identity Toolkit accounts from the command line.

pub mod args;
pub mod commands;
pub mod users;

pub use args::{Cli, Command};
pub use commands::{execute, CommandContext, Prompter, TerminalPrompter};

use crate::config::{CliConfig, DEFAULT_TOKEN_ISSUERS, DEFAULT_TOKEN_JWKS_URL};
use crate::services::gitkit::{GitkitClient, GitkitSettings};
use std::io;

/// Load configuration, connect, and run the selected command against the
/// process's stdio.
pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = CliConfig::load(cli.config_file.as_deref())?
        .with_overrides(cli.client_id, cli.google_app_credentials_path);

    let client = GitkitClient::new(GitkitSettings {
        credentials_path: config.google_app_credentials_path.clone(),
        token_jwks_url: DEFAULT_TOKEN_JWKS_URL.to_string(),
        token_issuers: DEFAULT_TOKEN_ISSUERS.iter().map(|s| s.to_string()).collect(),
    })
    .await?;

    let mut stdout = io::stdout().lock();
    let mut stderr = io::stderr().lock();
    let mut prompter = TerminalPrompter;
    let mut ctx = CommandContext {
        identity: &client,
        client_id: &config.client_id,
        prompter: &mut prompter,
        out: &mut stdout,
        err: &mut stderr,
    };

    execute(&mut ctx, &cli.command).await
}
