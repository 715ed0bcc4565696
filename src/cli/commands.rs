// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! The `gitkitcli` subcommands.

use super::args::Command;
use super::users::{
    generate_user, random_key_and_salt, system_random, user_by_identifier, BatchReader,
    TokenInfo, CREATE_USER_ALGORITHM,
};
use crate::services::identity::{
    GitkitUser, HashOptions, IdentityError, IdentityToolkit, URL_SAFE_LENIENT,
};
use anyhow::Context as _;
use base64::Engine as _;
use serde::Serialize;
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::Path;

/// Accounts per `uploadAccount` call.
pub const UPLOAD_BATCH_SIZE: usize = 20;

/// Accounts per `downloadAccount` page.
pub const DOWNLOAD_PAGE_SIZE: u32 = 50;

/// Listing errors tolerated over a whole `downloadusers` run.
pub const MAX_DOWNLOAD_RETRIES: usize = 5;

/// Source of interactive input.
pub trait Prompter {
    fn read_line(&mut self, prompt: &str) -> io::Result<String>;

    /// Read a secret without echoing it.
    fn read_password(&mut self, prompt: &str) -> io::Result<String>;
}

/// Reads from the controlling terminal.
pub struct TerminalPrompter;

impl Prompter for TerminalPrompter {
    fn read_line(&mut self, prompt: &str) -> io::Result<String> {
        let mut stdout = io::stdout();
        write!(stdout, "{prompt}")?;
        stdout.flush()?;

        let mut line = String::new();
        io::stdin().lock().read_line(&mut line)?;
        Ok(line)
    }

    fn read_password(&mut self, prompt: &str) -> io::Result<String> {
        rpassword::prompt_password(prompt)
    }
}

/// Everything a command needs to run.
pub struct CommandContext<'a> {
    pub identity: &'a dyn IdentityToolkit,
    pub client_id: &'a str,
    pub prompter: &'a mut dyn Prompter,
    pub out: &'a mut dyn Write,
    /// Status lines that must not mix with data written to `out`
    pub err: &'a mut dyn Write,
}

pub async fn execute(ctx: &mut CommandContext<'_>, command: &Command) -> anyhow::Result<()> {
    match command {
        Command::ValidateToken { token } => validate_token(ctx, token).await,
        Command::GetUser { identifier } => get_user(ctx, identifier).await,
        Command::UpdateUser {
            identifier,
            name,
            password,
            email_verified,
        } => update_user(ctx, identifier, name.as_deref(), *password, *email_verified).await,
        Command::DeleteUser { identifier } => delete_user(ctx, identifier).await,
        Command::CreateUser => create_user(ctx).await,
        Command::UploadUsers {
            algorithm,
            hash_key,
            salt_separator,
            file,
        } => upload_users(ctx, algorithm, hash_key, salt_separator.as_deref(), file).await,
        Command::DownloadUsers { output } => download_users(ctx, output.as_deref()).await,
    }
}

fn print_json<T: Serialize>(out: &mut dyn Write, heading: &str, value: &T) -> anyhow::Result<()> {
    writeln!(out, "{heading}")?;
    writeln!(out, "{}", serde_json::to_string_pretty(value)?)?;
    Ok(())
}

async fn validate_token(ctx: &mut CommandContext<'_>, token: &str) -> anyhow::Result<()> {
    let audiences = [ctx.client_id.to_string()];
    let verified = ctx.identity.validate_token(token, &audiences).await?;

    let info = TokenInfo {
        local_id: verified.local_id,
        email: verified.email,
        email_verified: verified.email_verified,
        provider_id: verified.provider_id,
    };
    print_json(ctx.out, ">> token info:", &info)
}

async fn get_user(ctx: &mut CommandContext<'_>, identifier: &str) -> anyhow::Result<()> {
    let user = user_by_identifier(ctx.identity, ctx.client_id, identifier).await?;
    print_json(ctx.out, ">> user info:", &user)
}

async fn update_user(
    ctx: &mut CommandContext<'_>,
    identifier: &str,
    name: Option<&str>,
    password: bool,
    email_verified: Option<bool>,
) -> anyhow::Result<()> {
    let mut user = user_by_identifier(ctx.identity, ctx.client_id, identifier).await?;

    if let Some(name) = name {
        user.display_name = Some(name.to_string());
    }

    let mut password_changed = false;
    if password {
        let new_password = ctx.prompter.read_password("New password: ")?;
        if !new_password.is_empty() {
            user.password = Some(new_password);
            password_changed = true;
        }
    }

    if let Some(verified) = email_verified {
        user.email_verified = verified;
    }

    ctx.identity.update_user(&user).await?;

    // The service computes a fresh hash and salt for the new password.
    if password_changed {
        user = ctx.identity.user_by_local_id(&user.local_id).await?;
    }

    print_json(ctx.out, ">> user updated:", &user)
}

async fn delete_user(ctx: &mut CommandContext<'_>, identifier: &str) -> anyhow::Result<()> {
    let user = user_by_identifier(ctx.identity, ctx.client_id, identifier).await?;
    ctx.identity.delete_user(&user.local_id).await?;
    print_json(ctx.out, ">> user deleted:", &user)
}

async fn create_user(ctx: &mut CommandContext<'_>) -> anyhow::Result<()> {
    let rng = system_random();
    let (key, salt) = random_key_and_salt(&rng)?;

    let line = ctx.prompter.read_line("Email: ")?;
    let email = line.split_whitespace().next().unwrap_or_default().to_string();
    let password = ctx.prompter.read_password("Password: ")?;

    let user = generate_user(&rng, &email, &password, &key, &salt)?;
    let hash = HashOptions {
        algorithm: CREATE_USER_ALGORITHM.to_string(),
        key,
        salt_separator: Vec::new(),
    };
    ctx.identity.upload_users(&[user], &hash).await?;

    let user = user_by_identifier(ctx.identity, ctx.client_id, &email).await?;
    print_json(ctx.out, ">> user created:", &user)
}

async fn upload_users(
    ctx: &mut CommandContext<'_>,
    algorithm: &str,
    hash_key: &str,
    salt_separator: Option<&str>,
    path: &Path,
) -> anyhow::Result<()> {
    let key = URL_SAFE_LENIENT
        .decode(hash_key)
        .context("--hash_key is not URL-safe base64")?;
    let salt_separator = match salt_separator {
        Some(s) => URL_SAFE_LENIENT
            .decode(s)
            .context("--salt_separator is not URL-safe base64")?,
        None => Vec::new(),
    };
    let hash = HashOptions {
        algorithm: algorithm.to_string(),
        key,
        salt_separator,
    };

    let file = File::open(path).with_context(|| format!("cannot open {}", path.display()))?;
    let mut reader = BatchReader::<_, GitkitUser>::new(BufReader::new(file), UPLOAD_BATCH_SIZE);

    loop {
        let batch = reader.next_batch()?;
        if batch.is_empty() {
            break;
        }

        match ctx.identity.upload_users(&batch, &hash).await {
            Ok(()) => {}
            Err(IdentityError::Upload(failures)) => {
                for failure in failures {
                    let email = batch
                        .get(failure.index)
                        .map(|u| u.email.as_str())
                        .unwrap_or("<unknown>");
                    writeln!(
                        ctx.out,
                        ">> failed to upload user {}: {}",
                        email, failure.message
                    )?;
                }
            }
            Err(e) => return Err(e.into()),
        }

        if batch.len() < UPLOAD_BATCH_SIZE {
            break;
        }
    }

    writeln!(ctx.out, ">> done")?;
    Ok(())
}

async fn download_users(ctx: &mut CommandContext<'_>, output: Option<&str>) -> anyhow::Result<()> {
    match output {
        None | Some("-") => {
            download_all(ctx.identity, &mut *ctx.out).await?;
            writeln!(ctx.err, ">> done")?;
        }
        Some(path) => {
            let file = create_private_file(Path::new(path))
                .with_context(|| format!("cannot create {path}"))?;
            let mut writer = BufWriter::new(file);
            download_all(ctx.identity, &mut writer).await?;
            writer.flush()?;
            writeln!(ctx.out, ">> done")?;
        }
    }
    Ok(())
}

/// Write every account as one JSON object per line.
async fn download_all(identity: &dyn IdentityToolkit, out: &mut dyn Write) -> anyhow::Result<()> {
    let mut page_token: Option<String> = None;
    let mut retries = 0;

    loop {
        let page = match identity
            .download_users(page_token.as_deref(), DOWNLOAD_PAGE_SIZE)
            .await
        {
            Ok(page) => page,
            Err(e) if retries < MAX_DOWNLOAD_RETRIES => {
                retries += 1;
                tracing::warn!(error = %e, retries, "Listing users failed, retrying");
                continue;
            }
            Err(e) => return Err(e.into()),
        };

        for user in &page.users {
            writeln!(out, "{}", serde_json::to_string(user)?)?;
        }

        match page.next_page_token {
            Some(token) if !token.is_empty() && !page.users.is_empty() => page_token = Some(token),
            _ => return Ok(()),
        }
    }
}

/// Create or truncate `path`, readable only by the owner.
fn create_private_file(path: &Path) -> io::Result<File> {
    let mut options = std::fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    options.open(path)
}
