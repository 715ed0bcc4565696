// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// gitkitcli - command line tool for Google Identity Toolkit service
#[derive(Parser, Debug)]
#[command(name = "gitkitcli")]
#[command(version)]
#[command(about = "Command line tool for Google Identity Toolkit service", long_about = None)]
pub struct Cli {
    /// JSON configuration file; its values can be overridden by the flags below
    #[arg(long = "config_file", env = "GITKIT_CONFIG_FILE", global = true)]
    pub config_file: Option<PathBuf>,

    /// Client ID of the web server
    #[arg(long = "client_id", global = true)]
    pub client_id: Option<String>,

    /// JSON key file of the Google service account
    #[arg(long = "google_app_credentials_path", global = true)]
    pub google_app_credentials_path: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Validate an ID token and print the account information it carries
    #[command(name = "validatetoken")]
    ValidateToken {
        #[arg(value_name = "ID_TOKEN")]
        token: String,
    },

    /// Get the account of the user given by email, local ID or ID token
    #[command(name = "getuser")]
    GetUser {
        #[arg(value_name = "EMAIL|LOCAL_ID|ID_TOKEN")]
        identifier: String,
    },

    /// Update the account of the user given by email, local ID or ID token
    #[command(name = "updateuser")]
    UpdateUser {
        #[arg(value_name = "EMAIL|LOCAL_ID|ID_TOKEN")]
        identifier: String,

        /// New display name
        #[arg(long = "name")]
        name: Option<String>,

        /// Prompt for a new password
        #[arg(long = "password")]
        password: bool,

        /// Mark the email address verified (or not, with =false)
        #[arg(
            long = "email_verified",
            num_args = 0..=1,
            default_missing_value = "true",
            require_equals = true
        )]
        email_verified: Option<bool>,
    },

    /// Delete the user given by email, local ID or ID token
    #[command(name = "deleteuser")]
    DeleteUser {
        #[arg(value_name = "EMAIL|LOCAL_ID|ID_TOKEN")]
        identifier: String,
    },

    /// Create an account; email and password are prompted for
    #[command(name = "createuser")]
    CreateUser,

    /// Upload the accounts in a JSON file
    #[command(name = "uploadusers")]
    UploadUsers {
        /// Password hash algorithm name
        #[arg(long = "algorithm")]
        algorithm: String,

        /// URL-safe base64 hash key
        #[arg(long = "hash_key")]
        hash_key: String,

        /// URL-safe base64 salt separator
        #[arg(long = "salt_separator")]
        salt_separator: Option<String>,

        #[arg(value_name = "USERS_FILE")]
        file: PathBuf,
    },

    /// Download all accounts to a file, or standard output for `-`
    #[command(name = "downloadusers")]
    DownloadUsers {
        #[arg(value_name = "OUTPUT")]
        output: Option<String>,
    },
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::ValidateToken { .. } => "validatetoken",
            Command::GetUser { .. } => "getuser",
            Command::UpdateUser { .. } => "updateuser",
            Command::DeleteUser { .. } => "deleteuser",
            Command::CreateUser => "createuser",
            Command::UploadUsers { .. } => "uploadusers",
            Command::DownloadUsers { .. } => "downloadusers",
        }
    }
}
