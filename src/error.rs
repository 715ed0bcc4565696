// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Storage error type.
//!
//! Workflow handlers never surface this: preference lookups log it and fall
//! back to the default weekday.

/// Error produced by a preference store backend.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(String),
}
