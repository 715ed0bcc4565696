// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Favourite-weekday persistence.
//!
//! Storage failures never reach the user: reads fall back to Sunday and
//! writes are logged and dropped.

use crate::error::AppError;
use crate::models::{FavWeekday, User};
use async_trait::async_trait;
use std::sync::Arc;

/// Storage backend for favourite-weekday records, keyed by user ID.
#[async_trait]
pub trait PreferenceStore: Send + Sync {
    async fn get_favorite(&self, user_id: &str) -> Result<Option<FavWeekday>, AppError>;

    /// Create or replace the record.
    async fn set_favorite(&self, record: &FavWeekday) -> Result<(), AppError>;

    async fn delete_favorite(&self, user_id: &str) -> Result<(), AppError>;
}

/// Reads and writes a user's favourite weekday.
#[derive(Clone)]
pub struct PreferenceService {
    store: Arc<dyn PreferenceStore>,
}

impl PreferenceService {
    pub fn new(store: Arc<dyn PreferenceStore>) -> Self {
        Self { store }
    }

    /// Stored weekday for `user`, or Sunday (0) if there is none.
    pub async fn weekday_for_user(&self, user: &User) -> i64 {
        match self.store.get_favorite(&user.id).await {
            Ok(Some(record)) => record.weekday,
            Ok(None) => FavWeekday::DEFAULT_INDEX,
            Err(e) => {
                tracing::error!(user_id = %user.id, error = %e, "Failed to load favourite weekday");
                FavWeekday::DEFAULT_INDEX
            }
        }
    }

    /// Store `weekday` for `user`. Out-of-range values are logged but kept.
    pub async fn update_weekday_for_user(&self, user: &User, weekday: i64) {
        let record = FavWeekday::new(user.id.clone(), weekday);
        if record.day().is_none() {
            tracing::warn!(user_id = %user.id, weekday, "Storing out-of-range weekday");
        }

        if let Err(e) = self.store.set_favorite(&record).await {
            tracing::error!(user_id = %user.id, error = %e, "Failed to store favourite weekday");
        }
    }

    /// Drop the record of a deleted account.
    pub async fn forget_user(&self, user: &User) {
        if let Err(e) = self.store.delete_favorite(&user.id).await {
            tracing::error!(user_id = %user.id, error = %e, "Failed to delete favourite weekday");
        }
    }
}
