// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-process preference store for local development and tests.

use crate::error::AppError;
use crate::models::FavWeekday;
use crate::services::preference::PreferenceStore;
use async_trait::async_trait;
use dashmap::DashMap;

#[derive(Debug, Default)]
pub struct MemoryStore {
    records: DashMap<String, FavWeekday>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait]
impl PreferenceStore for MemoryStore {
    async fn get_favorite(&self, user_id: &str) -> Result<Option<FavWeekday>, AppError> {
        Ok(self.records.get(user_id).map(|r| r.value().clone()))
    }

    async fn set_favorite(&self, record: &FavWeekday) -> Result<(), AppError> {
        self.records.insert(record.id.clone(), record.clone());
        Ok(())
    }

    async fn delete_favorite(&self, user_id: &str) -> Result<(), AppError> {
        self.records.remove(user_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_one_record_per_user() {
        let store = MemoryStore::new();
        store.set_favorite(&FavWeekday::new("u1", 1)).await.unwrap();
        store.set_favorite(&FavWeekday::new("u1", 2)).await.unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(
            store.get_favorite("u1").await.unwrap(),
            Some(FavWeekday::new("u1", 2))
        );

        store.delete_favorite("u1").await.unwrap();
        store.delete_favorite("missing").await.unwrap();
        assert!(store.is_empty());
    }
}
