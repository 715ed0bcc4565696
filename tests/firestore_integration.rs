// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore integration tests.
//!
//! These tests require the Firestore emulator to be running
//! (FIRESTORE_EMULATOR_HOST); they are skipped otherwise.

use favweekday::models::{FavWeekday, User};
use favweekday::services::{PreferenceService, PreferenceStore};
use std::sync::Arc;

mod common;
use common::test_db;

/// Unique user ID for test isolation.
fn unique_user_id() -> String {
    use std::time::{SystemTime, UNIX_EPOCH};
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    format!("test-user-{nanos}")
}

#[tokio::test]
async fn test_favorite_round_trip() {
    require_emulator!();

    let db = test_db().await;
    let user_id = unique_user_id();

    assert!(db.get_favorite(&user_id).await.unwrap().is_none());

    db.set_favorite(&FavWeekday::new(user_id.clone(), 2))
        .await
        .unwrap();
    db.set_favorite(&FavWeekday::new(user_id.clone(), 6))
        .await
        .unwrap();

    let record = db.get_favorite(&user_id).await.unwrap().unwrap();
    assert_eq!(record, FavWeekday::new(user_id.clone(), 6));

    db.delete_favorite(&user_id).await.unwrap();
    assert!(db.get_favorite(&user_id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_preference_service_on_firestore() {
    require_emulator!();

    let service = PreferenceService::new(Arc::new(test_db().await));
    let user = User {
        id: unique_user_id(),
        email: "emulator@example.com".to_string(),
        name: "Emulator".to_string(),
        email_verified: true,
    };

    assert_eq!(service.weekday_for_user(&user).await, 0);
    service.update_weekday_for_user(&user, 5).await;
    assert_eq!(service.weekday_for_user(&user).await, 5);
    service.forget_user(&user).await;
    assert_eq!(service.weekday_for_user(&user).await, 0);
}
