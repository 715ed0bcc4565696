// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Favourite weekday record.

use chrono::Weekday;
use serde::{Deserialize, Serialize};

/// Weekdays in index order; index 0 is Sunday.
pub const WEEKDAYS: [Weekday; 7] = [
    Weekday::Sun,
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
];

/// Favourite weekday stored in Firestore, keyed by user ID.
///
/// `weekday` is kept as the raw submitted integer. Values outside 0..=6 are
/// logged on update but still stored; see DESIGN.md.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FavWeekday {
    /// User ID (also used as document ID)
    pub id: String,
    /// 0 is Sunday.
    pub weekday: i64,
}

impl FavWeekday {
    /// Weekday returned when a user has no record.
    pub const DEFAULT_INDEX: i64 = 0;

    pub fn new(id: impl Into<String>, weekday: i64) -> Self {
        Self {
            id: id.into(),
            weekday,
        }
    }

    /// The weekday, if the stored index is one of the seven valid values.
    pub fn day(&self) -> Option<Weekday> {
        weekday_from_index(self.weekday)
    }
}

/// Map 0 (Sunday) ..= 6 (Saturday) to a weekday.
pub fn weekday_from_index(index: i64) -> Option<Weekday> {
    usize::try_from(index)
        .ok()
        .and_then(|i| WEEKDAYS.get(i))
        .copied()
}

/// English name of a weekday ("Sunday", ...).
pub fn weekday_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Sun => "Sunday",
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
    }
}
