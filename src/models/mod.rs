// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod preference;
pub mod user;

pub use preference::{FavWeekday, WEEKDAYS};
pub use user::User;
