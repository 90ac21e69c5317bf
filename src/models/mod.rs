// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Data models for the application.

pub mod goal;
pub mod profile;
pub mod user;

pub use goal::{Goal, GoalRecord, NewGoal};
pub use profile::{ProfileUpdate, ProfileView};
pub use user::{SignupForm, UserRecord};
