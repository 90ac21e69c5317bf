// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Aggregated profile view.

use super::UserRecord;

/// What the profile screen shows: the user's record plus the live goal
/// count. The two halves come from independent subscriptions.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProfileView {
    pub user: Option<UserRecord>,
    pub goal_count: usize,
}

/// One incoming change to a [`ProfileView`].
#[derive(Debug, Clone, PartialEq)]
pub enum ProfileUpdate {
    /// New user document snapshot (`None` when it does not exist)
    User(Option<UserRecord>),
    /// New cardinality of the owner's goal query
    GoalCount(usize),
}

impl ProfileView {
    /// Apply an update to its own slot only.
    ///
    /// A missing user document keeps whatever was shown before.
    pub fn apply(&mut self, update: ProfileUpdate) {
        match update {
            ProfileUpdate::User(Some(user)) => self.user = Some(user),
            ProfileUpdate::User(None) => {}
            ProfileUpdate::GoalCount(count) => self.goal_count = count,
        }
    }
}
