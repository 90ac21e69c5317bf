// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! User model for storage and signup.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::AppError;

/// User profile stored in Firestore (`users/{uid}`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    pub first_name: String,
    /// Middle initial, empty when not given
    #[serde(rename = "mi", default)]
    pub middle_initial: String,
    pub last_name: String,
    pub username: String,
    #[serde(default)]
    pub bio: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
    /// Download URL of the profile photo
    #[serde(rename = "photoURL", default, skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
}

impl UserRecord {
    /// "First M. Last", or "First Last" without a middle initial.
    pub fn display_name(&self) -> String {
        let mi = self.middle_initial.trim();
        if mi.is_empty() {
            format!("{} {}", self.first_name, self.last_name)
        } else {
            format!("{} {}. {}", self.first_name, mi, self.last_name)
        }
    }

    pub fn bio_or_default(&self) -> &str {
        if self.bio.trim().is_empty() {
            "No bio yet"
        } else {
            &self.bio
        }
    }
}

/// Signup form as submitted by the client.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase", default)]
pub struct SignupForm {
    #[validate(length(min = 1))]
    pub first_name: String,
    #[serde(rename = "mi")]
    pub middle_initial: String,
    #[validate(length(min = 1))]
    pub last_name: String,
    pub bio: String,
    #[validate(length(min = 1))]
    pub username: String,
    #[validate(length(min = 1))]
    pub email: String,
    #[validate(length(min = 1))]
    pub password: String,
    #[validate(length(min = 1))]
    pub confirm_password: String,
}

impl SignupForm {
    /// Presence checks first, then password confirmation.
    ///
    /// Runs before any backend call.
    pub fn check(&self) -> Result<(), AppError> {
        if self.validate().is_err() {
            return Err(AppError::Validation(
                "Please fill in all required fields.".to_string(),
            ));
        }
        if self.password != self.confirm_password {
            return Err(AppError::Validation("Passwords do not match.".to_string()));
        }
        Ok(())
    }

    /// The record written to `users/{uid}` once the account exists.
    pub fn to_record(&self, created_at: DateTime<Utc>) -> UserRecord {
        UserRecord {
            first_name: self.first_name.clone(),
            middle_initial: self.middle_initial.clone(),
            last_name: self.last_name.clone(),
            username: self.username.clone(),
            bio: self.bio.clone(),
            email: self.email.clone(),
            created_at,
            photo_url: None,
        }
    }
}
