// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Goal model for storage and API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::db::StoredDocument;
use crate::error::AppError;

/// Goal fields stored in Firestore (`goals/{generated id}`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoalRecord {
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// Owning user's identity id (query filter field)
    pub user_id: String,
    pub created_at: DateTime<Utc>,
}

/// A stored goal with its document id.
#[derive(Debug, Clone, PartialEq)]
pub struct Goal {
    pub id: String,
    pub title: String,
    pub description: String,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
}

impl Goal {
    pub fn from_record(id: String, record: GoalRecord) -> Self {
        Self {
            id,
            title: record.title,
            description: record.description,
            user_id: record.user_id,
            created_at: record.created_at,
        }
    }

    pub fn from_stored(doc: &StoredDocument) -> Result<Self, AppError> {
        Ok(Self::from_record(doc.id.clone(), doc.decode()?))
    }
}

/// Goal creation request.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(default)]
pub struct NewGoal {
    #[validate(length(min = 1, message = "Please enter a title"))]
    pub title: String,
    pub description: String,
}

impl NewGoal {
    pub fn new(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
        }
    }

    /// Trim the title and reject it when nothing is left.
    pub fn normalized(mut self) -> Result<Self, AppError> {
        self.title = self.title.trim().to_string();
        self.validate()
            .map_err(|_| AppError::Validation("Please enter a title".to_string()))?;
        Ok(self)
    }

    pub fn into_record(self, user_id: &str, created_at: DateTime<Utc>) -> GoalRecord {
        GoalRecord {
            title: self.title,
            description: self.description,
            user_id: user_id.to_string(),
            created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_title_rejected() {
        assert!(NewGoal::new("   ", "desc").normalized().is_err());
        assert!(NewGoal::new("", "").normalized().is_err());
    }

    #[test]
    fn test_title_trimmed() {
        let goal = NewGoal::new("  Learn Rust ", "").normalized().unwrap();
        assert_eq!(goal.title, "Learn Rust");
    }

    #[test]
    fn test_record_wire_format() {
        let record = NewGoal::new("Read", "Twelve books")
            .into_record("u1", Utc::now());
        let value = serde_json::to_value(&record).unwrap();

        assert_eq!(value["userId"], "u1");
        assert_eq!(value["description"], "Twelve books");
        assert!(value.get("createdAt").is_some());
    }

    #[test]
    fn test_missing_description_defaults_empty() {
        let record: GoalRecord = serde_json::from_value(serde_json::json!({
            "title": "Run",
            "userId": "u1",
            "createdAt": "2025-01-01T00:00:00Z",
        }))
        .unwrap();
        assert_eq!(record.description, "");
    }
}
