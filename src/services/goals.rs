// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Goal repository: goal operations scoped to the `goals` collection.

use crate::db::{collections, fields, to_document, DocumentStore, FieldFilter, StoredDocument};
use crate::error::AppError;
use crate::models::{Goal, NewGoal};
use crate::snapshots::Snapshots;

/// Goal repository.
#[derive(Clone)]
pub struct GoalRepository {
    documents: DocumentStore,
}

impl GoalRepository {
    pub fn new(documents: DocumentStore) -> Self {
        Self { documents }
    }

    fn owner_filter(user_id: &str) -> FieldFilter {
        FieldFilter::eq(fields::USER_ID, user_id)
    }

    /// Store a new goal owned by `user_id` and return it once the write is
    /// acknowledged.
    ///
    /// The caller supplies a validated goal (see [`NewGoal::normalized`]).
    pub async fn create_goal(&self, user_id: &str, goal: NewGoal) -> Result<Goal, AppError> {
        let record = goal.into_record(user_id, chrono::Utc::now());
        let id = self
            .documents
            .add_document(collections::GOALS, &to_document(&record)?)
            .await?;

        tracing::info!(user_id, goal_id = %id, "Goal created");
        Ok(Goal::from_record(id, record))
    }

    /// All goals owned by `user_id`, in the store's default order.
    pub async fn fetch_goals(&self, user_id: &str) -> Result<Vec<Goal>, AppError> {
        let docs = self
            .documents
            .query(collections::GOALS, &Self::owner_filter(user_id))
            .await?;
        Ok(decode_goals(&docs))
    }

    pub async fn get_goal(&self, goal_id: &str) -> Result<Option<Goal>, AppError> {
        self.documents
            .get_document(collections::GOALS, goal_id)
            .await?
            .map(|doc| Goal::from_stored(&doc))
            .transpose()
    }

    /// Delete a goal on behalf of `requester`.
    ///
    /// Only the owner may delete a goal; anyone else gets `Forbidden`.
    pub async fn delete_goal(&self, goal_id: &str, requester: &str) -> Result<(), AppError> {
        let goal = self
            .get_goal(goal_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Goal {} not found", goal_id)))?;

        if goal.user_id != requester {
            tracing::warn!(
                goal_id,
                requester,
                owner = %goal.user_id,
                "Rejected delete of goal owned by another user"
            );
            return Err(AppError::Forbidden("Goal belongs to another user".to_string()));
        }

        self.documents
            .delete_document(collections::GOALS, goal_id)
            .await?;

        tracing::info!(user_id = requester, goal_id, "Goal deleted");
        Ok(())
    }

    /// Live list of the user's goals.
    pub fn watch_goals(&self, user_id: &str) -> Snapshots<Vec<Goal>> {
        self.documents
            .watch_query(collections::GOALS, Self::owner_filter(user_id))
            .map(|docs| decode_goals(&docs))
    }

    /// Live goal count: the cardinality of the user's goal query.
    pub fn watch_goal_count(&self, user_id: &str) -> Snapshots<usize> {
        self.documents
            .watch_query(collections::GOALS, Self::owner_filter(user_id))
            .map(|docs| docs.len())
    }
}

/// Decode goal documents, skipping (and logging) malformed ones.
fn decode_goals(docs: &[StoredDocument]) -> Vec<Goal> {
    docs.iter()
        .filter_map(|doc| match Goal::from_stored(doc) {
            Ok(goal) => Some(goal),
            Err(e) => {
                tracing::warn!(goal_id = %doc.id, error = %e, "Skipping malformed goal");
                None
            }
        })
        .collect()
}
