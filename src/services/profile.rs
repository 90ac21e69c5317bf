// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Profile service: live profile view and profile photo upload.

use crate::backend::Backend;
use crate::db::{collections, fields, Document, StoredDocument};
use crate::error::AppError;
use crate::models::{ProfileUpdate, ProfileView, UserRecord};
use crate::services::goals::GoalRepository;
use crate::services::image::load_image;
use crate::services::storage::{profile_photo_path, UploadProgress};
use crate::snapshots::Snapshots;
use futures_util::StreamExt;
use std::sync::Arc;
use tokio::sync::Mutex;

const PHOTO_CONTENT_TYPE: &str = "image/jpeg";

/// Profile service.
#[derive(Clone)]
pub struct ProfileService {
    backend: Backend,
    goals: GoalRepository,
    /// Held for the duration of a photo upload
    upload_lock: Arc<Mutex<()>>,
}

impl ProfileService {
    pub fn new(backend: Backend, goals: GoalRepository) -> Self {
        Self {
            backend,
            goals,
            upload_lock: Arc::new(Mutex::new(())),
        }
    }

    pub async fn get_user(&self, uid: &str) -> Result<Option<UserRecord>, AppError> {
        let doc = self
            .backend
            .documents
            .get_document(collections::USERS, uid)
            .await?;
        doc.as_ref().map(StoredDocument::decode).transpose()
    }

    /// One-off profile view.
    pub async fn snapshot(&self, uid: &str) -> Result<ProfileView, AppError> {
        let user = self.get_user(uid).await?;
        let goal_count = self.goals.fetch_goals(uid).await?.len();
        Ok(ProfileView { user, goal_count })
    }

    /// Live profile view merged from the user document and the goal query.
    ///
    /// A view is emitted whenever an update from either subscription changes
    /// it. Both subscriptions end when the returned stream is dropped.
    pub fn watch(&self, uid: &str) -> Snapshots<ProfileView> {
        let mut users = self
            .backend
            .documents
            .watch_document(collections::USERS, uid);
        let mut counts = self.goals.watch_goal_count(uid);
        let uid = uid.to_string();

        Snapshots::spawn(move |tx| async move {
            let mut view = ProfileView::default();
            let mut sent: Option<ProfileView> = None;
            loop {
                let update = tokio::select! {
                    Some(doc) = users.next() => ProfileUpdate::User(decode_user(&uid, doc)),
                    Some(count) = counts.next() => ProfileUpdate::GoalCount(count),
                    else => return,
                };
                view.apply(update);
                if sent.as_ref() == Some(&view) {
                    continue;
                }
                if tx.send(view.clone()).await.is_err() {
                    return;
                }
                sent = Some(view.clone());
            }
        })
    }

    /// Upload a new profile photo and record its address on the user.
    ///
    /// Steps: load the image, upload to `profiles/{uid}.jpg`, resolve the
    /// download URL, then merge `photoURL` into `users/{uid}`. The user
    /// document is only written after the first two backend steps succeed.
    /// One upload at a time; a concurrent call gets `Conflict`.
    pub async fn upload_photo<F>(
        &self,
        uid: &str,
        image_ref: &str,
        on_progress: F,
    ) -> Result<String, AppError>
    where
        F: FnMut(UploadProgress) + Send + Sync + 'static,
    {
        let _guard = self
            .upload_lock
            .try_lock()
            .map_err(|_| AppError::Conflict("An upload is already in progress".to_string()))?;

        let bytes = load_image(image_ref).await?;
        let path = profile_photo_path(uid);
        let token = self.backend.identity.id_token();

        self.backend
            .blobs
            .upload(&path, bytes, PHOTO_CONTENT_TYPE, token.as_deref(), on_progress)
            .await
            .inspect_err(|e| tracing::warn!(uid, error = %e, "Profile photo upload failed"))?;

        let url = self
            .backend
            .blobs
            .download_url(&path, token.as_deref())
            .await
            .inspect_err(|e| tracing::warn!(uid, error = %e, "Failed to resolve photo URL"))?;

        let mut update = Document::new();
        update.insert(fields::PHOTO_URL.to_string(), serde_json::Value::String(url.clone()));
        self.backend
            .documents
            .update_document(collections::USERS, uid, &update)
            .await
            .inspect_err(|e| tracing::error!(uid, error = %e, "Saved photo but failed to update profile"))?;

        tracing::info!(uid, path = %path, "Profile photo updated");
        Ok(url)
    }
}

fn decode_user(uid: &str, doc: Option<StoredDocument>) -> Option<UserRecord> {
    let doc = doc?;
    match doc.decode() {
        Ok(user) => Some(user),
        Err(e) => {
            tracing::error!(uid, error = %e, "Error reading user profile");
            None
        }
    }
}
