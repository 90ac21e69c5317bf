// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore client wrapper for schemaless documents.
//!
//! Live snapshots are produced by re-running the read on an interval and
//! emitting only when the result changes.

use super::{Document, FieldFilter, StoredDocument};
use crate::error::AppError;
use crate::snapshots::Snapshots;
use std::time::Duration;

/// Metadata fields the firestore crate adds to deserialized documents.
const FIRESTORE_ID_FIELD: &str = "_firestore_id";
const FIRESTORE_META_PREFIX: &str = "_firestore_";

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreDb {
    client: Option<firestore::FirestoreDb>,
    poll_interval: Duration,
}

impl FirestoreDb {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str, poll_interval: Duration) -> Result<Self, AppError> {
        // The emulator accepts any token; skip credential discovery.
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id, poll_interval).await;
        }

        let client = firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self {
            client: Some(client),
            poll_interval,
        })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(
        project_id: &str,
        poll_interval: Duration,
    ) -> Result<Self, AppError> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            AppError::Database(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self {
            client: Some(client),
            poll_interval,
        })
    }

    /// Create a mock Firestore client for testing (offline mode).
    ///
    /// All database operations will return an error if called.
    pub fn new_mock() -> Self {
        Self {
            client: None,
            poll_interval: Duration::from_secs(1),
        }
    }

    /// Helper to get the client or return an error if offline.
    fn get_client(&self) -> Result<&firestore::FirestoreDb, AppError> {
        self.client
            .as_ref()
            .ok_or_else(|| AppError::Database("Database not connected (offline mode)".to_string()))
    }

    // ─── Reads ───────────────────────────────────────────────────

    pub async fn get_document(
        &self,
        collection: &str,
        id: &str,
    ) -> Result<Option<StoredDocument>, AppError> {
        let fields: Option<Document> = self
            .get_client()?
            .fluent()
            .select()
            .by_id_in(collection)
            .obj()
            .one(id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(fields.map(|fields| into_stored(Some(id), fields)))
    }

    pub async fn query(
        &self,
        collection: &str,
        filter: &FieldFilter,
    ) -> Result<Vec<StoredDocument>, AppError> {
        let field = filter.field.clone();
        let value = filter.value.clone();

        let docs: Vec<Document> = self
            .get_client()?
            .fluent()
            .select()
            .from(collection)
            .filter(move |q| q.field(&field).eq(value.clone()))
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(docs
            .into_iter()
            .map(|fields| into_stored(None, fields))
            .collect())
    }

    // ─── Writes ──────────────────────────────────────────────────

    pub async fn set_document(
        &self,
        collection: &str,
        id: &str,
        fields: &Document,
    ) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collection)
            .document_id(id)
            .object(fields)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Merge: only the given field paths are written. The document must
    /// already exist.
    pub async fn update_document(
        &self,
        collection: &str,
        id: &str,
        fields: &Document,
    ) -> Result<(), AppError> {
        let paths: Vec<String> = fields.keys().cloned().collect();

        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .fields(paths)
            .in_col(collection)
            .precondition(firestore::FirestoreWritePrecondition::Exists(true))
            .document_id(id)
            .object(fields)
            .execute()
            .await
            .map_err(|e| match e {
                firestore::errors::FirestoreError::DataNotFoundError(_) => {
                    AppError::NotFound(format!("{}/{}", collection, id))
                }
                other => AppError::Database(other.to_string()),
            })?;
        Ok(())
    }

    pub async fn delete_document(&self, collection: &str, id: &str) -> Result<(), AppError> {
        self.get_client()?
            .fluent()
            .delete()
            .from(collection)
            .document_id(id)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    // ─── Live snapshots ──────────────────────────────────────────

    pub fn watch_document(&self, collection: &str, id: &str) -> Snapshots<Option<StoredDocument>> {
        let db = self.clone();
        let collection = collection.to_string();
        let id = id.to_string();

        self.poll(move || {
            let db = db.clone();
            let collection = collection.clone();
            let id = id.clone();
            async move { db.get_document(&collection, &id).await }
        })
    }

    pub fn watch_query(&self, collection: &str, filter: FieldFilter) -> Snapshots<Vec<StoredDocument>> {
        let db = self.clone();
        let collection = collection.to_string();

        self.poll(move || {
            let db = db.clone();
            let collection = collection.clone();
            let filter = filter.clone();
            async move { db.query(&collection, &filter).await }
        })
    }

    /// Re-run `read` every poll interval; emit the first result and every
    /// result that differs from the last one sent.
    fn poll<T, F, Fut>(&self, mut read: F) -> Snapshots<T>
    where
        T: PartialEq + Clone + Send + 'static,
        F: FnMut() -> Fut + Send + 'static,
        Fut: std::future::Future<Output = Result<T, AppError>> + Send,
    {
        let interval = self.poll_interval;

        Snapshots::spawn(move |tx| async move {
            let mut ticker = tokio::time::interval(interval);
            let mut last: Option<T> = None;

            loop {
                ticker.tick().await;
                if tx.is_closed() {
                    return;
                }

                match read().await {
                    Ok(snapshot) => {
                        if last.as_ref() == Some(&snapshot) {
                            continue;
                        }
                        if tx.send(snapshot.clone()).await.is_err() {
                            return;
                        }
                        last = Some(snapshot);
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "Snapshot refresh failed");
                    }
                }
            }
        })
    }
}

/// Split the crate's metadata fields off a deserialized document.
fn into_stored(id: Option<&str>, mut fields: Document) -> StoredDocument {
    let meta_id = match fields.remove(FIRESTORE_ID_FIELD) {
        Some(serde_json::Value::String(id)) => Some(id),
        _ => None,
    };
    fields.retain(|key, _| !key.starts_with(FIRESTORE_META_PREFIX));

    StoredDocument {
        id: id.map(str::to_string).or(meta_id).unwrap_or_default(),
        fields,
    }
}
