// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Backend client handle: identity, documents and blobs.
//!
//! Built once by the entry point and passed to whatever needs it.

use crate::config::{BackendMode, Config};
use crate::db::{DocumentStore, FirestoreDb, MemoryDb};
use crate::error::AppError;
use crate::services::{BlobStorage, IdentityService};

/// Connected backend capabilities.
#[derive(Clone)]
pub struct Backend {
    pub identity: IdentityService,
    pub documents: DocumentStore,
    pub blobs: BlobStorage,
}

impl Backend {
    /// Connect to the backend selected by the configuration.
    pub async fn connect(config: &Config) -> Result<Self, AppError> {
        match config.backend {
            BackendMode::Memory => {
                tracing::info!("Using in-memory backend");
                Ok(Self::in_memory(&config.firebase.storage_bucket))
            }
            BackendMode::Firebase => {
                let firebase = &config.firebase;
                let db = FirestoreDb::new(&firebase.project_id, config.snapshot_poll_interval).await?;

                tracing::info!(
                    project = %firebase.project_id,
                    bucket = %firebase.storage_bucket,
                    "Firebase backend initialized"
                );

                Ok(Self {
                    identity: IdentityService::firebase(&firebase.api_key),
                    documents: DocumentStore::firestore(db),
                    blobs: BlobStorage::firebase(&firebase.storage_bucket),
                })
            }
        }
    }

    /// Fully in-process backend.
    pub fn in_memory(bucket: &str) -> Self {
        Self {
            identity: IdentityService::in_memory(),
            documents: DocumentStore::memory(MemoryDb::new()),
            blobs: BlobStorage::in_memory(bucket),
        }
    }

    /// End the session. Live snapshot streams still held elsewhere stop
    /// when they are dropped.
    pub async fn shutdown(self) {
        self.identity.sign_out();
        tracing::info!("Backend shut down");
    }
}
