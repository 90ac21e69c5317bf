// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Blob storage for profile photos.
//!
//! Firebase uploads use the Cloud Storage for Firebase REST API with the
//! signed-in user's ID token, streaming the body in chunks so progress can
//! be reported as bytes are handed to the transport.

use crate::error::AppError;
use dashmap::DashMap;
use serde::Deserialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

const FIREBASE_STORAGE_URL: &str = "https://firebasestorage.googleapis.com/v0";
const UPLOAD_CHUNK_SIZE: usize = 64 * 1024;

/// Upload progress report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadProgress {
    pub bytes_transferred: u64,
    pub total_bytes: u64,
}

impl UploadProgress {
    /// Rounded percentage; an empty upload counts as complete.
    pub fn percent(&self) -> u8 {
        if self.total_bytes == 0 {
            return 100;
        }
        let pct = (self.bytes_transferred as f64 / self.total_bytes as f64 * 100.0).round();
        pct.clamp(0.0, 100.0) as u8
    }
}

/// Storage path of a user's profile photo. One object per user; a new
/// upload overwrites the previous one.
pub fn profile_photo_path(uid: &str) -> String {
    format!("profiles/{}.jpg", uid)
}

/// Blob storage handle.
#[derive(Clone)]
pub struct BlobStorage {
    bucket: String,
    provider: Provider,
}

#[derive(Clone)]
enum Provider {
    Firebase(FirebaseStorageClient),
    Memory(MemoryBlobs),
}

impl BlobStorage {
    /// Cloud Storage for Firebase client for `bucket`.
    ///
    /// Set FIREBASE_STORAGE_EMULATOR_HOST to target the Storage emulator.
    pub fn firebase(bucket: &str) -> Self {
        let base_url = match std::env::var("FIREBASE_STORAGE_EMULATOR_HOST") {
            Ok(host) => {
                tracing::info!(host = %host, "Using Firebase Storage emulator");
                format!("http://{}/v0", host)
            }
            Err(_) => FIREBASE_STORAGE_URL.to_string(),
        };
        Self {
            bucket: bucket.to_string(),
            provider: Provider::Firebase(FirebaseStorageClient {
                http: reqwest::Client::new(),
                base_url,
            }),
        }
    }

    /// In-process blobs for local development and tests.
    pub fn in_memory(bucket: &str) -> Self {
        Self {
            bucket: bucket.to_string(),
            provider: Provider::Memory(MemoryBlobs::default()),
        }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// The in-process provider, if this handle uses one.
    pub fn as_memory(&self) -> Option<&MemoryBlobs> {
        match &self.provider {
            Provider::Memory(blobs) => Some(blobs),
            Provider::Firebase(_) => None,
        }
    }

    /// Upload `bytes` to `path`, replacing any existing object.
    ///
    /// `on_progress` is called repeatedly as bytes are transferred.
    pub async fn upload<F>(
        &self,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
        auth_token: Option<&str>,
        on_progress: F,
    ) -> Result<(), AppError>
    where
        F: FnMut(UploadProgress) + Send + Sync + 'static,
    {
        tracing::debug!(path, size = bytes.len(), "Uploading blob");

        match &self.provider {
            Provider::Firebase(client) => {
                client
                    .upload(&self.bucket, path, bytes, content_type, auth_token, on_progress)
                    .await
            }
            Provider::Memory(blobs) => blobs.upload(path, bytes, content_type, on_progress).await,
        }
    }

    /// Resolve the retrieval address of an uploaded object.
    pub async fn download_url(&self, path: &str, auth_token: Option<&str>) -> Result<String, AppError> {
        match &self.provider {
            Provider::Firebase(client) => client.download_url(&self.bucket, path, auth_token).await,
            Provider::Memory(blobs) => blobs.download_url(&self.bucket, path),
        }
    }
}

// ─── Cloud Storage for Firebase ──────────────────────────────────

#[derive(Clone)]
struct FirebaseStorageClient {
    http: reqwest::Client,
    base_url: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ObjectMetadata {
    #[serde(default)]
    download_tokens: Option<String>,
}

impl FirebaseStorageClient {
    async fn upload<F>(
        &self,
        bucket: &str,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
        auth_token: Option<&str>,
        mut on_progress: F,
    ) -> Result<(), AppError>
    where
        F: FnMut(UploadProgress) + Send + Sync + 'static,
    {
        use futures_util::StreamExt;

        let url = format!("{}/b/{}/o", self.base_url, bucket);
        let total_bytes = bytes.len() as u64;
        let chunks: Vec<Vec<u8>> = bytes.chunks(UPLOAD_CHUNK_SIZE).map(<[u8]>::to_vec).collect();

        let mut bytes_transferred = 0u64;
        let body = futures_util::stream::iter(chunks).map(move |chunk| {
            bytes_transferred += chunk.len() as u64;
            on_progress(UploadProgress {
                bytes_transferred,
                total_bytes,
            });
            Ok::<_, std::io::Error>(chunk)
        });

        let mut request = self
            .http
            .post(&url)
            .query(&[("uploadType", "media"), ("name", path)])
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .header(reqwest::header::CONTENT_LENGTH, total_bytes)
            .body(reqwest::Body::wrap_stream(body));
        if let Some(token) = auth_token {
            request = request.header(reqwest::header::AUTHORIZATION, format!("Firebase {}", token));
        }

        let response = request
            .send()
            .await
            .map_err(|e| AppError::Storage(format!("Upload request failed: {}", e)))?;
        check_response(response).await?;

        tracing::info!(bucket, path, total_bytes, "Blob uploaded");
        Ok(())
    }

    async fn download_url(
        &self,
        bucket: &str,
        path: &str,
        auth_token: Option<&str>,
    ) -> Result<String, AppError> {
        let object_url = format!(
            "{}/b/{}/o/{}",
            self.base_url,
            bucket,
            urlencoding::encode(path)
        );

        let mut request = self.http.get(&object_url);
        if let Some(token) = auth_token {
            request = request.header(reqwest::header::AUTHORIZATION, format!("Firebase {}", token));
        }

        let response = request
            .send()
            .await
            .map_err(|e| AppError::Storage(format!("Metadata request failed: {}", e)))?;
        let metadata: ObjectMetadata = check_response(response)
            .await?
            .json()
            .await
            .map_err(|e| AppError::Storage(format!("Malformed object metadata: {}", e)))?;

        // Several tokens may be comma separated; any of them works.
        let token = metadata
            .download_tokens
            .as_deref()
            .and_then(|tokens| tokens.split(',').next())
            .filter(|token| !token.is_empty())
            .ok_or_else(|| AppError::Storage(format!("No download token for {}", path)))?;

        Ok(format!(
            "{}?alt=media&token={}",
            object_url,
            urlencoding::encode(token)
        ))
    }
}

async fn check_response(response: reqwest::Response) -> Result<reqwest::Response, AppError> {
    if response.status().is_success() {
        return Ok(response);
    }

    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    Err(AppError::Storage(format!("HTTP {}: {}", status, body)))
}

// ─── In-process blobs ────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct StoredBlob {
    pub bytes: Vec<u8>,
    pub content_type: String,
    /// Incremented on every overwrite
    pub generation: u64,
}

/// In-memory blob storage.
#[derive(Clone, Default)]
pub struct MemoryBlobs {
    blobs: Arc<DashMap<String, StoredBlob>>,
    offline: Arc<AtomicBool>,
    url_lookup_failing: Arc<AtomicBool>,
}

impl MemoryBlobs {
    /// Make every following call fail, as if the network were down.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Make only download URL lookups fail; uploads still succeed.
    pub fn set_url_lookup_failing(&self, failing: bool) {
        self.url_lookup_failing.store(failing, Ordering::SeqCst);
    }

    fn check_online(&self) -> Result<(), AppError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(AppError::Storage("Storage unavailable (offline mode)".to_string()));
        }
        Ok(())
    }

    pub fn get(&self, path: &str) -> Option<StoredBlob> {
        self.blobs.get(path).map(|blob| blob.clone())
    }

    pub fn len(&self) -> usize {
        self.blobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blobs.is_empty()
    }

    async fn upload<F>(
        &self,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
        mut on_progress: F,
    ) -> Result<(), AppError>
    where
        F: FnMut(UploadProgress),
    {
        self.check_online()?;

        let total_bytes = bytes.len() as u64;
        let mut bytes_transferred = 0u64;
        on_progress(UploadProgress {
            bytes_transferred,
            total_bytes,
        });
        for chunk in bytes.chunks(UPLOAD_CHUNK_SIZE) {
            tokio::task::yield_now().await;
            bytes_transferred += chunk.len() as u64;
            on_progress(UploadProgress {
                bytes_transferred,
                total_bytes,
            });
        }

        let generation = self.blobs.get(path).map_or(1, |blob| blob.generation + 1);
        self.blobs.insert(
            path.to_string(),
            StoredBlob {
                bytes,
                content_type: content_type.to_string(),
                generation,
            },
        );
        Ok(())
    }

    fn download_url(&self, bucket: &str, path: &str) -> Result<String, AppError> {
        self.check_online()?;
        if self.url_lookup_failing.load(Ordering::SeqCst) {
            return Err(AppError::Storage(format!("Metadata lookup failed for {}", path)));
        }
        let blob = self
            .blobs
            .get(path)
            .ok_or_else(|| AppError::NotFound(format!("Object {} not found", path)))?;

        Ok(format!(
            "memory://{}/{}?generation={}",
            bucket,
            urlencoding::encode(path),
            blob.generation
        ))
    }
}
