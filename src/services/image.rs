// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Resolve a picked image reference into bytes for upload.
//!
//! Image pickers hand back either a `file://` URI (or bare path) or a
//! base64 `data:` URI.

use crate::error::AppError;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};

/// Load the bytes behind a local image reference.
pub async fn load_image(reference: &str) -> Result<Vec<u8>, AppError> {
    let reference = reference.trim();

    let bytes = if let Some(data) = reference.strip_prefix("data:") {
        decode_data_uri(data)?
    } else if let Some(path) = reference.strip_prefix("file://") {
        let path = urlencoding::decode(path)
            .map_err(|_| AppError::Validation("Invalid image path".to_string()))?;
        read_file(&path).await?
    } else if reference.starts_with('/') {
        read_file(reference).await?
    } else {
        return Err(AppError::Validation(
            "Unsupported image reference".to_string(),
        ));
    };

    if bytes.is_empty() {
        return Err(AppError::Validation("Image is empty".to_string()));
    }
    Ok(bytes)
}

/// Decode the part of a data URI after `data:`, e.g.
/// `image/jpeg;base64,/9j/4AAQ...`.
fn decode_data_uri(data: &str) -> Result<Vec<u8>, AppError> {
    let (header, payload) = data
        .split_once(',')
        .ok_or_else(|| AppError::Validation("Malformed data URI".to_string()))?;

    if !header.split(';').any(|part| part == "base64") {
        return Err(AppError::Validation(
            "Only base64 data URIs are supported".to_string(),
        ));
    }

    BASE64
        .decode(payload.trim())
        .map_err(|_| AppError::Validation("Invalid base64 image data".to_string()))
}

async fn read_file(path: &str) -> Result<Vec<u8>, AppError> {
    tokio::fs::read(path).await.map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => {
            tracing::debug!(path, "Image file missing");
            AppError::NotFound("Image not found".to_string())
        }
        std::io::ErrorKind::PermissionDenied => {
            AppError::Forbidden("Please allow access to your photos.".to_string())
        }
        _ => AppError::Internal(anyhow::anyhow!("Failed to read image {}: {}", path, e)),
    })
}
