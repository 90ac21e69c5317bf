// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Profile routes: snapshot, live updates and photo upload.

use crate::error::{AppError, ErrorResponse, Result};
use crate::middleware::auth::AuthUser;
use crate::models::ProfileView;
use crate::services::UploadProgress;
use crate::time_utils::format_utc_rfc3339;
use crate::AppState;
use axum::{
    extract::State,
    response::sse::{Event as SseEvent, KeepAlive, Sse},
    routing::{get, post},
    Extension, Json, Router,
};
use futures_util::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use std::{convert::Infallible, sync::Arc, time::Duration};
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

const KEEP_ALIVE_SECS: u64 = 15;

/// Profile routes (require a signed-in user).
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/profile", get(get_profile))
        .route("/api/profile/live", get(live_profile))
        .route("/api/profile/photo", post(upload_photo))
}

/// What the profile screen renders.
#[derive(Debug, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct ProfileResponse {
    pub uid: String,
    /// False until the user document has been seen
    pub loaded: bool,
    pub display_name: Option<String>,
    pub username: Option<String>,
    pub email: Option<String>,
    pub bio: Option<String>,
    pub photo_url: Option<String>,
    pub member_since: Option<String>,
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub goal_count: usize,
}

impl ProfileResponse {
    fn new(uid: &str, view: ProfileView) -> Self {
        let user = view.user;
        Self {
            uid: uid.to_string(),
            loaded: user.is_some(),
            display_name: user.as_ref().map(|u| u.display_name()),
            username: user.as_ref().map(|u| u.username.clone()),
            email: user.as_ref().map(|u| u.email.clone()),
            bio: user.as_ref().map(|u| u.bio_or_default().to_string()),
            photo_url: user.as_ref().and_then(|u| u.photo_url.clone()),
            member_since: user.as_ref().map(|u| format_utc_rfc3339(u.created_at)),
            goal_count: view.goal_count,
        }
    }
}

async fn get_profile(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<ProfileResponse>> {
    let view = state.profile.snapshot(&user.uid).await?;
    Ok(Json(ProfileResponse::new(&user.uid, view)))
}

/// Server-sent `profile` events, one per change of either the user
/// document or the goal count. Closing the connection drops both
/// subscriptions.
async fn live_profile(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Sse<impl Stream<Item = std::result::Result<SseEvent, Infallible>>> {
    let uid = user.uid;
    let stream = state.profile.watch(&uid).filter_map(move |view| {
        let event = json_event("profile", &ProfileResponse::new(&uid, view));
        async move { event.map(Ok) }
    });

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(KEEP_ALIVE_SECS))
            .text("keep-alive"),
    )
}

#[derive(Deserialize)]
pub struct PhotoUploadRequest {
    /// Picked image as a base64 `data:` URI
    image: String,
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct UploadProgressEvent {
    pub percent: u8,
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub bytes_transferred: u64,
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub total_bytes: u64,
}

impl From<UploadProgress> for UploadProgressEvent {
    fn from(progress: UploadProgress) -> Self {
        Self {
            percent: progress.percent(),
            bytes_transferred: progress.bytes_transferred,
            total_bytes: progress.total_bytes,
        }
    }
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct UploadCompleteEvent {
    pub photo_url: String,
    pub message: String,
}

/// Start a profile photo upload.
///
/// The image bytes travel in the request; references to files on this
/// machine are rejected. The response streams `progress` events, then
/// exactly one `complete` or `error` event. The upload keeps running if
/// the client disconnects.
async fn upload_photo(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(req): Json<PhotoUploadRequest>,
) -> Result<Sse<impl Stream<Item = std::result::Result<SseEvent, Infallible>>>> {
    if !req.image.trim_start().starts_with("data:") {
        tracing::warn!(uid = %user.uid, "Rejected photo upload without inline image data");
        return Err(AppError::Validation(
            "Photo must be sent as a base64 data URI".to_string(),
        ));
    }

    let (tx, rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        let progress_tx = tx.clone();
        let on_progress = move |progress: UploadProgress| {
            if let Some(event) = json_event("progress", &UploadProgressEvent::from(progress)) {
                let _ = progress_tx.send(event);
            }
        };

        let event = match state
            .profile
            .upload_photo(&user.uid, &req.image, on_progress)
            .await
        {
            Ok(photo_url) => json_event(
                "complete",
                &UploadCompleteEvent {
                    photo_url,
                    message: "Profile photo updated!".to_string(),
                },
            ),
            Err(e) => json_event("error", &ErrorResponse::from(&e)),
        };

        if let Some(event) = event {
            let _ = tx.send(event);
        }
    });

    Ok(Sse::new(UnboundedReceiverStream::new(rx).map(Ok)).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(KEEP_ALIVE_SECS))
            .text("keep-alive"),
    ))
}

fn json_event<T: Serialize>(name: &str, payload: &T) -> Option<SseEvent> {
    match SseEvent::default().event(name).json_data(payload) {
        Ok(event) => Some(event),
        Err(err) => {
            tracing::error!(event = name, error = %err, "Failed to serialize SSE payload");
            None
        }
    }
}
