// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Profile view and photo upload on the in-memory backend.

use futures_util::StreamExt;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use want_goals::db::{collections, fields};
use want_goals::error::AppError;
use want_goals::models::{NewGoal, ProfileView, UserRecord};
use want_goals::services::UploadProgress;

mod common;
use common::{create_test_state, jpeg_data_uri, signed_in_user};

async fn next<S: futures_util::Stream + Unpin>(stream: &mut S) -> S::Item {
    tokio::time::timeout(Duration::from_secs(2), stream.next())
        .await
        .expect("timed out waiting for snapshot")
        .expect("stream ended")
}

fn photo_url(state: &want_goals::AppState, uid: &str) -> Option<String> {
    let doc = state
        .backend
        .documents
        .as_memory()
        .unwrap()
        .get_document(collections::USERS, uid)
        .unwrap();
    doc.fields
        .get(fields::PHOTO_URL)
        .and_then(|v| v.as_str())
        .map(str::to_string)
}

#[tokio::test]
async fn test_snapshot_combines_user_and_goal_count() {
    let state = create_test_state();
    let uid = signed_in_user(&state, "ada@example.com").await;
    state
        .goals
        .create_goal(&uid, NewGoal::new("First", ""))
        .await
        .unwrap();

    let view = state.profile.snapshot(&uid).await.unwrap();
    let user = view.user.unwrap();
    assert_eq!(user.display_name(), "Ada K. Lovelace");
    assert_eq!(user.bio_or_default(), "No bio yet");
    assert_eq!(view.goal_count, 1);
}

#[tokio::test]
async fn test_photo_upload_overwrites_same_key() {
    let state = create_test_state();
    let uid = signed_in_user(&state, "ada@example.com").await;
    let blobs = state.backend.blobs.as_memory().unwrap().clone();

    let first = state
        .profile
        .upload_photo(&uid, &jpeg_data_uri(10), |_| {})
        .await
        .unwrap();
    let second = state
        .profile
        .upload_photo(&uid, &jpeg_data_uri(20), |_| {})
        .await
        .unwrap();

    let path = format!("profiles/{}.jpg", uid);
    let blob = blobs.get(&path).unwrap();
    assert_eq!(blobs.len(), 1);
    assert_eq!(blob.generation, 2);
    assert_eq!(blob.bytes.len(), 20);
    assert_eq!(blob.content_type, "image/jpeg");

    assert_ne!(first, second);
    assert_eq!(photo_url(&state, &uid), Some(second));
}

#[tokio::test]
async fn test_photo_url_written_once_after_upload() {
    let state = create_test_state();
    let uid = signed_in_user(&state, "ada@example.com").await;
    let mut user_doc = state
        .backend
        .documents
        .watch_document(collections::USERS, &uid);
    let initial: UserRecord = next(&mut user_doc).await.unwrap().decode().unwrap();
    assert_eq!(initial.photo_url, None);

    let progress = Arc::new(Mutex::new(Vec::new()));
    let seen = progress.clone();
    let url = state
        .profile
        .upload_photo(&uid, &jpeg_data_uri(200 * 1024), move |p: UploadProgress| {
            seen.lock().unwrap().push(p.percent());
        })
        .await
        .unwrap();

    let updated: UserRecord = next(&mut user_doc).await.unwrap().decode().unwrap();
    assert_eq!(updated.photo_url, Some(url));
    assert_eq!(updated.first_name, initial.first_name);
    assert!(
        tokio::time::timeout(Duration::from_millis(100), user_doc.next())
            .await
            .is_err(),
        "user document changed more than once"
    );

    let progress = progress.lock().unwrap();
    assert!(progress.len() > 2);
    assert_eq!(progress.first(), Some(&0));
    assert_eq!(progress.last(), Some(&100));
    assert!(progress.windows(2).all(|w| w[0] <= w[1]));
}

#[tokio::test]
async fn test_failed_upload_keeps_previous_photo() {
    let state = create_test_state();
    let uid = signed_in_user(&state, "ada@example.com").await;
    let original = state
        .profile
        .upload_photo(&uid, &jpeg_data_uri(10), |_| {})
        .await
        .unwrap();

    state.backend.blobs.as_memory().unwrap().set_offline(true);
    let err = state
        .profile
        .upload_photo(&uid, &jpeg_data_uri(10), |_| {})
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Storage(_)));
    assert_eq!(photo_url(&state, &uid), Some(original.clone()));

    // Unreadable image never reaches storage
    state.backend.blobs.as_memory().unwrap().set_offline(false);
    assert!(matches!(
        state
            .profile
            .upload_photo(&uid, "file:///no/such/photo.jpg", |_| {})
            .await,
        Err(AppError::NotFound(_))
    ));
    assert_eq!(photo_url(&state, &uid), Some(original));
}

#[tokio::test]
async fn test_url_lookup_failure_keeps_previous_photo() {
    let state = create_test_state();
    let uid = signed_in_user(&state, "ada@example.com").await;
    let blobs = state.backend.blobs.as_memory().unwrap().clone();
    let original = state
        .profile
        .upload_photo(&uid, &jpeg_data_uri(10), |_| {})
        .await
        .unwrap();

    blobs.set_url_lookup_failing(true);
    let err = state
        .profile
        .upload_photo(&uid, &jpeg_data_uri(30), |_| {})
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Storage(_)));

    // The bytes went up but the profile still points at the old photo
    let path = format!("profiles/{}.jpg", uid);
    assert_eq!(blobs.get(&path).unwrap().generation, 2);
    assert_eq!(photo_url(&state, &uid), Some(original));
}

#[tokio::test]
async fn test_profile_write_failure_creates_no_user_document() {
    let state = create_test_state();
    // An identity without a users/{uid} record
    let uid = state
        .backend
        .identity
        .create_account("ghost@example.com", "secret1")
        .await
        .unwrap();

    let err = state
        .profile
        .upload_photo(&uid, &jpeg_data_uri(10), |_| {})
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));

    let blobs = state.backend.blobs.as_memory().unwrap();
    assert!(blobs.get(&format!("profiles/{}.jpg", uid)).is_some());
    assert!(state
        .backend
        .documents
        .as_memory()
        .unwrap()
        .get_document(collections::USERS, &uid)
        .is_none());
}

#[tokio::test]
async fn test_concurrent_upload_rejected() {
    let state = create_test_state();
    let uid = signed_in_user(&state, "ada@example.com").await;
    let image = jpeg_data_uri(200 * 1024);

    let (first, second) = tokio::join!(
        state.profile.upload_photo(&uid, &image, |_| {}),
        state.profile.upload_photo(&uid, &image, |_| {}),
    );

    assert!(first.is_ok());
    assert!(matches!(second, Err(AppError::Conflict(_))));
    assert_eq!(
        state
            .backend
            .blobs
            .as_memory()
            .unwrap()
            .get(&format!("profiles/{}.jpg", uid))
            .unwrap()
            .generation,
        1
    );
}

#[tokio::test]
async fn test_live_profile_merges_both_subscriptions() {
    let state = create_test_state();
    let uid = signed_in_user(&state, "ada@example.com").await;
    let mut live = state.profile.watch(&uid);

    // Wait until both halves have reported
    let mut view = ProfileView::default();
    while view.user.is_none() {
        view = next(&mut live).await;
    }
    assert_eq!(view.goal_count, 0);

    state
        .goals
        .create_goal(&uid, NewGoal::new("Read more", ""))
        .await
        .unwrap();
    let view = next(&mut live).await;
    assert_eq!(view.goal_count, 1);
    assert!(view.user.is_some(), "goal update must not clear user fields");

    let url = state
        .profile
        .upload_photo(&uid, &jpeg_data_uri(10), |_| {})
        .await
        .unwrap();
    let view = next(&mut live).await;
    assert_eq!(view.goal_count, 1, "user update must not reset goal count");
    assert_eq!(view.user.unwrap().photo_url, Some(url));

    live.cancel();
}
