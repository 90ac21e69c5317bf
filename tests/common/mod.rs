// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use axum::body::Body;
use axum::http::Request;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use std::sync::Arc;
use want_goals::backend::Backend;
use want_goals::config::Config;
use want_goals::db::{DocumentStore, FirestoreDb};
use want_goals::models::SignupForm;
use want_goals::routes::create_router;
use want_goals::AppState;

/// Check if emulator is available via environment variable.
#[allow(dead_code)]
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

/// Create a document store on the Firestore emulator.
#[allow(dead_code)]
pub async fn test_firestore() -> DocumentStore {
    let db = FirestoreDb::new("test-project", std::time::Duration::from_millis(50))
        .await
        .expect("Failed to connect to Firestore emulator");
    DocumentStore::firestore(db)
}

/// Create test state on the in-memory backend.
#[allow(dead_code)]
pub fn create_test_state() -> Arc<AppState> {
    let config = Config::default();
    let backend = Backend::in_memory(&config.firebase.storage_bucket);
    Arc::new(AppState::new(config, backend))
}

/// Create a test app on the in-memory backend.
/// Returns the router and the shared state.
#[allow(dead_code)]
pub fn create_test_app() -> (axum::Router, Arc<AppState>) {
    let state = create_test_state();
    (create_router(state.clone()), state)
}

/// A complete signup form.
#[allow(dead_code)]
pub fn signup_form(email: &str) -> SignupForm {
    SignupForm {
        first_name: "Ada".to_string(),
        middle_initial: "K".to_string(),
        last_name: "Lovelace".to_string(),
        bio: String::new(),
        username: "ada".to_string(),
        email: email.to_string(),
        password: "secret1".to_string(),
        confirm_password: "secret1".to_string(),
    }
}

/// Sign up and sign in. Returns the new user's id.
#[allow(dead_code)]
pub async fn signed_in_user(state: &AppState, email: &str) -> String {
    let uid = state.accounts.sign_up(&signup_form(email)).await.unwrap();
    state.accounts.sign_in(email, "secret1").await.unwrap();
    uid
}

/// A small fake JPEG as a `data:` URI.
#[allow(dead_code)]
pub fn jpeg_data_uri(len: usize) -> String {
    let mut bytes = vec![0xFFu8, 0xD8, 0xFF, 0xE0];
    bytes.resize(len.max(4), 0x42);
    format!("data:image/jpeg;base64,{}", BASE64.encode(bytes))
}

/// Build a JSON request.
#[allow(dead_code)]
pub fn json_request(method: &str, uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// Read a response body as JSON.
#[allow(dead_code)]
pub async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
