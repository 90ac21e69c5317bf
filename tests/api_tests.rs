// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! HTTP API tests.
//!
//! These tests verify that:
//! 1. Protected routes reject requests while signed out
//! 2. The signup, login and logout flow drives the session
//! 3. Goal and profile routes work for the signed-in user

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use serde_json::json;
use tower::ServiceExt;

mod common;
use common::{body_json, create_test_app, jpeg_data_uri, json_request, signed_in_user};

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

#[tokio::test]
async fn test_health() {
    let (app, _) = create_test_app();
    let response = app.oneshot(get("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["status"], "ok");
}

#[tokio::test]
async fn test_protected_routes_require_session() {
    let (app, _) = create_test_app();

    for uri in ["/api/goals", "/api/profile", "/api/session"] {
        let response = app.clone().oneshot(get(uri)).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{uri}");
        assert_eq!(body_json(response).await["error"], "unauthorized");
    }
}

#[tokio::test]
async fn test_signup_login_logout() {
    let (app, state) = create_test_app();

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/auth/signup",
            json!({
                "firstName": "Grace",
                "mi": "B",
                "lastName": "Hopper",
                "username": "grace",
                "email": "grace@example.com",
                "password": "cobol1959",
                "confirmPassword": "cobol1959"
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_json(response).await;
    assert_eq!(body["message"], "Account created successfully! Please log in.");
    let uid = body["uid"].as_str().unwrap().to_string();
    assert!(state.backend.identity.current_user().is_none());

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/auth/login",
            json!({ "email": "grace@example.com", "password": "cobol1959" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["uid"], uid);

    let response = app.clone().oneshot(get("/api/session")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["email"], "grace@example.com");

    let response = app
        .clone()
        .oneshot(json_request("POST", "/api/auth/logout", json!({})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app.oneshot(get("/api/session")).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_signup_validation_errors() {
    let (app, _) = create_test_app();

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/auth/signup",
            json!({ "firstName": "Grace", "email": "grace@example.com" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["error"], "validation");
    assert_eq!(body["details"], "Please fill in all required fields.");

    let response = app
        .oneshot(json_request(
            "POST",
            "/api/auth/login",
            json!({ "email": "nobody@example.com", "password": "whatever" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["error"], "invalid_credentials");
}

#[tokio::test]
async fn test_goal_lifecycle() {
    let (app, state) = create_test_app();
    let uid = signed_in_user(&state, "ada@example.com").await;

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/goals",
            json!({ "title": "  Learn Rust  ", "description": "Finish the book" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let goal = body_json(response).await;
    assert_eq!(goal["title"], "Learn Rust");
    assert_eq!(goal["user_id"], uid);
    let id = goal["id"].as_str().unwrap().to_string();

    let response = app.clone().oneshot(get("/api/goals")).await.unwrap();
    let goals = body_json(response).await;
    assert_eq!(goals["goals"].as_array().unwrap().len(), 1);
    assert_eq!(goals["goals"][0]["id"], id);

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri(format!("/api/goals/{}", id))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app.oneshot(get("/api/goals")).await.unwrap();
    assert!(body_json(response).await["goals"]
        .as_array()
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_blank_goal_title_rejected() {
    let (app, state) = create_test_app();
    signed_in_user(&state, "ada@example.com").await;

    let response = app
        .clone()
        .oneshot(json_request("POST", "/api/goals", json!({ "title": "   " })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["details"], "Please enter a title");

    let response = app
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri("/api/goals/missing")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_profile_snapshot() {
    let (app, state) = create_test_app();
    let uid = signed_in_user(&state, "ada@example.com").await;

    let response = app.oneshot(get("/api/profile")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let profile = body_json(response).await;
    assert_eq!(profile["uid"], uid);
    assert_eq!(profile["loaded"], true);
    assert_eq!(profile["display_name"], "Ada K. Lovelace");
    assert_eq!(profile["bio"], "No bio yet");
    assert_eq!(profile["goal_count"], 0);
    assert!(profile["photo_url"].is_null());
}

#[tokio::test]
async fn test_photo_upload_streams_progress_then_complete() {
    let (app, state) = create_test_app();
    let uid = signed_in_user(&state, "ada@example.com").await;

    let response = app
        .oneshot(json_request(
            "POST",
            "/api/profile/photo",
            json!({ "image": jpeg_data_uri(150 * 1024) }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "text/event-stream"
    );

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();

    assert!(text.contains("event: progress"));
    assert!(text.contains("\"percent\":100"));
    assert!(text.contains("event: complete"));
    assert!(!text.contains("event: error"));

    let view = state.profile.snapshot(&uid).await.unwrap();
    assert!(view.user.unwrap().photo_url.is_some());
}

#[tokio::test]
async fn test_photo_upload_failure_streams_error() {
    let (app, state) = create_test_app();
    signed_in_user(&state, "ada@example.com").await;
    state.backend.blobs.as_memory().unwrap().set_offline(true);

    let response = app
        .oneshot(json_request(
            "POST",
            "/api/profile/photo",
            json!({ "image": jpeg_data_uri(16) }),
        ))
        .await
        .unwrap();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();

    assert!(text.contains("event: error"));
    assert!(text.contains("Could not upload image. Please try again."));
    assert!(!text.contains("event: complete"));
}

#[tokio::test]
async fn test_photo_upload_rejects_server_paths() {
    let (app, state) = create_test_app();
    signed_in_user(&state, "ada@example.com").await;

    for image in ["/etc/passwd", "file:///etc/passwd", "relative/photo.jpg"] {
        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/api/profile/photo",
                json!({ "image": image }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{image}");
        assert_eq!(body_json(response).await["error"], "validation");
    }

    assert!(state.backend.blobs.as_memory().unwrap().is_empty());
}

#[tokio::test]
async fn test_security_headers_applied() {
    let (app, _) = create_test_app();
    let response = app.oneshot(get("/health")).await.unwrap();
    assert_eq!(
        response.headers().get("X-Content-Type-Options").unwrap(),
        "nosniff"
    );
}
