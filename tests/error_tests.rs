// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use axum::http::StatusCode;
use axum::response::IntoResponse;
use want_goals::error::{AppError, ErrorResponse};

#[test]
fn test_validation_message_is_shown() {
    let err = AppError::Validation("Passwords do not match.".to_string());
    let (status, code, details) = err.parts();
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(code, "validation");
    assert_eq!(details.as_deref(), Some("Passwords do not match."));
}

#[test]
fn test_backend_details_are_not_leaked() {
    let err = AppError::Database("grpc status: permission denied on projects/x".to_string());
    let body = ErrorResponse::from(&err);
    assert_eq!(body.error, "database_error");
    assert!(body.details.is_none());

    let err = AppError::Storage("HTTP 503 from bucket".to_string());
    let body = ErrorResponse::from(&err);
    assert_eq!(body.error, "storage_error");
    assert_eq!(
        body.details.as_deref(),
        Some("Could not upload image. Please try again.")
    );

    let err = AppError::Internal(anyhow::anyhow!("secret internals"));
    assert_eq!(
        err.into_response().status(),
        StatusCode::INTERNAL_SERVER_ERROR
    );
}

#[test]
fn test_auth_errors_map_to_statuses() {
    assert_eq!(AppError::Unauthorized.parts().0, StatusCode::UNAUTHORIZED);
    assert_eq!(AppError::InvalidCredentials.parts().0, StatusCode::UNAUTHORIZED);
    assert_eq!(AppError::EmailInUse.parts().0, StatusCode::CONFLICT);
    assert_eq!(AppError::WeakPassword.parts().0, StatusCode::BAD_REQUEST);
    assert_eq!(
        AppError::Conflict("An upload is already in progress".to_string())
            .parts()
            .0,
        StatusCode::CONFLICT
    );
}
