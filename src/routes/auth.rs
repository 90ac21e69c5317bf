// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Account routes: signup, login, logout and the current session.

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

use crate::error::{AppError, Result};
use crate::models::SignupForm;
use crate::services::AuthUser;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/auth/signup", post(signup))
        .route("/api/auth/login", post(login))
        .route("/api/auth/logout", post(logout))
        .route("/api/session", get(session))
}

/// Response after a successful signup.
#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct SignupResponse {
    pub uid: String,
    pub message: String,
}

/// Register a new account. The new user is left signed out.
async fn signup(
    State(state): State<Arc<AppState>>,
    Json(form): Json<SignupForm>,
) -> Result<(StatusCode, Json<SignupResponse>)> {
    let uid = state.accounts.sign_up(&form).await?;

    Ok((
        StatusCode::CREATED,
        Json(SignupResponse {
            uid,
            message: "Account created successfully! Please log in.".to_string(),
        }),
    ))
}

#[derive(Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    email: String,
    #[serde(default)]
    password: String,
}

/// Signed-in identity.
#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct SessionResponse {
    pub uid: String,
    pub email: String,
}

impl From<AuthUser> for SessionResponse {
    fn from(user: AuthUser) -> Self {
        Self {
            uid: user.uid,
            email: user.email,
        }
    }
}

async fn login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<SessionResponse>> {
    let user = state.accounts.sign_in(&req.email, &req.password).await?;
    tracing::info!(uid = %user.uid, "User logged in");
    Ok(Json(user.into()))
}

async fn logout(State(state): State<Arc<AppState>>) -> StatusCode {
    state.accounts.sign_out();
    tracing::info!("User logged out");
    StatusCode::NO_CONTENT
}

/// Current identity, or 401 when signed out.
async fn session(State(state): State<Arc<AppState>>) -> Result<Json<SessionResponse>> {
    let user = state
        .backend
        .identity
        .current_user()
        .ok_or(AppError::Unauthorized)?;
    Ok(Json(user.into()))
}
