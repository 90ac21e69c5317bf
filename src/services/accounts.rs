// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Account flows: signup, sign-in and sign-out.

use crate::db::{collections, to_document, DocumentStore};
use crate::error::AppError;
use crate::models::SignupForm;
use crate::services::identity::{AuthUser, IdentityService};

/// Account service.
#[derive(Clone)]
pub struct AccountService {
    identity: IdentityService,
    documents: DocumentStore,
}

impl AccountService {
    pub fn new(identity: IdentityService, documents: DocumentStore) -> Self {
        Self {
            identity,
            documents,
        }
    }

    /// Register a new user and return the identity id.
    ///
    /// 1. Form checks (no backend call on failure)
    /// 2. Create the account
    /// 3. Write `users/{uid}`
    /// 4. Sign out so the user logs in separately
    pub async fn sign_up(&self, form: &SignupForm) -> Result<String, AppError> {
        form.check()?;

        let uid = self
            .identity
            .create_account(form.email.trim(), &form.password)
            .await
            .inspect_err(|e| tracing::warn!(error = %e, "Account creation failed"))?;

        let record = form.to_record(chrono::Utc::now());
        let written = match to_document(&record) {
            Ok(fields) => {
                self.documents
                    .set_document(collections::USERS, &uid, &fields)
                    .await
            }
            Err(e) => Err(e),
        };

        // The new account is signed out whether or not the profile landed.
        self.identity.sign_out();
        written.inspect_err(|e| tracing::error!(uid = %uid, error = %e, "Failed to write user profile"))?;

        tracing::info!(uid = %uid, username = %form.username, "User signed up");
        Ok(uid)
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<AuthUser, AppError> {
        if email.trim().is_empty() || password.is_empty() {
            return Err(AppError::Validation(
                "Please enter your email and password.".to_string(),
            ));
        }
        self.identity.sign_in(email.trim(), password).await
    }

    pub fn sign_out(&self) {
        self.identity.sign_out();
    }
}
