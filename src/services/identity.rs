// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Identity service: account creation, sign-in/out and the current user.
//!
//! Firebase accounts go through the Identity Toolkit REST API. The signed
//! in user is process-wide session state, observable as a snapshot stream.

use crate::error::AppError;
use crate::snapshots::Snapshots;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, RwLock};
use tokio::sync::broadcast;

const IDENTITY_TOOLKIT_URL: &str = "https://identitytoolkit.googleapis.com/v1";
const MIN_PASSWORD_LEN: usize = 6;
const SESSION_CHANNEL_CAPACITY: usize = 64;

/// Signed-in identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthUser {
    pub uid: String,
    pub email: String,
}

#[derive(Debug, Clone)]
struct Session {
    user: AuthUser,
    /// Firebase ID token, used for Cloud Storage requests
    id_token: Option<String>,
}

/// Current session plus a feed of every change to it.
struct SessionState {
    current: RwLock<Option<Session>>,
    changes: broadcast::Sender<Option<AuthUser>>,
}

impl SessionState {
    fn user(&self) -> Option<AuthUser> {
        self.current
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .as_ref()
            .map(|s| s.user.clone())
    }

    fn id_token(&self) -> Option<String> {
        self.current
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .as_ref()
            .and_then(|s| s.id_token.clone())
    }

    /// Swap in a new session, publish the change, return the old one.
    fn replace(&self, session: Option<Session>) -> Option<Session> {
        let user = session.as_ref().map(|s| s.user.clone());
        let previous = {
            let mut current = self
                .current
                .write()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            std::mem::replace(&mut *current, session)
        };
        // No observers is fine.
        let _ = self.changes.send(user);
        previous
    }
}

/// Identity service handle.
#[derive(Clone)]
pub struct IdentityService {
    provider: Provider,
    session: Arc<SessionState>,
}

#[derive(Clone)]
enum Provider {
    Firebase(FirebaseAuthClient),
    Memory(MemoryAccounts),
}

impl IdentityService {
    /// Identity Toolkit client for the given Web API key.
    ///
    /// Set FIREBASE_AUTH_EMULATOR_HOST to target the Auth emulator.
    pub fn firebase(api_key: &str) -> Self {
        let base_url = match std::env::var("FIREBASE_AUTH_EMULATOR_HOST") {
            Ok(host) => {
                tracing::info!(host = %host, "Using Firebase Auth emulator");
                format!("http://{}/identitytoolkit.googleapis.com/v1", host)
            }
            Err(_) => IDENTITY_TOOLKIT_URL.to_string(),
        };
        Self::with_provider(Provider::Firebase(FirebaseAuthClient {
            http: reqwest::Client::new(),
            base_url,
            api_key: api_key.to_string(),
        }))
    }

    /// In-process accounts for local development and tests.
    pub fn in_memory() -> Self {
        Self::with_provider(Provider::Memory(MemoryAccounts::default()))
    }

    fn with_provider(provider: Provider) -> Self {
        let (changes, _) = broadcast::channel(SESSION_CHANNEL_CAPACITY);
        Self {
            provider,
            session: Arc::new(SessionState {
                current: RwLock::new(None),
                changes,
            }),
        }
    }

    /// Create an account and sign it in. Returns the new identity id.
    pub async fn create_account(&self, email: &str, password: &str) -> Result<String, AppError> {
        let session = match &self.provider {
            Provider::Firebase(client) => client.sign_up(email, password).await?,
            Provider::Memory(accounts) => accounts.create(email, password)?,
        };
        let uid = session.user.uid.clone();

        tracing::info!(uid = %uid, "Account created");
        self.session.replace(Some(session));
        Ok(uid)
    }

    /// Sign in with email and password.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<AuthUser, AppError> {
        let session = match &self.provider {
            Provider::Firebase(client) => client.sign_in(email, password).await?,
            Provider::Memory(accounts) => accounts.sign_in(email, password)?,
        };
        let user = session.user.clone();

        tracing::info!(uid = %user.uid, "Signed in");
        self.session.replace(Some(session));
        Ok(user)
    }

    /// Sign out the current user. Signing out while signed out is a no-op.
    pub fn sign_out(&self) {
        if let Some(previous) = self.session.replace(None) {
            tracing::info!(uid = %previous.user.uid, "Signed out");
        }
    }

    pub fn current_user(&self) -> Option<AuthUser> {
        self.session.user()
    }

    /// ID token of the current session, if the provider issues one.
    pub fn id_token(&self) -> Option<String> {
        self.session.id_token()
    }

    /// The current user now, then again on every sign-in or sign-out.
    ///
    /// Every change is delivered in order, including a sign-in followed
    /// immediately by a sign-out.
    pub fn observe_current_user(&self) -> Snapshots<Option<AuthUser>> {
        let session = self.session.clone();
        // Subscribe before the first read so no change is missed.
        let mut changes = session.changes.subscribe();
        let mut last = session.user();

        Snapshots::spawn(move |tx| async move {
            if tx.send(last.clone()).await.is_err() {
                return;
            }
            loop {
                let user = match changes.recv().await {
                    Ok(user) => user,
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "Session observer lagged");
                        session.user()
                    }
                    Err(broadcast::error::RecvError::Closed) => return,
                };
                if user == last {
                    continue;
                }
                if tx.send(user.clone()).await.is_err() {
                    return;
                }
                last = user;
            }
        })
    }

    /// Number of accounts in the in-process provider (`None` for Firebase).
    pub fn memory_account_count(&self) -> Option<usize> {
        match &self.provider {
            Provider::Memory(accounts) => Some(accounts.accounts.len()),
            Provider::Firebase(_) => None,
        }
    }
}

// ─── Firebase Identity Toolkit ───────────────────────────────────

#[derive(Clone)]
struct FirebaseAuthClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PasswordRequest<'a> {
    email: &'a str,
    password: &'a str,
    return_secure_token: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PasswordResponse {
    local_id: String,
    #[serde(default)]
    email: Option<String>,
    id_token: String,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

impl FirebaseAuthClient {
    async fn sign_up(&self, email: &str, password: &str) -> Result<Session, AppError> {
        self.password_call("accounts:signUp", email, password).await
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, AppError> {
        self.password_call("accounts:signInWithPassword", email, password)
            .await
    }

    async fn password_call(
        &self,
        method: &str,
        email: &str,
        password: &str,
    ) -> Result<Session, AppError> {
        let url = format!("{}/{}", self.base_url, method);

        let response = self
            .http
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&PasswordRequest {
                email,
                password,
                return_secure_token: true,
            })
            .send()
            .await
            .map_err(|e| AppError::Network(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(match serde_json::from_str::<ErrorEnvelope>(&body) {
                Ok(envelope) => map_auth_error(&envelope.error.message),
                Err(_) => AppError::Identity(format!("HTTP {}: {}", status, body)),
            });
        }

        let body: PasswordResponse = response
            .json()
            .await
            .map_err(|e| AppError::Identity(format!("Malformed auth response: {}", e)))?;

        Ok(Session {
            user: AuthUser {
                uid: body.local_id,
                email: body.email.unwrap_or_else(|| email.to_string()),
            },
            id_token: Some(body.id_token),
        })
    }
}

/// Map Identity Toolkit error codes (e.g. `WEAK_PASSWORD : Password should
/// be at least 6 characters`) to application errors.
fn map_auth_error(message: &str) -> AppError {
    let code = message.split(':').next().unwrap_or_default().trim();
    match code {
        "EMAIL_EXISTS" => AppError::EmailInUse,
        "WEAK_PASSWORD" => AppError::WeakPassword,
        "INVALID_EMAIL" | "MISSING_EMAIL" => AppError::InvalidEmail,
        "MISSING_PASSWORD" => AppError::Validation("Password is required".to_string()),
        "EMAIL_NOT_FOUND"
        | "INVALID_PASSWORD"
        | "INVALID_LOGIN_CREDENTIALS"
        | "USER_DISABLED" => AppError::InvalidCredentials,
        _ => AppError::Identity(message.to_string()),
    }
}

// ─── In-process accounts ─────────────────────────────────────────

#[derive(Clone)]
struct MemoryAccount {
    uid: String,
    password: String,
}

#[derive(Clone, Default)]
struct MemoryAccounts {
    /// Keyed by lowercased email
    accounts: Arc<DashMap<String, MemoryAccount>>,
}

impl MemoryAccounts {
    fn create(&self, email: &str, password: &str) -> Result<Session, AppError> {
        let key = email.trim().to_lowercase();
        if key.is_empty() || !key.contains('@') {
            return Err(AppError::InvalidEmail);
        }
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AppError::WeakPassword);
        }

        let uid = crate::db::new_document_id()?;
        match self.accounts.entry(key.clone()) {
            dashmap::mapref::entry::Entry::Occupied(_) => return Err(AppError::EmailInUse),
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(MemoryAccount {
                    uid: uid.clone(),
                    password: password.to_string(),
                });
            }
        }

        Ok(Session {
            user: AuthUser { uid, email: key },
            id_token: None,
        })
    }

    fn sign_in(&self, email: &str, password: &str) -> Result<Session, AppError> {
        let key = email.trim().to_lowercase();
        let account = self
            .accounts
            .get(&key)
            .filter(|account| account.password == password)
            .ok_or(AppError::InvalidCredentials)?;

        Ok(Session {
            user: AuthUser {
                uid: account.uid.clone(),
                email: key,
            },
            id_token: None,
        })
    }
}
