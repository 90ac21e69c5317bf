// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application configuration loaded from environment variables.
//!
//! The Firebase project identifiers are the same values the mobile client
//! is built with; they are read once at startup.

use std::env;
use std::time::Duration;

/// Which backend implementation to connect to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendMode {
    /// Hosted Firebase project (Auth, Firestore, Cloud Storage).
    Firebase,
    /// In-process backend for local development and tests.
    Memory,
}

impl std::str::FromStr for BackendMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "firebase" => Ok(BackendMode::Firebase),
            "memory" => Ok(BackendMode::Memory),
            other => Err(ConfigError::Invalid("WANT_BACKEND", other.to_string())),
        }
    }
}

/// Firebase project identifiers.
#[derive(Debug, Clone)]
pub struct FirebaseConfig {
    /// Web API key (public, used for Identity Toolkit calls)
    pub api_key: String,
    pub auth_domain: String,
    pub project_id: String,
    /// Cloud Storage bucket for profile photos
    pub storage_bucket: String,
    pub messaging_sender_id: String,
    pub app_id: String,
}

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub backend: BackendMode,
    pub firebase: FirebaseConfig,
    /// Frontend origin allowed by CORS
    pub frontend_url: String,
    /// Listen address; loopback unless BIND_ADDR says otherwise
    pub bind_address: String,
    /// Server port
    pub port: u16,
    /// Refresh interval for Firestore-backed live snapshots
    pub snapshot_poll_interval: Duration,
}

const DEFAULT_POLL_SECS: u64 = 2;
const DEFAULT_BIND_ADDRESS: &str = "127.0.0.1";

impl Default for Config {
    /// Default config for testing only.
    fn default() -> Self {
        Self {
            backend: BackendMode::Memory,
            firebase: FirebaseConfig {
                api_key: "test-api-key".to_string(),
                auth_domain: "test-project.firebaseapp.com".to_string(),
                project_id: "test-project".to_string(),
                storage_bucket: "test-project.appspot.com".to_string(),
                messaging_sender_id: "000000000000".to_string(),
                app_id: "1:000000000000:web:test".to_string(),
            },
            frontend_url: "http://localhost:8081".to_string(),
            bind_address: DEFAULT_BIND_ADDRESS.to_string(),
            port: 8080,
            snapshot_poll_interval: Duration::from_millis(50),
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// With `WANT_BACKEND=memory` the Firebase identifiers are optional.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let backend: BackendMode = env::var("WANT_BACKEND")
            .unwrap_or_else(|_| "firebase".to_string())
            .parse()?;

        let required = |name: &'static str| -> Result<String, ConfigError> {
            match backend {
                BackendMode::Firebase => env::var(name)
                    .map(|v| v.trim().to_string())
                    .map_err(|_| ConfigError::Missing(name)),
                BackendMode::Memory => Ok(env::var(name).unwrap_or_else(|_| "local-dev".to_string())),
            }
        };

        let project_id = required("FIREBASE_PROJECT_ID")?;
        let firebase = FirebaseConfig {
            api_key: required("FIREBASE_API_KEY")?,
            auth_domain: env::var("FIREBASE_AUTH_DOMAIN")
                .unwrap_or_else(|_| format!("{}.firebaseapp.com", project_id)),
            storage_bucket: env::var("FIREBASE_STORAGE_BUCKET")
                .unwrap_or_else(|_| format!("{}.appspot.com", project_id)),
            messaging_sender_id: env::var("FIREBASE_MESSAGING_SENDER_ID").unwrap_or_default(),
            app_id: env::var("FIREBASE_APP_ID").unwrap_or_default(),
            project_id,
        };

        let poll_secs = match env::var("SNAPSHOT_POLL_SECS") {
            Ok(raw) => raw
                .parse::<u64>()
                .ok()
                .filter(|secs| *secs > 0)
                .ok_or(ConfigError::Invalid("SNAPSHOT_POLL_SECS", raw))?,
            Err(_) => DEFAULT_POLL_SECS,
        };

        Ok(Self {
            backend,
            firebase,
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:8081".to_string()),
            bind_address: env::var("BIND_ADDR")
                .unwrap_or_else(|_| DEFAULT_BIND_ADDRESS.to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .unwrap_or(8080),
            snapshot_poll_interval: Duration::from_secs(poll_secs),
        })
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {0}: {1}")]
    Invalid(&'static str, String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_from_env() {
        env::set_var("WANT_BACKEND", "firebase");
        env::set_var("FIREBASE_API_KEY", "test_key");
        env::set_var("FIREBASE_PROJECT_ID", "grind-test");
        env::remove_var("FIREBASE_STORAGE_BUCKET");
        env::remove_var("SNAPSHOT_POLL_SECS");
        env::remove_var("BIND_ADDR");

        let config = Config::from_env().expect("Config should load");

        assert_eq!(config.backend, BackendMode::Firebase);
        assert_eq!(config.firebase.api_key, "test_key");
        assert_eq!(config.firebase.storage_bucket, "grind-test.appspot.com");
        assert_eq!(config.firebase.auth_domain, "grind-test.firebaseapp.com");
        assert_eq!(config.snapshot_poll_interval, Duration::from_secs(2));
        assert_eq!(config.bind_address, "127.0.0.1");
    }

    #[test]
    fn test_backend_mode_parse() {
        assert_eq!("Memory".parse::<BackendMode>().unwrap(), BackendMode::Memory);
        assert_eq!(" firebase ".parse::<BackendMode>().unwrap(), BackendMode::Firebase);
        assert!("sqlite".parse::<BackendMode>().is_err());
    }
}
