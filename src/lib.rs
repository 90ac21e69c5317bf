// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Want: record personal goals backed by Firebase
//!
//! This crate provides the local API that the Want mobile client talks to.
//! Identity, document storage and blob storage are delegated to the hosted
//! backend through an explicitly constructed [`backend::Backend`] handle.

pub mod backend;
pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod snapshots;
pub mod time_utils;

use backend::Backend;
use config::Config;
use services::{AccountService, GoalRepository, ProfileService};

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub backend: Backend,
    pub accounts: AccountService,
    pub goals: GoalRepository,
    pub profile: ProfileService,
}

impl AppState {
    /// Wire the services on top of a connected backend.
    pub fn new(config: Config, backend: Backend) -> Self {
        let goals = GoalRepository::new(backend.documents.clone());
        let accounts = AccountService::new(backend.identity.clone(), backend.documents.clone());
        let profile = ProfileService::new(backend.clone(), goals.clone());

        Self {
            config,
            backend,
            accounts,
            goals,
            profile,
        }
    }
}
