// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod accounts;
pub mod goals;
pub mod identity;
pub mod image;
pub mod profile;
pub mod storage;

pub use accounts::AccountService;
pub use goals::GoalRepository;
pub use identity::{AuthUser, IdentityService};
pub use profile::ProfileService;
pub use storage::{BlobStorage, UploadProgress};
