// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Storage seams for Filez access control.
//!
//! The traits here are what the access service reads and writes through:
//! - [`AccessPolicyStore`] - policy records, including candidate lookup
//! - [`UserStore`] / [`UserGroupStore`] - users, groups and directory snapshots
//! - [`ResourceOwnerStore`] - who owns a file group, file, user or group
//!
//! [`MemoryStore`] implements all of them with per-record read-after-write
//! consistency.

pub mod access_policy;
pub mod error;
pub mod memory;
pub mod resource;
#[cfg(any(test, feature = "testing"))]
pub mod testing;
pub mod user_group;

pub use access_policy::AccessPolicyStore;
pub use error::{DbError, Result};
pub use memory::MemoryStore;
pub use resource::ResourceOwnerStore;
pub use user_group::{UserGroupStore, UserStore};
