// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Access-policy evaluation.
//!
//! # Architecture
//!
//! 1. **Types** ([`types`]): subjects, resources, decisions
//! 2. **Resolver** ([`resolver`]): user id → user + direct groups
//! 3. **Engine** ([`engine`]): filter candidate policies, then fold with Deny
//!    as the dominant element
//!
//! # Evaluation Flow
//!
//! ```text
//! resolve_subject(user_id, directory)
//!     │
//!     └── evaluate(subject, action, resource, app_id, policies)
//!             │
//!             ├── filter: action ∈ actions, same resource, subject match, app active
//!             │
//!             └── combine: any Deny → Deny
//!                          some Allow → Allow
//!                          nothing    → Deny
//! ```
//!
//! # Example
//!
//! ```
//! use filez_server_auth::abac::{evaluate, resolve_subject, Decision, DirectorySnapshot, ResourceRef};
//! use filez_server_auth::{AccessPolicy, Action, AppId, Effect, NewAccessPolicy, ResourceId, SubjectType, UserId};
//!
//! let alice = UserId::generate();
//! let bob = UserId::generate();
//! let file_group = ResourceRef::file_group(ResourceId::generate());
//!
//! let grant = AccessPolicy::new(alice, NewAccessPolicy {
//!     name: "bob may list".to_string(),
//!     actions: [Action::FileGroupsListFiles].into_iter().collect(),
//!     effect: Effect::Allow,
//!     resource_type: file_group.resource_type,
//!     resource_id: file_group.resource_id,
//!     subject_type: SubjectType::User,
//!     subject_id: bob.into_inner(),
//!     context_app_ids: Default::default(),
//! }).unwrap();
//!
//! let directory = DirectorySnapshot::new().with_user(bob);
//! let subject = resolve_subject(bob, &directory).unwrap();
//! let app = AppId::generate();
//!
//! assert_eq!(evaluate(&subject, Action::FileGroupsListFiles, &file_group, app, &[grant]), Decision::Allow);
//! assert_eq!(evaluate(&subject, Action::FileGroupsListFiles, &file_group, app, &[]), Decision::Deny);
//! ```

pub mod engine;
pub mod resolver;
pub mod types;

pub use engine::*;
pub use resolver::*;
pub use types::*;
