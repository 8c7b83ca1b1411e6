// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Access-policy authorization for Filez.
//!
//! This crate provides:
//! - Policy records and partial-update changesets
//! - Users and flat user groups
//! - Subject resolution (user → user + direct groups)
//! - The policy evaluator (deny-wins, fail-closed)
//! - The authorization guard that maps decisions to permit/reject
//! - Audit records
//!
//! Everything here is pure. Storage, transport and mutation authority checks
//! live in the crates that call in.
//!
//! # Security Considerations
//!
//! - Absence of a matching policy is always a Deny
//! - One matching Deny overrides any number of Allows, whatever the subject type
//! - A policy without a resource id never gates a specific resource

pub mod abac;
pub mod audit;
pub mod error;
pub mod guard;
pub mod policy;
pub mod types;
pub mod user_group;

pub use abac::{
	evaluate, explain, policy_matches, resolve_subject, Decision, DecisionReason,
	DirectorySnapshot, Evaluation, ResolvedSubject, ResourceRef, SubjectDirectory,
};
pub use audit::{AuditEventType, AuditLogBuilder, AuditLogEntry};
pub use error::AuthError;
pub use guard::{authorize, check, enforce, Forbidden, GuardError};
pub use policy::{AccessPolicy, AccessPolicyChangeset, NewAccessPolicy, Patch};
pub use types::*;
pub use user_group::{MembershipDelta, User, UserGroup};
