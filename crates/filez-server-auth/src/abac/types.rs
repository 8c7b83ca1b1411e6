// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Type definitions for policy evaluation.
//!
//! - [`ResolvedSubject`]: the requesting user plus its direct groups
//! - [`ResourceRef`]: the resource type and, optionally, the instance acted upon
//! - [`Decision`], [`DecisionReason`], [`Evaluation`]: the evaluator's output
//!
//! All attributes are computed before evaluation; nothing here touches storage.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::{AccessPolicyId, ResourceId, ResourceType, SubjectType, UserGroupId, UserId};

/// The effective subject set of a request: the user and every group it is a
/// direct member of.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedSubject {
	pub user_id: UserId,
	pub group_ids: BTreeSet<UserGroupId>,
}

impl ResolvedSubject {
	/// Creates a subject with no group memberships.
	pub fn new(user_id: UserId) -> Self {
		Self {
			user_id,
			group_ids: BTreeSet::new(),
		}
	}

	/// Builder: add group memberships.
	pub fn with_groups(mut self, group_ids: impl IntoIterator<Item = UserGroupId>) -> Self {
		self.group_ids.extend(group_ids);
		self
	}

	pub fn is_member_of(&self, group_id: &UserGroupId) -> bool {
		self.group_ids.contains(group_id)
	}

	/// Returns true if a policy granted to `(subject_type, subject_id)` applies
	/// to this subject.
	pub fn matches(&self, subject_type: SubjectType, subject_id: Uuid) -> bool {
		match subject_type {
			SubjectType::User => self.user_id.into_inner() == subject_id,
			SubjectType::UserGroup => self.is_member_of(&UserGroupId::new(subject_id)),
		}
	}
}

/// The object of a request, identified by type and optional instance id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceRef {
	pub resource_type: ResourceType,
	pub resource_id: Option<ResourceId>,
}

impl ResourceRef {
	pub fn new(resource_type: ResourceType, resource_id: ResourceId) -> Self {
		Self {
			resource_type,
			resource_id: Some(resource_id),
		}
	}

	/// A request that names no instance, such as creating or listing.
	pub fn type_level(resource_type: ResourceType) -> Self {
		Self {
			resource_type,
			resource_id: None,
		}
	}

	pub fn file(id: ResourceId) -> Self {
		Self::new(ResourceType::File, id)
	}

	pub fn file_group(id: ResourceId) -> Self {
		Self::new(ResourceType::FileGroup, id)
	}

	pub fn user(id: UserId) -> Self {
		Self::new(ResourceType::User, id.into())
	}

	pub fn user_group(id: UserGroupId) -> Self {
		Self::new(ResourceType::UserGroup, id.into())
	}

	pub fn is_type_level(&self) -> bool {
		self.resource_id.is_none()
	}
}

impl fmt::Display for ResourceRef {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self.resource_id {
			Some(id) => write!(f, "{}:{}", self.resource_type, id),
			None => write!(f, "{}:*", self.resource_type),
		}
	}
}

/// The two-valued outcome of an evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Decision {
	Allow,
	Deny,
}

impl Decision {
	pub fn is_allowed(&self) -> bool {
		matches!(self, Decision::Allow)
	}
}

impl fmt::Display for Decision {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Decision::Allow => write!(f, "allow"),
			Decision::Deny => write!(f, "deny"),
		}
	}
}

/// Why a decision was reached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DecisionReason {
	/// No policy matched; the fail-closed default applied.
	NoMatchingPolicy,
	/// Only Allow policies matched.
	AllowedByPolicies { policy_ids: Vec<AccessPolicyId> },
	/// A matching Deny policy overrode everything else.
	DeniedByPolicy { policy_id: AccessPolicyId },
	/// The subject owns the resource. Produced by the access service before
	/// policies are consulted.
	ResourceOwner,
}

/// A decision together with its justification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Evaluation {
	pub decision: Decision,
	pub reason: DecisionReason,
}

impl Evaluation {
	pub fn no_matching_policy() -> Self {
		Self {
			decision: Decision::Deny,
			reason: DecisionReason::NoMatchingPolicy,
		}
	}

	pub fn resource_owner() -> Self {
		Self {
			decision: Decision::Allow,
			reason: DecisionReason::ResourceOwner,
		}
	}

	pub fn is_allowed(&self) -> bool {
		self.decision.is_allowed()
	}
}
