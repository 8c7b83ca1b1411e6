// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Core type definitions for access policies.
//!
//! - **ID newtypes**: Type-safe wrappers around UUIDs ([`UserId`], [`UserGroupId`],
//!   [`AccessPolicyId`], [`AppId`], [`ResourceId`]) preventing accidental mixing
//! - **Policy vocabulary**: [`Effect`], [`SubjectType`], [`Subject`], [`ResourceType`]
//!   and [`Action`]
//!
//! All ID types serialize transparently as UUID strings. Actions and resource
//! types use their PascalCase variant names on the wire (`FileGroupsListFiles`).

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// =============================================================================
// ID Newtypes
// =============================================================================

macro_rules! define_id_type {
	($name:ident, $doc:expr) => {
		#[doc = $doc]
		#[derive(
			Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
		)]
		#[serde(transparent)]
		pub struct $name(Uuid);

		impl $name {
			/// Create a new ID from a UUID.
			pub fn new(id: Uuid) -> Self {
				Self(id)
			}

			/// Generate a new random ID.
			pub fn generate() -> Self {
				Self(Uuid::new_v4())
			}

			/// Get the inner UUID value.
			pub fn into_inner(self) -> Uuid {
				self.0
			}

			/// Get a reference to the inner UUID.
			pub fn as_uuid(&self) -> &Uuid {
				&self.0
			}
		}

		impl fmt::Display for $name {
			fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
				write!(f, "{}", self.0)
			}
		}

		impl From<Uuid> for $name {
			fn from(id: Uuid) -> Self {
				Self(id)
			}
		}

		impl From<$name> for Uuid {
			fn from(id: $name) -> Self {
				id.0
			}
		}
	};
}

define_id_type!(UserId, "Unique identifier for a user.");
define_id_type!(UserGroupId, "Unique identifier for a user group.");
define_id_type!(AccessPolicyId, "Unique identifier for an access policy.");
define_id_type!(AppId, "Unique identifier for a calling application.");
define_id_type!(ResourceId, "Identifier of a concrete resource instance of any type.");

impl From<UserId> for ResourceId {
	fn from(id: UserId) -> Self {
		Self(id.0)
	}
}

impl From<UserGroupId> for ResourceId {
	fn from(id: UserGroupId) -> Self {
		Self(id.0)
	}
}

// =============================================================================
// Effect
// =============================================================================

/// Polarity of a policy grant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Effect {
	Allow,
	Deny,
}

impl fmt::Display for Effect {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Effect::Allow => write!(f, "Allow"),
			Effect::Deny => write!(f, "Deny"),
		}
	}
}

// =============================================================================
// Subjects
// =============================================================================

/// Kind of principal a policy is granted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SubjectType {
	User,
	UserGroup,
}

impl fmt::Display for SubjectType {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			SubjectType::User => write!(f, "User"),
			SubjectType::UserGroup => write!(f, "UserGroup"),
		}
	}
}

/// A typed principal: either a single user or a user group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Subject {
	User(UserId),
	UserGroup(UserGroupId),
}

impl Subject {
	/// Builds a subject from its wire representation.
	pub fn from_parts(subject_type: SubjectType, subject_id: Uuid) -> Self {
		match subject_type {
			SubjectType::User => Subject::User(UserId::new(subject_id)),
			SubjectType::UserGroup => Subject::UserGroup(UserGroupId::new(subject_id)),
		}
	}

	pub fn subject_type(&self) -> SubjectType {
		match self {
			Subject::User(_) => SubjectType::User,
			Subject::UserGroup(_) => SubjectType::UserGroup,
		}
	}

	pub fn id(&self) -> Uuid {
		match self {
			Subject::User(id) => id.into_inner(),
			Subject::UserGroup(id) => id.into_inner(),
		}
	}
}

// =============================================================================
// Resource Types
// =============================================================================

/// Kinds of resources a policy can target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ResourceType {
	File,
	FileGroup,
	User,
	UserGroup,
}

impl ResourceType {
	/// Returns all resource types.
	pub fn all() -> &'static [ResourceType] {
		&[
			ResourceType::File,
			ResourceType::FileGroup,
			ResourceType::User,
			ResourceType::UserGroup,
		]
	}
}

impl fmt::Display for ResourceType {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			ResourceType::File => write!(f, "File"),
			ResourceType::FileGroup => write!(f, "FileGroup"),
			ResourceType::User => write!(f, "User"),
			ResourceType::UserGroup => write!(f, "UserGroup"),
		}
	}
}

// =============================================================================
// Actions
// =============================================================================

/// Named capabilities a policy can govern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Action {
	FilesCreate,
	FilesGet,
	FilesGetContent,
	FilesUpdate,
	FilesDelete,

	FileGroupsCreate,
	FileGroupsList,
	FileGroupsGet,
	FileGroupsUpdate,
	FileGroupsDelete,
	FileGroupsListFiles,
	FileGroupsUpdateMembers,

	UsersCreate,
	UsersList,
	UsersGet,
	UsersUpdate,
	UsersDelete,

	UserGroupsCreate,
	UserGroupsList,
	UserGroupsGet,
	UserGroupsUpdate,
	UserGroupsDelete,
	UserGroupsListUsers,
	UserGroupsUpdateMembers,

	/// Create, update or delete policies naming a resource. Applies to every
	/// resource type.
	AccessPoliciesManage,
}

impl Action {
	/// Returns all actions.
	pub fn all() -> &'static [Action] {
		use Action::*;
		&[
			FilesCreate,
			FilesGet,
			FilesGetContent,
			FilesUpdate,
			FilesDelete,
			FileGroupsCreate,
			FileGroupsList,
			FileGroupsGet,
			FileGroupsUpdate,
			FileGroupsDelete,
			FileGroupsListFiles,
			FileGroupsUpdateMembers,
			UsersCreate,
			UsersList,
			UsersGet,
			UsersUpdate,
			UsersDelete,
			UserGroupsCreate,
			UserGroupsList,
			UserGroupsGet,
			UserGroupsUpdate,
			UserGroupsDelete,
			UserGroupsListUsers,
			UserGroupsUpdateMembers,
			AccessPoliciesManage,
		]
	}

	/// The resource type this action operates on, or `None` if it applies to
	/// every type.
	pub fn resource_type(&self) -> Option<ResourceType> {
		use Action::*;
		match self {
			FilesCreate | FilesGet | FilesGetContent | FilesUpdate | FilesDelete => {
				Some(ResourceType::File)
			}
			FileGroupsCreate | FileGroupsList | FileGroupsGet | FileGroupsUpdate
			| FileGroupsDelete | FileGroupsListFiles | FileGroupsUpdateMembers => {
				Some(ResourceType::FileGroup)
			}
			UsersCreate | UsersList | UsersGet | UsersUpdate | UsersDelete => {
				Some(ResourceType::User)
			}
			UserGroupsCreate | UserGroupsList | UserGroupsGet | UserGroupsUpdate
			| UserGroupsDelete | UserGroupsListUsers | UserGroupsUpdateMembers => {
				Some(ResourceType::UserGroup)
			}
			AccessPoliciesManage => None,
		}
	}

	/// Returns true if this action may appear in a policy targeting `resource_type`.
	pub fn applies_to(&self, resource_type: ResourceType) -> bool {
		self.resource_type().map_or(true, |rt| rt == resource_type)
	}

	/// Returns true if the action is exercised without naming a resource
	/// instance (creating or listing).
	pub fn is_type_level(&self) -> bool {
		use Action::*;
		matches!(
			self,
			FilesCreate
				| FileGroupsCreate
				| FileGroupsList
				| UsersCreate
				| UsersList
				| UserGroupsCreate
				| UserGroupsList
		)
	}
}

impl fmt::Display for Action {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		fmt::Debug::fmt(self, f)
	}
}

impl std::str::FromStr for Action {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Action::all()
			.iter()
			.copied()
			.find(|a| a.to_string() == s)
			.ok_or_else(|| format!("unknown action '{s}'"))
	}
}

impl std::str::FromStr for ResourceType {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		ResourceType::all()
			.iter()
			.copied()
			.find(|rt| rt.to_string() == s)
			.ok_or_else(|| format!("unknown resource type '{s}'"))
	}
}
