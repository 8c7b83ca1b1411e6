// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Users and flat user groups.
//!
//! Group membership is one level deep: a group lists users, never other groups.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{UserGroupId, UserId};

/// A user known to the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
	pub id: UserId,
	pub display_name: String,
	pub created_time: DateTime<Utc>,
}

impl User {
	/// Creates a new user with a generated ID.
	pub fn new(display_name: impl Into<String>) -> Self {
		Self {
			id: UserId::generate(),
			display_name: display_name.into(),
			created_time: Utc::now(),
		}
	}
}

/// A named set of users, owned by the user that created it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserGroup {
	pub id: UserGroupId,
	pub owner_id: UserId,
	pub name: String,
	#[serde(default)]
	pub members: BTreeSet<UserId>,
	pub created_time: DateTime<Utc>,
	pub modified_time: DateTime<Utc>,
}

/// Outcome of a membership update.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MembershipDelta {
	pub added: usize,
	pub removed: usize,
}

impl UserGroup {
	/// Creates an empty group owned by `owner_id`.
	pub fn new(owner_id: UserId, name: impl Into<String>) -> Self {
		let now = Utc::now();
		Self {
			id: UserGroupId::generate(),
			owner_id,
			name: name.into(),
			members: BTreeSet::new(),
			created_time: now,
			modified_time: now,
		}
	}

	pub fn is_member(&self, user_id: &UserId) -> bool {
		self.members.contains(user_id)
	}

	/// Adds then removes members. A user named in both lists ends up removed.
	pub fn apply_member_changes(
		&mut self,
		users_to_add: &[UserId],
		users_to_remove: &[UserId],
	) -> MembershipDelta {
		let mut delta = MembershipDelta::default();
		for user_id in users_to_add {
			if self.members.insert(*user_id) {
				delta.added += 1;
			}
		}
		for user_id in users_to_remove {
			if self.members.remove(user_id) {
				delta.removed += 1;
			}
		}
		self.modified_time = Utc::now();
		delta
	}
}
