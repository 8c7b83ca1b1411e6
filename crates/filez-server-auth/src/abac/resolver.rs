// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Subject resolution: a user id to the user plus its direct groups.
//!
//! Resolution reads from a [`SubjectDirectory`], which is a synchronous,
//! point-in-time view. Stores build a [`DirectorySnapshot`] before calling in,
//! so resolution itself never blocks.

use std::collections::{BTreeMap, BTreeSet};

use tracing::instrument;

use super::types::ResolvedSubject;
use crate::error::AuthError;
use crate::types::{UserGroupId, UserId};
use crate::user_group::UserGroup;

/// Read-only lookup of users and their direct group memberships.
pub trait SubjectDirectory {
	fn contains_user(&self, user_id: &UserId) -> bool;

	/// Groups listing `user_id` as a member. Groups are never members of
	/// other groups, so no closure is computed.
	fn groups_of(&self, user_id: &UserId) -> BTreeSet<UserGroupId>;
}

/// An immutable copy of the users and group memberships relevant to a request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirectorySnapshot {
	users: BTreeSet<UserId>,
	groups: BTreeMap<UserGroupId, BTreeSet<UserId>>,
}

impl DirectorySnapshot {
	pub fn new() -> Self {
		Self::default()
	}

	/// Builder: add a known user.
	pub fn with_user(mut self, user_id: UserId) -> Self {
		self.users.insert(user_id);
		self
	}

	/// Builder: add a group and its members.
	pub fn with_group(
		mut self,
		group_id: UserGroupId,
		members: impl IntoIterator<Item = UserId>,
	) -> Self {
		self.groups.entry(group_id).or_default().extend(members);
		self
	}

	/// Builds a snapshot from stored records.
	pub fn from_records<'a>(
		users: impl IntoIterator<Item = UserId>,
		groups: impl IntoIterator<Item = &'a UserGroup>,
	) -> Self {
		let mut snapshot = Self::default();
		snapshot.users.extend(users);
		for group in groups {
			snapshot = snapshot.with_group(group.id, group.members.iter().copied());
		}
		snapshot
	}
}

impl SubjectDirectory for DirectorySnapshot {
	fn contains_user(&self, user_id: &UserId) -> bool {
		self.users.contains(user_id)
	}

	fn groups_of(&self, user_id: &UserId) -> BTreeSet<UserGroupId> {
		self
			.groups
			.iter()
			.filter(|(_, members)| members.contains(user_id))
			.map(|(group_id, _)| *group_id)
			.collect()
	}
}

/// Resolves `user_id` into its effective subject set.
///
/// # Errors
///
/// Returns [`AuthError::SubjectNotFound`] if the directory does not know the user.
#[instrument(level = "debug", skip(directory), fields(user_id = %user_id))]
pub fn resolve_subject<D: SubjectDirectory + ?Sized>(
	user_id: UserId,
	directory: &D,
) -> Result<ResolvedSubject, AuthError> {
	if !directory.contains_user(&user_id) {
		return Err(AuthError::SubjectNotFound(user_id));
	}

	let subject = ResolvedSubject::new(user_id).with_groups(directory.groups_of(&user_id));
	tracing::debug!(group_count = subject.group_ids.len(), "resolved subject");
	Ok(subject)
}
