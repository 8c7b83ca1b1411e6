// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! In-memory implementation of every store trait.
//!
//! All records live behind one [`RwLock`], so a write is visible to every
//! read that starts after it returns. Policy replacement is compare-and-swap
//! on `modified_time` and membership changes are applied as deltas under the
//! write lock, so concurrent mutations never overwrite each other.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use filez_server_auth::{
	AccessPolicy, AccessPolicyId, DirectorySnapshot, MembershipDelta, ResolvedSubject,
	ResourceRef, ResourceType, Subject, User, UserGroup, UserGroupId, UserId,
};
use tokio::sync::RwLock;

use crate::access_policy::AccessPolicyStore;
use crate::error::DbError;
use crate::resource::ResourceOwnerStore;
use crate::user_group::{UserGroupStore, UserStore};

#[derive(Debug, Default)]
struct Inner {
	users: BTreeMap<UserId, User>,
	groups: BTreeMap<UserGroupId, UserGroup>,
	policies: BTreeMap<AccessPolicyId, AccessPolicy>,
	owners: HashMap<ResourceRef, UserId>,
}

/// Shared in-memory store. Clones share the same records.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
	inner: Arc<RwLock<Inner>>,
}

impl MemoryStore {
	pub fn new() -> Self {
		Self::default()
	}

	/// Number of stored policies.
	pub async fn policy_count(&self) -> usize {
		self.inner.read().await.policies.len()
	}
}

#[async_trait]
impl AccessPolicyStore for MemoryStore {
	#[tracing::instrument(skip(self, policy), fields(policy_id = %policy.id))]
	async fn create_access_policy(&self, policy: &AccessPolicy) -> Result<(), DbError> {
		let mut inner = self.inner.write().await;
		if inner.policies.contains_key(&policy.id) {
			return Err(DbError::Conflict(format!("access policy {}", policy.id)));
		}
		inner.policies.insert(policy.id, policy.clone());

		tracing::debug!(policy_id = %policy.id, "access policy created");
		Ok(())
	}

	#[tracing::instrument(skip(self), fields(policy_id = %id))]
	async fn get_access_policy(
		&self,
		id: &AccessPolicyId,
	) -> Result<Option<AccessPolicy>, DbError> {
		Ok(self.inner.read().await.policies.get(id).cloned())
	}

	#[tracing::instrument(skip(self, policy), fields(policy_id = %policy.id))]
	async fn update_access_policy(
		&self,
		policy: &AccessPolicy,
		expected_modified_time: DateTime<Utc>,
	) -> Result<(), DbError> {
		let mut inner = self.inner.write().await;
		match inner.policies.get_mut(&policy.id) {
			Some(existing) if existing.modified_time != expected_modified_time => {
				tracing::debug!(policy_id = %policy.id, "stale access policy update rejected");
				Err(DbError::Conflict(format!(
					"access policy {} was modified concurrently",
					policy.id
				)))
			}
			Some(existing) => {
				*existing = policy.clone();
				tracing::debug!(policy_id = %policy.id, "access policy updated");
				Ok(())
			}
			None => Err(DbError::NotFound(format!("access policy {}", policy.id))),
		}
	}

	#[tracing::instrument(skip(self), fields(policy_id = %id))]
	async fn delete_access_policy(&self, id: &AccessPolicyId) -> Result<bool, DbError> {
		let removed = self.inner.write().await.policies.remove(id).is_some();
		tracing::debug!(policy_id = %id, removed, "access policy delete");
		Ok(removed)
	}

	#[tracing::instrument(skip(self))]
	async fn delete_access_policies_for_subject(&self, subject: Subject) -> Result<u64, DbError> {
		let mut inner = self.inner.write().await;
		let before = inner.policies.len();
		inner.policies.retain(|_, p| p.subject() != subject);
		let removed = (before - inner.policies.len()) as u64;

		tracing::debug!(removed, "access policies for subject deleted");
		Ok(removed)
	}

	#[tracing::instrument(skip(self), fields(resource = %resource))]
	async fn delete_access_policies_for_resource(
		&self,
		resource: &ResourceRef,
	) -> Result<u64, DbError> {
		let mut inner = self.inner.write().await;
		let before = inner.policies.len();
		inner.policies.retain(|_, p| p.target() != *resource);
		let removed = (before - inner.policies.len()) as u64;

		tracing::debug!(removed, "access policies for resource deleted");
		Ok(removed)
	}

	#[tracing::instrument(skip(self), fields(owner_id = %owner_id))]
	async fn list_access_policies_by_owner(
		&self,
		owner_id: &UserId,
	) -> Result<Vec<AccessPolicy>, DbError> {
		let inner = self.inner.read().await;
		let mut policies: Vec<AccessPolicy> = inner
			.policies
			.values()
			.filter(|p| p.owner_id == *owner_id)
			.cloned()
			.collect();
		policies.sort_by_key(|p| (p.created_time, p.id));
		Ok(policies)
	}

	#[tracing::instrument(skip(self, subject), fields(user_id = %subject.user_id, resource = %resource))]
	async fn find_candidate_policies(
		&self,
		subject: &ResolvedSubject,
		resource: &ResourceRef,
	) -> Result<Vec<AccessPolicy>, DbError> {
		let inner = self.inner.read().await;
		let mut policies: Vec<AccessPolicy> = inner
			.policies
			.values()
			.filter(|p| {
				p.resource_type == resource.resource_type
					&& p.resource_id == resource.resource_id
					&& subject.matches(p.subject_type, p.subject_id)
			})
			.cloned()
			.collect();
		policies.sort_by_key(|p| (p.created_time, p.id));

		tracing::trace!(count = policies.len(), "candidate policies fetched");
		Ok(policies)
	}
}

#[async_trait]
impl UserStore for MemoryStore {
	#[tracing::instrument(skip(self, user), fields(user_id = %user.id))]
	async fn create_user(&self, user: &User) -> Result<(), DbError> {
		let mut inner = self.inner.write().await;
		if inner.users.contains_key(&user.id) {
			return Err(DbError::Conflict(format!("user {}", user.id)));
		}
		inner.users.insert(user.id, user.clone());
		Ok(())
	}

	#[tracing::instrument(skip(self), fields(user_id = %id))]
	async fn get_user(&self, id: &UserId) -> Result<Option<User>, DbError> {
		Ok(self.inner.read().await.users.get(id).cloned())
	}
}

#[async_trait]
impl UserGroupStore for MemoryStore {
	#[tracing::instrument(skip(self, group), fields(group_id = %group.id))]
	async fn create_user_group(&self, group: &UserGroup) -> Result<(), DbError> {
		let mut inner = self.inner.write().await;
		if inner.groups.contains_key(&group.id) {
			return Err(DbError::Conflict(format!("user group {}", group.id)));
		}
		inner.groups.insert(group.id, group.clone());
		Ok(())
	}

	#[tracing::instrument(skip(self), fields(group_id = %id))]
	async fn get_user_group(&self, id: &UserGroupId) -> Result<Option<UserGroup>, DbError> {
		Ok(self.inner.read().await.groups.get(id).cloned())
	}

	#[tracing::instrument(skip(self, users_to_add, users_to_remove), fields(group_id = %id))]
	async fn apply_member_changes(
		&self,
		id: &UserGroupId,
		users_to_add: &[UserId],
		users_to_remove: &[UserId],
	) -> Result<(UserGroup, MembershipDelta), DbError> {
		let mut inner = self.inner.write().await;
		let group = inner
			.groups
			.get_mut(id)
			.ok_or_else(|| DbError::NotFound(format!("user group {id}")))?;
		let delta = group.apply_member_changes(users_to_add, users_to_remove);

		tracing::debug!(added = delta.added, removed = delta.removed, "members changed");
		Ok((group.clone(), delta))
	}

	#[tracing::instrument(skip(self), fields(group_id = %id))]
	async fn delete_user_group(&self, id: &UserGroupId) -> Result<bool, DbError> {
		Ok(self.inner.write().await.groups.remove(id).is_some())
	}

	#[tracing::instrument(skip(self), fields(user_id = %user_id))]
	async fn directory_snapshot_for(&self, user_id: &UserId) -> Result<DirectorySnapshot, DbError> {
		let inner = self.inner.read().await;
		let users = inner.users.get(user_id).map(|u| u.id);
		let groups = inner.groups.values().filter(|g| g.is_member(user_id));
		Ok(DirectorySnapshot::from_records(users, groups))
	}
}

#[async_trait]
impl ResourceOwnerStore for MemoryStore {
	#[tracing::instrument(skip(self), fields(resource = %resource, owner_id = %owner_id))]
	async fn register_resource(
		&self,
		resource: &ResourceRef,
		owner_id: &UserId,
	) -> Result<(), DbError> {
		if resource.is_type_level() {
			return Err(DbError::InvalidInput(
				"cannot register ownership of a resource type".to_string(),
			));
		}
		if matches!(
			resource.resource_type,
			ResourceType::User | ResourceType::UserGroup
		) {
			return Err(DbError::InvalidInput(format!(
				"{} ownership is derived from its own record",
				resource.resource_type
			)));
		}

		let mut inner = self.inner.write().await;
		match inner.owners.get(resource) {
			Some(existing) if existing != owner_id => {
				Err(DbError::Conflict(format!("{resource} already has an owner")))
			}
			Some(_) => Ok(()),
			None => {
				inner.owners.insert(*resource, *owner_id);
				Ok(())
			}
		}
	}

	#[tracing::instrument(skip(self), fields(resource = %resource))]
	async fn unregister_resource(&self, resource: &ResourceRef) -> Result<bool, DbError> {
		Ok(self.inner.write().await.owners.remove(resource).is_some())
	}

	#[tracing::instrument(skip(self), fields(resource = %resource))]
	async fn resource_owner(&self, resource: &ResourceRef) -> Result<Option<UserId>, DbError> {
		let Some(resource_id) = resource.resource_id else {
			return Ok(None);
		};
		let inner = self.inner.read().await;
		let owner = match resource.resource_type {
			ResourceType::User => {
				let user_id = UserId::new(resource_id.into_inner());
				inner.users.contains_key(&user_id).then_some(user_id)
			}
			ResourceType::UserGroup => inner
				.groups
				.get(&UserGroupId::new(resource_id.into_inner()))
				.map(|g| g.owner_id),
			ResourceType::File | ResourceType::FileGroup => inner.owners.get(resource).copied(),
		};
		Ok(owner)
	}
}
