// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! JSON directory fixtures loaded into an in-memory store.

use std::path::Path;

use anyhow::{Context, Result};
use filez_server_auth::{
	AccessPolicy, ResourceId, ResourceRef, ResourceType, User, UserGroup, UserId,
};
use filez_server_db::{AccessPolicyStore, MemoryStore, ResourceOwnerStore, UserGroupStore, UserStore};
use serde::Deserialize;

/// A snapshot of users, groups, policies and owned resources.
#[derive(Debug, Default, Deserialize)]
pub struct Fixture {
	#[serde(default)]
	pub users: Vec<User>,
	#[serde(default)]
	pub user_groups: Vec<UserGroup>,
	#[serde(default)]
	pub policies: Vec<AccessPolicy>,
	#[serde(default)]
	pub resources: Vec<OwnedResource>,
}

/// A file or file group and the user that owns it.
#[derive(Debug, Deserialize)]
pub struct OwnedResource {
	pub resource_type: ResourceType,
	pub resource_id: ResourceId,
	pub owner_id: UserId,
}

impl Fixture {
	pub fn from_path(path: &Path) -> Result<Self> {
		let raw = std::fs::read_to_string(path)
			.with_context(|| format!("failed to read fixture {}", path.display()))?;
		Self::from_json(&raw).with_context(|| format!("invalid fixture {}", path.display()))
	}

	pub fn from_json(raw: &str) -> Result<Self> {
		Ok(serde_json::from_str(raw)?)
	}

	/// Writes every record into `store`. Policies are validated first.
	pub async fn seed(&self, store: &MemoryStore) -> Result<()> {
		for user in &self.users {
			store
				.create_user(user)
				.await
				.with_context(|| format!("user {}", user.id))?;
		}

		for group in &self.user_groups {
			store
				.create_user_group(group)
				.await
				.with_context(|| format!("user group {}", group.id))?;
		}

		for policy in &self.policies {
			policy
				.validate()
				.with_context(|| format!("access policy {}", policy.id))?;
			store
				.create_access_policy(policy)
				.await
				.with_context(|| format!("access policy {}", policy.id))?;
		}

		for resource in &self.resources {
			let target = ResourceRef::new(resource.resource_type, resource.resource_id);
			store
				.register_resource(&target, &resource.owner_id)
				.await
				.with_context(|| format!("resource {target}"))?;
		}

		tracing::debug!(
			users = self.users.len(),
			user_groups = self.user_groups.len(),
			policies = self.policies.len(),
			resources = self.resources.len(),
			"fixture loaded"
		);
		Ok(())
	}
}
