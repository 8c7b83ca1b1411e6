// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Users, user groups and resource ownership.

use filez_server_auth::{
	Action, AuditEventType, AuditLogEntry, AuthError, ResourceRef, Subject, User, UserGroup,
	UserGroupId, UserId,
};
use filez_server_db::DbError;
use tracing::instrument;

use crate::caller::Caller;
use crate::error::AccessError;
use crate::service::AccessControl;

impl AccessControl {
	/// Registers a user. Authentication happens before this engine is called.
	#[instrument(skip(self, display_name))]
	pub async fn create_user(&self, display_name: &str) -> Result<User, AccessError> {
		let user = User::new(display_name);
		self.users.create_user(&user).await?;
		tracing::info!(user_id = %user.id, "user created");
		Ok(user)
	}

	/// Records the caller as owner of a resource produced elsewhere.
	#[instrument(skip(self, caller), fields(user_id = %caller.user_id, resource = %resource))]
	pub async fn register_resource(
		&self,
		caller: &Caller,
		resource: &ResourceRef,
	) -> Result<(), AccessError> {
		self.require_user(caller.user_id).await?;
		self.owners.register_resource(resource, &caller.user_id).await?;
		tracing::debug!("resource registered");
		Ok(())
	}

	/// Forgets ownership of a resource and every policy naming it. Only its
	/// owner may do this.
	///
	/// Policies go first, so a later registration of the same id never
	/// inherits them.
	#[instrument(skip(self, caller), fields(user_id = %caller.user_id, resource = %resource))]
	pub async fn unregister_resource(
		&self,
		caller: &Caller,
		resource: &ResourceRef,
	) -> Result<(), AccessError> {
		if self.owners.resource_owner(resource).await? != Some(caller.user_id) {
			return Err(AuthError::PermissionDenied(format!("unregister {resource}")).into());
		}
		let policies_removed = self
			.policies
			.delete_access_policies_for_resource(resource)
			.await?;
		self.owners.unregister_resource(resource).await?;

		tracing::info!(policies_removed, "resource unregistered");
		Ok(())
	}

	/// Creates an empty group owned by the caller.
	#[instrument(skip(self, caller, name), fields(user_id = %caller.user_id))]
	pub async fn create_user_group(
		&self,
		caller: &Caller,
		name: &str,
	) -> Result<UserGroup, AccessError> {
		self.require_user(caller.user_id).await?;

		let group = UserGroup::new(caller.user_id, name);
		self.groups.create_user_group(&group).await?;

		tracing::info!(group_id = %group.id, "user group created");
		self
			.publish(
				AuditLogEntry::builder(AuditEventType::UserGroupCreated)
					.actor(caller.user_id)
					.app(caller.app_id)
					.target(&ResourceRef::user_group(group.id))
					.details(serde_json::json!({ "name": group.name })),
			)
			.await;

		Ok(group)
	}

	/// Returns the group to its owner, its members, or callers allowed
	/// [`Action::UserGroupsGet`] on it.
	#[instrument(skip(self, caller), fields(user_id = %caller.user_id, group_id = %id))]
	pub async fn get_user_group(
		&self,
		caller: &Caller,
		id: UserGroupId,
	) -> Result<UserGroup, AccessError> {
		let group = self.load_group(id).await?;
		if group.is_member(&caller.user_id)
			|| self
				.controls(caller, Action::UserGroupsGet, &ResourceRef::user_group(id))
				.await?
		{
			return Ok(group);
		}
		Err(AuthError::Forbidden.into())
	}

	/// Adds then removes members.
	///
	/// Requires ownership of the group or an allow for
	/// [`Action::UserGroupsUpdateMembers`]; membership alone is not enough.
	/// Every user to add must exist.
	#[instrument(
		skip(self, caller, users_to_add, users_to_remove),
		fields(
			user_id = %caller.user_id,
			group_id = %id,
			adding = users_to_add.len(),
			removing = users_to_remove.len(),
		)
	)]
	pub async fn update_user_group_members(
		&self,
		caller: &Caller,
		id: UserGroupId,
		users_to_add: &[UserId],
		users_to_remove: &[UserId],
	) -> Result<UserGroup, AccessError> {
		self.load_group(id).await?;
		let target = ResourceRef::user_group(id);
		self
			.require_control(
				caller,
				Action::UserGroupsUpdateMembers,
				&target,
				"update user group members",
			)
			.await?;

		for user_id in users_to_add {
			self.require_user(*user_id).await?;
		}

		let (group, delta) = match self
			.groups
			.apply_member_changes(&id, users_to_add, users_to_remove)
			.await
		{
			Err(DbError::NotFound(_)) => return Err(AuthError::UserGroupNotFound(id).into()),
			result => result?,
		};

		tracing::info!(
			added = delta.added,
			removed = delta.removed,
			"user group members updated"
		);
		self
			.publish(
				AuditLogEntry::builder(AuditEventType::UserGroupMembersUpdated)
					.actor(caller.user_id)
					.app(caller.app_id)
					.target(&target)
					.details(serde_json::json!({
						"added": users_to_add,
						"removed": users_to_remove,
					})),
			)
			.await;

		Ok(group)
	}

	/// Deletes a group, every policy granted to it and every policy naming it.
	#[instrument(skip(self, caller), fields(user_id = %caller.user_id, group_id = %id))]
	pub async fn delete_user_group(
		&self,
		caller: &Caller,
		id: UserGroupId,
	) -> Result<(), AccessError> {
		self.load_group(id).await?;
		let target = ResourceRef::user_group(id);
		self
			.require_control(caller, Action::UserGroupsDelete, &target, "delete user group")
			.await?;

		// Membership goes before the group's policies, so a group Deny never
		// lapses while members still resolve to the group.
		if !self.groups.delete_user_group(&id).await? {
			return Err(AuthError::UserGroupNotFound(id).into());
		}
		let granted = self
			.policies
			.delete_access_policies_for_subject(Subject::UserGroup(id))
			.await?;
		let naming = self
			.policies
			.delete_access_policies_for_resource(&target)
			.await?;
		let policies_removed = granted + naming;

		tracing::info!(policies_removed, "user group deleted");
		self
			.publish(
				AuditLogEntry::builder(AuditEventType::UserGroupDeleted)
					.actor(caller.user_id)
					.app(caller.app_id)
					.target(&target)
					.details(serde_json::json!({ "policies_removed": policies_removed })),
			)
			.await;

		Ok(())
	}

	async fn load_group(&self, id: UserGroupId) -> Result<UserGroup, AccessError> {
		self
			.groups
			.get_user_group(&id)
			.await?
			.ok_or_else(|| AuthError::UserGroupNotFound(id).into())
	}
}
