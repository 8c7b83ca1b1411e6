// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Access policy management.
//!
//! Every mutation requires control of the policy's target: ownership of the
//! resource, or an allow for [`Action::AccessPoliciesManage`] on it. A
//! type-level target therefore needs a type-level grant.

use filez_server_auth::{
	AccessPolicy, AccessPolicyChangeset, AccessPolicyId, Action, AuditEventType, AuditLogEntry,
	AuthError, NewAccessPolicy, Subject,
};
use filez_server_db::DbError;
use tracing::instrument;

use crate::caller::Caller;
use crate::error::AccessError;
use crate::service::AccessControl;

/// True if the policy can grant nothing to a request without a resource id.
fn grants_nothing_at_type_level(policy: &AccessPolicy) -> bool {
	policy
		.actions
		.iter()
		.all(|a| !a.is_type_level() && *a != Action::AccessPoliciesManage)
}

impl AccessControl {
	#[instrument(
		skip(self, caller, new),
		fields(user_id = %caller.user_id, resource_type = %new.resource_type)
	)]
	pub async fn create_access_policy(
		&self,
		caller: &Caller,
		new: NewAccessPolicy,
	) -> Result<AccessPolicy, AccessError> {
		let policy = AccessPolicy::new(caller.user_id, new)?;
		let target = policy.target();

		self
			.require_control(
				caller,
				Action::AccessPoliciesManage,
				&target,
				"create access policy",
			)
			.await?;
		self.require_subject(policy.subject()).await?;

		self.policies.create_access_policy(&policy).await?;

		tracing::info!(
			policy_id = %policy.id,
			resource = %target,
			effect = ?policy.effect,
			"access policy created"
		);
		self
			.publish(
				AuditLogEntry::builder(AuditEventType::AccessPolicyCreated)
					.actor(caller.user_id)
					.app(caller.app_id)
					.target(&target)
					.details(serde_json::json!({
						"policy_id": policy.id,
						"effect": policy.effect,
						"subject_type": policy.subject_type,
						"subject_id": policy.subject_id,
					})),
			)
			.await;

		Ok(policy)
	}

	/// Returns the policy if the caller owns the record or controls its target.
	#[instrument(skip(self, caller), fields(user_id = %caller.user_id, policy_id = %id))]
	pub async fn get_access_policy(
		&self,
		caller: &Caller,
		id: AccessPolicyId,
	) -> Result<AccessPolicy, AccessError> {
		let policy = self.load_policy(id).await?;
		if policy.owner_id == caller.user_id
			|| self
				.controls(caller, Action::AccessPoliciesManage, &policy.target())
				.await?
		{
			return Ok(policy);
		}
		Err(AuthError::Forbidden.into())
	}

	/// Policies created by the caller, oldest first.
	#[instrument(skip(self, caller), fields(user_id = %caller.user_id))]
	pub async fn list_access_policies(
		&self,
		caller: &Caller,
	) -> Result<Vec<AccessPolicy>, AccessError> {
		Ok(self
			.policies
			.list_access_policies_by_owner(&caller.user_id)
			.await?)
	}

	/// Applies a changeset.
	///
	/// The caller must control the current target and, when the changeset
	/// retargets the policy, the new one. Clearing the resource id only needs
	/// control of the previous target when the result grants nothing at type
	/// level.
	///
	/// The write only lands if the record is unchanged since it was read;
	/// otherwise the update fails with a store `Conflict` (409).
	#[instrument(skip(self, caller, changeset), fields(user_id = %caller.user_id, policy_id = %id))]
	pub async fn update_access_policy(
		&self,
		caller: &Caller,
		id: AccessPolicyId,
		changeset: &AccessPolicyChangeset,
	) -> Result<AccessPolicy, AccessError> {
		let existing = self.load_policy(id).await?;
		let previous = existing.target();
		self
			.require_control(
				caller,
				Action::AccessPoliciesManage,
				&previous,
				"update access policy",
			)
			.await?;

		let updated = existing.apply_changeset(changeset)?;
		let next = updated.target();
		if next != previous {
			let cleared_resource_level = next.is_type_level()
				&& !previous.is_type_level()
				&& grants_nothing_at_type_level(&updated);
			if !cleared_resource_level {
				self
					.require_control(
						caller,
						Action::AccessPoliciesManage,
						&next,
						"retarget access policy",
					)
					.await?;
			}
		}
		if updated.subject() != existing.subject() {
			self.require_subject(updated.subject()).await?;
		}

		match self
			.policies
			.update_access_policy(&updated, existing.modified_time)
			.await
		{
			Err(DbError::NotFound(_)) => return Err(AuthError::PolicyNotFound(id).into()),
			result => result?,
		}

		tracing::info!(
			policy_id = %updated.id,
			resource = %next,
			empty_changeset = changeset.is_empty(),
			"access policy updated"
		);
		self
			.publish(
				AuditLogEntry::builder(AuditEventType::AccessPolicyUpdated)
					.actor(caller.user_id)
					.app(caller.app_id)
					.target(&next)
					.details(serde_json::json!({
						"policy_id": updated.id,
						"previous_resource": previous.to_string(),
					})),
			)
			.await;

		Ok(updated)
	}

	#[instrument(skip(self, caller), fields(user_id = %caller.user_id, policy_id = %id))]
	pub async fn delete_access_policy(
		&self,
		caller: &Caller,
		id: AccessPolicyId,
	) -> Result<(), AccessError> {
		let policy = self.load_policy(id).await?;
		let target = policy.target();
		self
			.require_control(
				caller,
				Action::AccessPoliciesManage,
				&target,
				"delete access policy",
			)
			.await?;

		if !self.policies.delete_access_policy(&id).await? {
			return Err(AuthError::PolicyNotFound(id).into());
		}

		tracing::info!(policy_id = %id, resource = %target, "access policy deleted");
		self
			.publish(
				AuditLogEntry::builder(AuditEventType::AccessPolicyDeleted)
					.actor(caller.user_id)
					.app(caller.app_id)
					.target(&target)
					.details(serde_json::json!({ "policy_id": id })),
			)
			.await;

		Ok(())
	}

	async fn load_policy(&self, id: AccessPolicyId) -> Result<AccessPolicy, AccessError> {
		self
			.policies
			.get_access_policy(&id)
			.await?
			.ok_or_else(|| AuthError::PolicyNotFound(id).into())
	}

	async fn require_subject(&self, subject: Subject) -> Result<(), AccessError> {
		match subject {
			Subject::User(user_id) => self.require_user(user_id).await,
			Subject::UserGroup(group_id) => match self.groups.get_user_group(&group_id).await? {
				Some(_) => Ok(()),
				None => Err(AuthError::UserGroupNotFound(group_id).into()),
			},
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::collections::BTreeSet;

	use filez_server_auth::{
		AppId, Effect, Patch, ResourceId, ResourceRef, ResourceType, User, UserGroupId, UserId,
	};
	use filez_server_db::testing::{create_test_file_group, create_test_group, create_test_user};
	use filez_server_db::{AccessPolicyStore, MemoryStore};

	use crate::settings::AccessSettings;

	struct Fixture {
		store: MemoryStore,
		access: AccessControl,
		app: AppId,
		alice: User,
		bob: User,
		file_group: ResourceRef,
	}

	impl Fixture {
		fn as_user(&self, user: &User) -> Caller {
			Caller::new(user.id, self.app)
		}
	}

	async fn fixture() -> Fixture {
		let store = MemoryStore::new();
		let access = AccessControl::from_store(store.clone(), AccessSettings::default())
			.with_sinks(Vec::new());
		let alice = create_test_user(&store, "alice").await;
		let bob = create_test_user(&store, "bob").await;
		let file_group = create_test_file_group(&store, alice.id).await;
		Fixture {
			store,
			access,
			app: AppId::generate(),
			alice,
			bob,
			file_group,
		}
	}

	fn grant(
		actions: &[Action],
		effect: Effect,
		resource: ResourceRef,
		subject: Subject,
	) -> NewAccessPolicy {
		NewAccessPolicy {
			name: "grant".to_string(),
			actions: actions.iter().copied().collect(),
			effect,
			resource_type: resource.resource_type,
			resource_id: resource.resource_id,
			subject_type: subject.subject_type(),
			subject_id: subject.id(),
			context_app_ids: BTreeSet::new(),
		}
	}

	mod create {
		use super::*;

		#[tokio::test]
		async fn owner_can_grant() {
			let f = fixture().await;
			let policy = f
				.access
				.create_access_policy(
					&f.as_user(&f.alice),
					grant(
						&[Action::FileGroupsListFiles],
						Effect::Allow,
						f.file_group,
						Subject::User(f.bob.id),
					),
				)
				.await
				.unwrap();

			assert_eq!(policy.owner_id, f.alice.id);
			assert_eq!(
				f.store.get_access_policy(&policy.id).await.unwrap(),
				Some(policy)
			);
		}

		#[tokio::test]
		async fn invalid_policy_is_rejected_before_storage() {
			let f = fixture().await;
			let err = f
				.access
				.create_access_policy(
					&f.as_user(&f.alice),
					grant(&[], Effect::Allow, f.file_group, Subject::User(f.bob.id)),
				)
				.await
				.unwrap_err();

			assert!(matches!(err, AccessError::Auth(AuthError::InvalidPolicy(_))));
			assert_eq!(f.store.policy_count().await, 0);
		}

		#[tokio::test]
		async fn unknown_subject_group_is_not_found() {
			let f = fixture().await;
			let err = f
				.access
				.create_access_policy(
					&f.as_user(&f.alice),
					grant(
						&[Action::FileGroupsListFiles],
						Effect::Allow,
						f.file_group,
						Subject::UserGroup(UserGroupId::generate()),
					),
				)
				.await
				.unwrap_err();

			assert!(matches!(err, AccessError::Auth(AuthError::UserGroupNotFound(_))));
		}

		#[tokio::test]
		async fn type_level_needs_type_level_manage_grant() {
			let f = fixture().await;
			let type_level = ResourceRef::type_level(ResourceType::FileGroup);
			let request = grant(
				&[Action::FileGroupsCreate],
				Effect::Allow,
				type_level,
				Subject::User(f.bob.id),
			);

			let err = f
				.access
				.create_access_policy(&f.as_user(&f.alice), request.clone())
				.await
				.unwrap_err();
			assert!(err.is_permission_denied());

			let operator_grant = AccessPolicy::new(
				UserId::generate(),
				grant(
					&[Action::AccessPoliciesManage],
					Effect::Allow,
					type_level,
					Subject::User(f.alice.id),
				),
			)
			.unwrap();
			f.store.create_access_policy(&operator_grant).await.unwrap();

			assert!(f
				.access
				.create_access_policy(&f.as_user(&f.alice), request)
				.await
				.is_ok());
		}

		#[tokio::test]
		async fn manage_grant_confers_control() {
			let f = fixture().await;
			f.access
				.create_access_policy(
					&f.as_user(&f.alice),
					grant(
						&[Action::AccessPoliciesManage],
						Effect::Allow,
						f.file_group,
						Subject::User(f.bob.id),
					),
				)
				.await
				.unwrap();

			let carol = create_test_user(&f.store, "carol").await;
			let result = f
				.access
				.create_access_policy(
					&f.as_user(&f.bob),
					grant(
						&[Action::FileGroupsGet],
						Effect::Allow,
						f.file_group,
						Subject::User(carol.id),
					),
				)
				.await;

			assert!(result.is_ok());
		}
	}

	mod update {
		use super::*;

		async fn bob_allowed(f: &Fixture) -> AccessPolicy {
			f.access
				.create_access_policy(
					&f.as_user(&f.alice),
					grant(
						&[Action::FileGroupsListFiles],
						Effect::Allow,
						f.file_group,
						Subject::User(f.bob.id),
					),
				)
				.await
				.unwrap()
		}

		#[tokio::test]
		async fn empty_changeset_only_moves_modified_time() {
			let f = fixture().await;
			let original = bob_allowed(&f).await;

			let updated = f
				.access
				.update_access_policy(
					&f.as_user(&f.alice),
					original.id,
					&AccessPolicyChangeset::default(),
				)
				.await
				.unwrap();

			assert!(updated.modified_time > original.modified_time);
			assert_eq!(
				AccessPolicy {
					modified_time: original.modified_time,
					..updated
				},
				original
			);
		}

		#[tokio::test]
		async fn clearing_resource_id_stops_gating_the_resource() {
			let f = fixture().await;
			let policy = bob_allowed(&f).await;
			let bob = f.as_user(&f.bob);
			assert!(f
				.access
				.authorize(&bob, Action::FileGroupsListFiles, &f.file_group)
				.await
				.is_ok());

			let updated = f
				.access
				.update_access_policy(
					&f.as_user(&f.alice),
					policy.id,
					&AccessPolicyChangeset {
						new_resource_id: Patch::Clear,
						..Default::default()
					},
				)
				.await
				.unwrap();

			assert_eq!(updated.resource_id, None);
			assert_ne!(updated, policy);
			assert!(f
				.access
				.authorize(&bob, Action::FileGroupsListFiles, &f.file_group)
				.await
				.unwrap_err()
				.is_forbidden());
		}

		#[tokio::test]
		async fn clearing_a_manage_grant_needs_type_level_control() {
			let f = fixture().await;
			let policy = f
				.access
				.create_access_policy(
					&f.as_user(&f.alice),
					grant(
						&[Action::AccessPoliciesManage],
						Effect::Allow,
						f.file_group,
						Subject::User(f.bob.id),
					),
				)
				.await
				.unwrap();

			let err = f
				.access
				.update_access_policy(
					&f.as_user(&f.alice),
					policy.id,
					&AccessPolicyChangeset {
						new_resource_id: Patch::Clear,
						..Default::default()
					},
				)
				.await
				.unwrap_err();

			assert!(err.is_permission_denied());
		}

		#[tokio::test]
		async fn retargeting_needs_control_of_new_target() {
			let f = fixture().await;
			let policy = bob_allowed(&f).await;
			let bobs_group = create_test_file_group(&f.store, f.bob.id).await;

			let err = f
				.access
				.update_access_policy(
					&f.as_user(&f.alice),
					policy.id,
					&AccessPolicyChangeset {
						new_resource_id: Patch::Set(bobs_group.resource_id.unwrap()),
						..Default::default()
					},
				)
				.await
				.unwrap_err();

			assert!(err.is_permission_denied());
		}

		#[tokio::test]
		async fn grantee_cannot_flip_its_own_deny() {
			let f = fixture().await;
			let deny = f
				.access
				.create_access_policy(
					&f.as_user(&f.alice),
					grant(
						&[Action::FileGroupsListFiles],
						Effect::Deny,
						f.file_group,
						Subject::User(f.bob.id),
					),
				)
				.await
				.unwrap();

			let err = f
				.access
				.update_access_policy(
					&f.as_user(&f.bob),
					deny.id,
					&AccessPolicyChangeset {
						new_effect: Some(Effect::Allow),
						..Default::default()
					},
				)
				.await
				.unwrap_err();

			assert!(err.is_permission_denied());
		}

		#[tokio::test]
		async fn missing_policy_is_not_found() {
			let f = fixture().await;
			let err = f
				.access
				.update_access_policy(
					&f.as_user(&f.alice),
					AccessPolicyId::generate(),
					&AccessPolicyChangeset::default(),
				)
				.await
				.unwrap_err();

			assert!(matches!(err, AccessError::Auth(AuthError::PolicyNotFound(_))));
			assert_eq!(err.status_code(), 404);
		}

		#[tokio::test]
		async fn same_changeset_twice_is_idempotent() {
			let f = fixture().await;
			let policy = bob_allowed(&f).await;
			let changeset = AccessPolicyChangeset {
				new_name: Some("renamed".to_string()),
				new_effect: Some(Effect::Deny),
				..Default::default()
			};
			let alice = f.as_user(&f.alice);

			let once = f
				.access
				.update_access_policy(&alice, policy.id, &changeset)
				.await
				.unwrap();
			let twice = f
				.access
				.update_access_policy(&alice, policy.id, &changeset)
				.await
				.unwrap();

			assert_eq!(
				AccessPolicy {
					modified_time: once.modified_time,
					..twice
				},
				once
			);
		}
	}

	mod read_and_delete {
		use super::*;

		#[tokio::test]
		async fn stranger_cannot_read_or_delete() {
			let f = fixture().await;
			let policy = f
				.access
				.create_access_policy(
					&f.as_user(&f.alice),
					grant(
						&[Action::FileGroupsListFiles],
						Effect::Allow,
						f.file_group,
						Subject::User(f.bob.id),
					),
				)
				.await
				.unwrap();
			let mallory = create_test_user(&f.store, "mallory").await;

			let read = f
				.access
				.get_access_policy(&f.as_user(&mallory), policy.id)
				.await
				.unwrap_err();
			assert!(read.is_forbidden());

			let delete = f
				.access
				.delete_access_policy(&f.as_user(&mallory), policy.id)
				.await
				.unwrap_err();
			assert!(delete.is_permission_denied());
			assert_eq!(f.store.policy_count().await, 1);
		}

		#[tokio::test]
		async fn list_returns_only_own_records() {
			let f = fixture().await;
			let group = create_test_group(&f.store, f.bob.id, "bobs", &[]).await;
			let mine = f
				.access
				.create_access_policy(
					&f.as_user(&f.alice),
					grant(
						&[Action::FileGroupsGet],
						Effect::Allow,
						f.file_group,
						Subject::UserGroup(group.id),
					),
				)
				.await
				.unwrap();

			assert_eq!(
				f.access
					.list_access_policies(&f.as_user(&f.alice))
					.await
					.unwrap(),
				vec![mine]
			);
			assert!(f
				.access
				.list_access_policies(&f.as_user(&f.bob))
				.await
				.unwrap()
				.is_empty());
		}

		#[tokio::test]
		async fn deleted_policy_stops_counting() {
			let f = fixture().await;
			let alice = f.as_user(&f.alice);
			let policy = f
				.access
				.create_access_policy(
					&alice,
					grant(
						&[Action::FileGroupsListFiles],
						Effect::Allow,
						f.file_group,
						Subject::User(f.bob.id),
					),
				)
				.await
				.unwrap();

			f.access.delete_access_policy(&alice, policy.id).await.unwrap();

			assert!(f
				.access
				.authorize(&f.as_user(&f.bob), Action::FileGroupsListFiles, &f.file_group)
				.await
				.unwrap_err()
				.is_forbidden());
			let again = f
				.access
				.delete_access_policy(&alice, policy.id)
				.await
				.unwrap_err();
			assert!(matches!(again, AccessError::Auth(AuthError::PolicyNotFound(_))));
		}
	}

	#[test]
	fn type_level_grant_detection() {
		let mut policy = AccessPolicy::new(
			UserId::generate(),
			grant(
				&[Action::FileGroupsListFiles, Action::FileGroupsGet],
				Effect::Allow,
				ResourceRef::file_group(ResourceId::generate()),
				Subject::User(UserId::generate()),
			),
		)
		.unwrap();
		assert!(grants_nothing_at_type_level(&policy));

		policy.actions.insert(Action::FileGroupsList);
		assert!(!grants_nothing_at_type_level(&policy));

		policy.actions = [Action::AccessPoliciesManage].into_iter().collect();
		assert!(!grants_nothing_at_type_level(&policy));
	}
}
