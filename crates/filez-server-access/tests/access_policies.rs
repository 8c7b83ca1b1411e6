// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! End-to-end access policy behaviour against the in-memory store.

use std::collections::BTreeSet;
use std::sync::Arc;

use filez_server_access::{AccessControl, AccessError, AccessSettings, Caller, MemoryAuditSink};
use filez_server_auth::{
	AccessPolicy, AccessPolicyId, Action, AppId, AuditEventType, AuthError, DecisionReason,
	Effect, NewAccessPolicy, ResourceId, ResourceRef, SubjectType, User, UserGroupId, UserId,
};
use filez_server_db::MemoryStore;
use proptest::prelude::*;

struct World {
	access: AccessControl,
	audit: MemoryAuditSink,
	app: AppId,
	alice: User,
	bob: User,
	larry: User,
	file_group: ResourceRef,
	files: Vec<ResourceId>,
}

impl World {
	async fn new() -> Self {
		let audit = MemoryAuditSink::new();
		let access = AccessControl::from_store(MemoryStore::new(), AccessSettings::default())
			.with_sinks(vec![Arc::new(audit.clone())]);
		let app = AppId::generate();

		let alice = access.create_user("alice").await.unwrap();
		let bob = access.create_user("bob").await.unwrap();
		let larry = access.create_user("larry").await.unwrap();

		let alice_caller = Caller::new(alice.id, app);
		let file_group = ResourceRef::file_group(ResourceId::generate());
		access
			.register_resource(&alice_caller, &file_group)
			.await
			.unwrap();

		let mut files = Vec::new();
		for _ in 0..10 {
			let file = ResourceId::generate();
			access
				.register_resource(&alice_caller, &ResourceRef::file(file))
				.await
				.unwrap();
			files.push(file);
		}

		Self {
			access,
			audit,
			app,
			alice,
			bob,
			larry,
			file_group,
			files,
		}
	}

	fn caller(&self, user: &User) -> Caller {
		Caller::new(user.id, self.app)
	}

	/// Lists the files in the file group, as the files endpoint would.
	async fn list_files(&self, user: &User) -> Result<Vec<ResourceId>, AccessError> {
		self
			.access
			.authorize(&self.caller(user), Action::FileGroupsListFiles, &self.file_group)
			.await?;
		Ok(self.files.clone())
	}

	fn list_files_policy(
		&self,
		effect: Effect,
		subject_type: SubjectType,
		subject_id: uuid::Uuid,
	) -> NewAccessPolicy {
		NewAccessPolicy {
			name: format!("{effect:?} list files"),
			actions: [Action::FileGroupsListFiles].into_iter().collect(),
			effect,
			resource_type: self.file_group.resource_type,
			resource_id: self.file_group.resource_id,
			subject_type,
			subject_id,
			context_app_ids: [self.app].into_iter().collect(),
		}
	}

	async fn alice_grants_bob(&self, effect: Effect) -> AccessPolicy {
		self
			.access
			.create_access_policy(
				&self.caller(&self.alice),
				self.list_files_policy(effect, SubjectType::User, self.bob.id.into_inner()),
			)
			.await
			.unwrap()
	}
}

mod scenarios {
	use super::*;

	#[tokio::test]
	async fn without_policy_bob_cannot_list_files() {
		let world = World::new().await;

		let err = world.list_files(&world.bob).await.unwrap_err();

		assert!(err.is_forbidden());
		assert_eq!(err.status_code(), 403);
	}

	#[tokio::test]
	async fn user_allow_lets_bob_list_all_files() {
		let world = World::new().await;
		world.alice_grants_bob(Effect::Allow).await;

		let files = world.list_files(&world.bob).await.unwrap();

		assert_eq!(files.len(), 10);
	}

	#[tokio::test]
	async fn deny_wins_over_existing_allow() {
		let world = World::new().await;
		world.alice_grants_bob(Effect::Allow).await;
		let deny = world.alice_grants_bob(Effect::Deny).await;

		let evaluation = world
			.access
			.explain(
				&world.caller(&world.bob),
				Action::FileGroupsListFiles,
				&world.file_group,
			)
			.await
			.unwrap();

		assert!(!evaluation.is_allowed());
		assert_eq!(
			evaluation.reason,
			DecisionReason::DeniedByPolicy { policy_id: deny.id }
		);
		assert!(world.list_files(&world.bob).await.unwrap_err().is_forbidden());
	}

	#[tokio::test]
	async fn deleting_policies_restores_default_deny() {
		let world = World::new().await;
		let allow = world.alice_grants_bob(Effect::Allow).await;
		let deny = world.alice_grants_bob(Effect::Deny).await;
		let alice = world.caller(&world.alice);

		world.access.delete_access_policy(&alice, allow.id).await.unwrap();
		world.access.delete_access_policy(&alice, deny.id).await.unwrap();

		let evaluation = world
			.access
			.explain(
				&world.caller(&world.bob),
				Action::FileGroupsListFiles,
				&world.file_group,
			)
			.await
			.unwrap();
		assert_eq!(evaluation.reason, DecisionReason::NoMatchingPolicy);
		assert!(world.list_files(&world.bob).await.unwrap_err().is_forbidden());
	}

	#[tokio::test]
	async fn group_allow_then_user_deny() {
		let world = World::new().await;
		let alice = world.caller(&world.alice);
		let group = world
			.access
			.create_user_group(&alice, "readers")
			.await
			.unwrap();
		world
			.access
			.update_user_group_members(&alice, group.id, &[world.bob.id], &[])
			.await
			.unwrap();
		world
			.access
			.create_access_policy(
				&alice,
				world.list_files_policy(Effect::Allow, SubjectType::UserGroup, group.id.into_inner()),
			)
			.await
			.unwrap();

		assert_eq!(world.list_files(&world.bob).await.unwrap().len(), 10);

		world.alice_grants_bob(Effect::Deny).await;

		assert!(world.list_files(&world.bob).await.unwrap_err().is_forbidden());
	}

	#[tokio::test]
	async fn bob_cannot_grant_himself_or_his_group() {
		let world = World::new().await;
		let bob = world.caller(&world.bob);

		let err = world
			.access
			.create_access_policy(
				&bob,
				world.list_files_policy(Effect::Allow, SubjectType::User, world.bob.id.into_inner()),
			)
			.await
			.unwrap_err();
		assert!(err.is_permission_denied());

		let bobs_group = world.access.create_user_group(&bob, "bobs").await.unwrap();
		world
			.access
			.update_user_group_members(&bob, bobs_group.id, &[world.alice.id], &[])
			.await
			.unwrap();

		let err = world
			.access
			.create_access_policy(
				&bob,
				world.list_files_policy(
					Effect::Allow,
					SubjectType::UserGroup,
					bobs_group.id.into_inner(),
				),
			)
			.await
			.unwrap_err();
		assert!(err.is_permission_denied());
		assert!(world.list_files(&world.bob).await.unwrap_err().is_forbidden());
	}

	#[tokio::test]
	async fn member_cannot_add_third_party_to_group() {
		let world = World::new().await;
		let bob = world.caller(&world.bob);
		let bobs_group = world.access.create_user_group(&bob, "bobs").await.unwrap();
		world
			.access
			.update_user_group_members(&bob, bobs_group.id, &[world.alice.id], &[])
			.await
			.unwrap();

		let err = world
			.access
			.update_user_group_members(
				&world.caller(&world.alice),
				bobs_group.id,
				&[world.larry.id],
				&[],
			)
			.await
			.unwrap_err();

		assert!(err.is_permission_denied());
		let group = world
			.access
			.get_user_group(&bob, bobs_group.id)
			.await
			.unwrap();
		assert!(!group.is_member(&world.larry.id));
		assert!(world
			.audit
			.event_types()
			.await
			.contains(&AuditEventType::PermissionDenied));
	}
}

mod scoping {
	use super::*;

	#[tokio::test]
	async fn policy_scoped_to_other_app_does_not_match() {
		let world = World::new().await;
		world.alice_grants_bob(Effect::Allow).await;

		let other_app = Caller::new(world.bob.id, AppId::generate());
		let err = world
			.access
			.authorize(&other_app, Action::FileGroupsListFiles, &world.file_group)
			.await
			.unwrap_err();

		assert!(err.is_forbidden());
	}

	#[tokio::test]
	async fn grant_on_group_does_not_reach_its_files() {
		let world = World::new().await;
		world.alice_grants_bob(Effect::Allow).await;

		let err = world
			.access
			.authorize(
				&world.caller(&world.bob),
				Action::FileGroupsListFiles,
				&ResourceRef::file(world.files[0]),
			)
			.await
			.unwrap_err();

		assert!(err.is_forbidden());
	}

	#[tokio::test]
	async fn removed_member_loses_group_grant_immediately() {
		let world = World::new().await;
		let alice = world.caller(&world.alice);
		let group = world.access.create_user_group(&alice, "readers").await.unwrap();
		world
			.access
			.update_user_group_members(&alice, group.id, &[world.bob.id], &[])
			.await
			.unwrap();
		world
			.access
			.create_access_policy(
				&alice,
				world.list_files_policy(Effect::Allow, SubjectType::UserGroup, group.id.into_inner()),
			)
			.await
			.unwrap();
		assert!(world.list_files(&world.bob).await.is_ok());

		world
			.access
			.update_user_group_members(&alice, group.id, &[], &[world.bob.id])
			.await
			.unwrap();

		assert!(world.list_files(&world.bob).await.unwrap_err().is_forbidden());
	}

	#[tokio::test]
	async fn missing_policy_and_group_are_not_found() {
		let world = World::new().await;
		let alice = world.caller(&world.alice);

		let err = world
			.access
			.delete_access_policy(&alice, AccessPolicyId::generate())
			.await
			.unwrap_err();
		assert!(matches!(err, AccessError::Auth(AuthError::PolicyNotFound(_))));

		let err = world
			.access
			.update_user_group_members(&alice, UserGroupId::generate(), &[], &[])
			.await
			.unwrap_err();
		assert!(matches!(err, AccessError::Auth(AuthError::UserGroupNotFound(_))));
	}
}

mod properties {
	use super::*;

	fn runtime() -> tokio::runtime::Runtime {
		tokio::runtime::Builder::new_current_thread()
			.enable_all()
			.build()
			.unwrap()
	}

	proptest! {
		#![proptest_config(ProptestConfig::with_cases(32))]

		/// Bob is allowed exactly when some grant allows and none denies,
		/// whether grants name him or a group he belongs to.
		#[test]
		fn stored_grants_combine_deny_wins(
			grants in prop::collection::vec((any::<bool>(), any::<bool>()), 0..6)
		) {
			let allowed = runtime().block_on(async {
				let world = World::new().await;
				let alice = world.caller(&world.alice);
				let group = world.access.create_user_group(&alice, "g").await.unwrap();
				world
					.access
					.update_user_group_members(&alice, group.id, &[world.bob.id], &[])
					.await
					.unwrap();

				for (allow, to_group) in &grants {
					let effect = if *allow { Effect::Allow } else { Effect::Deny };
					let (subject_type, subject_id) = if *to_group {
						(SubjectType::UserGroup, group.id.into_inner())
					} else {
						(SubjectType::User, world.bob.id.into_inner())
					};
					world
						.access
						.create_access_policy(
							&alice,
							world.list_files_policy(effect, subject_type, subject_id),
						)
						.await
						.unwrap();
				}

				world.list_files(&world.bob).await.is_ok()
			});

			let effects: BTreeSet<bool> = grants.iter().map(|(allow, _)| *allow).collect();
			let expected = effects.contains(&true) && !effects.contains(&false);
			prop_assert_eq!(allowed, expected);
		}
	}

	#[test]
	fn unknown_user_ids_never_resolve() {
		let result = runtime().block_on(async {
			let world = World::new().await;
			world
				.access
				.authorize(
					&Caller::new(UserId::generate(), world.app),
					Action::FileGroupsListFiles,
					&world.file_group,
				)
				.await
		});
		assert!(matches!(result, Err(AccessError::SubjectResolution(_))));
	}
}

mod concurrency {
	use super::*;
	use std::time::Duration;

	use async_trait::async_trait;
	use chrono::{DateTime, Utc};
	use filez_server_auth::{
		AccessPolicyChangeset, DirectorySnapshot, MembershipDelta, ResolvedSubject, Subject,
		UserGroup,
	};
	use filez_server_db::{AccessPolicyStore, DbError, ResourceOwnerStore, UserGroupStore, UserStore};

	const READ_DELAY: Duration = Duration::from_millis(50);

	/// Holds every record read for a while, so two mutations started
	/// together both work from the same version.
	struct SlowReads(MemoryStore);

	#[async_trait]
	impl AccessPolicyStore for SlowReads {
		async fn create_access_policy(&self, policy: &AccessPolicy) -> Result<(), DbError> {
			self.0.create_access_policy(policy).await
		}

		async fn get_access_policy(
			&self,
			id: &AccessPolicyId,
		) -> Result<Option<AccessPolicy>, DbError> {
			let policy = self.0.get_access_policy(id).await;
			tokio::time::sleep(READ_DELAY).await;
			policy
		}

		async fn update_access_policy(
			&self,
			policy: &AccessPolicy,
			expected_modified_time: DateTime<Utc>,
		) -> Result<(), DbError> {
			self.0
				.update_access_policy(policy, expected_modified_time)
				.await
		}

		async fn delete_access_policy(&self, id: &AccessPolicyId) -> Result<bool, DbError> {
			self.0.delete_access_policy(id).await
		}

		async fn delete_access_policies_for_subject(
			&self,
			subject: Subject,
		) -> Result<u64, DbError> {
			self.0.delete_access_policies_for_subject(subject).await
		}

		async fn delete_access_policies_for_resource(
			&self,
			resource: &ResourceRef,
		) -> Result<u64, DbError> {
			self.0.delete_access_policies_for_resource(resource).await
		}

		async fn list_access_policies_by_owner(
			&self,
			owner_id: &UserId,
		) -> Result<Vec<AccessPolicy>, DbError> {
			self.0.list_access_policies_by_owner(owner_id).await
		}

		async fn find_candidate_policies(
			&self,
			subject: &ResolvedSubject,
			resource: &ResourceRef,
		) -> Result<Vec<AccessPolicy>, DbError> {
			self.0.find_candidate_policies(subject, resource).await
		}
	}

	#[async_trait]
	impl UserStore for SlowReads {
		async fn create_user(&self, user: &User) -> Result<(), DbError> {
			self.0.create_user(user).await
		}

		async fn get_user(&self, id: &UserId) -> Result<Option<User>, DbError> {
			self.0.get_user(id).await
		}
	}

	#[async_trait]
	impl UserGroupStore for SlowReads {
		async fn create_user_group(&self, group: &UserGroup) -> Result<(), DbError> {
			self.0.create_user_group(group).await
		}

		async fn get_user_group(&self, id: &UserGroupId) -> Result<Option<UserGroup>, DbError> {
			let group = self.0.get_user_group(id).await;
			tokio::time::sleep(READ_DELAY).await;
			group
		}

		async fn apply_member_changes(
			&self,
			id: &UserGroupId,
			users_to_add: &[UserId],
			users_to_remove: &[UserId],
		) -> Result<(UserGroup, MembershipDelta), DbError> {
			self.0
				.apply_member_changes(id, users_to_add, users_to_remove)
				.await
		}

		async fn delete_user_group(&self, id: &UserGroupId) -> Result<bool, DbError> {
			self.0.delete_user_group(id).await
		}

		async fn directory_snapshot_for(
			&self,
			user_id: &UserId,
		) -> Result<DirectorySnapshot, DbError> {
			self.0.directory_snapshot_for(user_id).await
		}
	}

	#[async_trait]
	impl ResourceOwnerStore for SlowReads {
		async fn register_resource(
			&self,
			resource: &ResourceRef,
			owner_id: &UserId,
		) -> Result<(), DbError> {
			self.0.register_resource(resource, owner_id).await
		}

		async fn unregister_resource(&self, resource: &ResourceRef) -> Result<bool, DbError> {
			self.0.unregister_resource(resource).await
		}

		async fn resource_owner(&self, resource: &ResourceRef) -> Result<Option<UserId>, DbError> {
			self.0.resource_owner(resource).await
		}
	}

	struct Slow {
		store: MemoryStore,
		access: AccessControl,
		app: AppId,
		alice: User,
		bob: User,
		larry: User,
		file_group: ResourceRef,
	}

	impl Slow {
		async fn new() -> Self {
			let store = MemoryStore::new();
			let access =
				AccessControl::from_store(SlowReads(store.clone()), AccessSettings::default());
			let app = AppId::generate();
			let alice = access.create_user("alice").await.unwrap();
			let bob = access.create_user("bob").await.unwrap();
			let larry = access.create_user("larry").await.unwrap();
			let file_group = ResourceRef::file_group(ResourceId::generate());
			access
				.register_resource(&Caller::new(alice.id, app), &file_group)
				.await
				.unwrap();

			Self {
				store,
				access,
				app,
				alice,
				bob,
				larry,
				file_group,
			}
		}

		fn caller(&self, user: &User) -> Caller {
			Caller::new(user.id, self.app)
		}

		fn list_files_for(
			&self,
			subject_type: SubjectType,
			subject_id: uuid::Uuid,
		) -> NewAccessPolicy {
			NewAccessPolicy {
				name: "list files".to_string(),
				actions: [Action::FileGroupsListFiles].into_iter().collect(),
				effect: Effect::Allow,
				resource_type: self.file_group.resource_type,
				resource_id: self.file_group.resource_id,
				subject_type,
				subject_id,
				context_app_ids: Default::default(),
			}
		}
	}

	#[tokio::test]
	async fn concurrent_membership_changes_both_land() {
		let slow = Slow::new().await;
		let alice = slow.caller(&slow.alice);
		let group = slow
			.access
			.create_user_group(&alice, "readers")
			.await
			.unwrap();
		slow
			.access
			.update_user_group_members(&alice, group.id, &[slow.bob.id], &[])
			.await
			.unwrap();
		slow
			.access
			.create_access_policy(
				&alice,
				slow.list_files_for(SubjectType::UserGroup, group.id.into_inner()),
			)
			.await
			.unwrap();

		let to_add = [slow.larry.id];
		let to_remove = [slow.bob.id];
		let (added, removed) = tokio::join!(
			slow
				.access
				.update_user_group_members(&alice, group.id, &to_add, &[]),
			slow
				.access
				.update_user_group_members(&alice, group.id, &[], &to_remove),
		);
		added.unwrap();
		assert!(!removed.unwrap().is_member(&slow.bob.id));

		let stored = slow.store.get_user_group(&group.id).await.unwrap().unwrap();
		assert_eq!(stored.members, [slow.larry.id].into_iter().collect());
		let err = slow
			.access
			.authorize(
				&slow.caller(&slow.bob),
				Action::FileGroupsListFiles,
				&slow.file_group,
			)
			.await
			.unwrap_err();
		assert!(err.is_forbidden());
	}

	#[tokio::test]
	async fn concurrent_policy_updates_never_overwrite_each_other() {
		let slow = Slow::new().await;
		let alice = slow.caller(&slow.alice);
		let policy = slow
			.access
			.create_access_policy(
				&alice,
				slow.list_files_for(SubjectType::User, slow.bob.id.into_inner()),
			)
			.await
			.unwrap();
		let deny = AccessPolicyChangeset {
			new_effect: Some(Effect::Deny),
			..Default::default()
		};
		let rename = AccessPolicyChangeset {
			new_name: Some("renamed".to_string()),
			..Default::default()
		};

		let (first, second) = tokio::join!(
			slow.access.update_access_policy(&alice, policy.id, &deny),
			slow.access.update_access_policy(&alice, policy.id, &rename),
		);

		let (written, rejected) = match (first, second) {
			(Ok(written), Err(rejected)) | (Err(rejected), Ok(written)) => (written, rejected),
			other => panic!("expected exactly one update to land, got {other:?}"),
		};
		assert_eq!(rejected.status_code(), 409);
		assert_eq!(
			slow.store.get_access_policy(&policy.id).await.unwrap(),
			Some(written)
		);
	}
}
