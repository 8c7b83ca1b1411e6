// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Fixtures for tests that need populated stores.

use filez_server_auth::{ResourceId, ResourceRef, User, UserGroup, UserId};

use crate::memory::MemoryStore;
use crate::resource::ResourceOwnerStore;
use crate::user_group::{UserGroupStore, UserStore};

pub async fn create_test_user(store: &MemoryStore, display_name: &str) -> User {
	let user = User::new(display_name);
	store.create_user(&user).await.unwrap();
	user
}

pub async fn create_test_group(
	store: &MemoryStore,
	owner_id: UserId,
	name: &str,
	members: &[UserId],
) -> UserGroup {
	let mut group = UserGroup::new(owner_id, name);
	group.apply_member_changes(members, &[]);
	store.create_user_group(&group).await.unwrap();
	group
}

/// Registers a fresh file group owned by `owner_id`.
pub async fn create_test_file_group(store: &MemoryStore, owner_id: UserId) -> ResourceRef {
	let resource = ResourceRef::file_group(ResourceId::generate());
	store.register_resource(&resource, &owner_id).await.unwrap();
	resource
}
