// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! User and user-group storage.

use async_trait::async_trait;
use filez_server_auth::{
	DirectorySnapshot, MembershipDelta, User, UserGroup, UserGroupId, UserId,
};

use crate::error::DbError;

#[async_trait]
pub trait UserStore: Send + Sync {
	async fn create_user(&self, user: &User) -> Result<(), DbError>;
	async fn get_user(&self, id: &UserId) -> Result<Option<User>, DbError>;
}

#[async_trait]
pub trait UserGroupStore: Send + Sync {
	async fn create_user_group(&self, group: &UserGroup) -> Result<(), DbError>;
	async fn get_user_group(&self, id: &UserGroupId) -> Result<Option<UserGroup>, DbError>;

	/// Adds then removes members in a single write and returns the stored
	/// result. Fails with `NotFound` if the group does not exist.
	async fn apply_member_changes(
		&self,
		id: &UserGroupId,
		users_to_add: &[UserId],
		users_to_remove: &[UserId],
	) -> Result<(UserGroup, MembershipDelta), DbError>;

	async fn delete_user_group(&self, id: &UserGroupId) -> Result<bool, DbError>;

	/// A point-in-time view holding `user_id` (if it exists) and every group
	/// it is currently a direct member of.
	async fn directory_snapshot_for(&self, user_id: &UserId) -> Result<DirectorySnapshot, DbError>;
}
