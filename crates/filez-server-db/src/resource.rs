// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Resource ownership lookup.
//!
//! Users own themselves and groups are owned by their creator; both are
//! answered from their own records. Other resources (files, file groups) are
//! registered by the collaborator that creates them.

use async_trait::async_trait;
use filez_server_auth::{ResourceRef, UserId};

use crate::error::DbError;

#[async_trait]
pub trait ResourceOwnerStore: Send + Sync {
	/// Records `owner_id` as the owner of `resource`, which must name an instance.
	async fn register_resource(&self, resource: &ResourceRef, owner_id: &UserId)
		-> Result<(), DbError>;

	/// Returns false if the resource was not registered.
	async fn unregister_resource(&self, resource: &ResourceRef) -> Result<bool, DbError>;

	/// The owner of `resource`, or `None` if unknown or type-level.
	async fn resource_owner(&self, resource: &ResourceRef) -> Result<Option<UserId>, DbError>;
}
