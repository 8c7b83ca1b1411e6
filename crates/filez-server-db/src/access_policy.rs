// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Policy store adapter.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use filez_server_auth::{
	AccessPolicy, AccessPolicyId, ResolvedSubject, ResourceRef, Subject, UserId,
};

use crate::error::DbError;

#[async_trait]
pub trait AccessPolicyStore: Send + Sync {
	/// Inserts a new record. Fails with `Conflict` if the id is taken.
	async fn create_access_policy(&self, policy: &AccessPolicy) -> Result<(), DbError>;

	async fn get_access_policy(&self, id: &AccessPolicyId)
		-> Result<Option<AccessPolicy>, DbError>;

	/// Replaces an existing record if its stored `modified_time` is still
	/// `expected_modified_time`.
	///
	/// Fails with `NotFound` if it does not exist and `Conflict` if it was
	/// changed after the caller read it.
	async fn update_access_policy(
		&self,
		policy: &AccessPolicy,
		expected_modified_time: DateTime<Utc>,
	) -> Result<(), DbError>;

	/// Returns false if no record existed.
	async fn delete_access_policy(&self, id: &AccessPolicyId) -> Result<bool, DbError>;

	/// Removes every policy granted to `subject`, returning how many were removed.
	async fn delete_access_policies_for_subject(&self, subject: Subject) -> Result<u64, DbError>;

	/// Removes every policy naming exactly `resource`, returning how many were removed.
	async fn delete_access_policies_for_resource(&self, resource: &ResourceRef)
		-> Result<u64, DbError>;

	async fn list_access_policies_by_owner(
		&self,
		owner_id: &UserId,
	) -> Result<Vec<AccessPolicy>, DbError>;

	/// Policies granted to the subject's user or any of its groups that name
	/// exactly `resource`, ordered by creation time.
	async fn find_candidate_policies(
		&self,
		subject: &ResolvedSubject,
		resource: &ResourceRef,
	) -> Result<Vec<AccessPolicy>, DbError>;
}
