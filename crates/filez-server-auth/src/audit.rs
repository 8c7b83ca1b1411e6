// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Audit records for access decisions and policy/group mutations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::abac::ResourceRef;
use crate::types::{AppId, UserId};

/// Types of events that can be recorded in the audit log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditEventType {
	// Decisions
	/// The evaluator allowed a request.
	AccessGranted,
	/// The evaluator denied a request.
	AccessDenied,

	// Policy lifecycle
	AccessPolicyCreated,
	AccessPolicyUpdated,
	AccessPolicyDeleted,

	// Group lifecycle
	UserGroupCreated,
	UserGroupDeleted,
	UserGroupMembersUpdated,

	/// A mutation was refused for lack of authority.
	PermissionDenied,
}

impl std::fmt::Display for AuditEventType {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let s = match self {
			AuditEventType::AccessGranted => "access_granted",
			AuditEventType::AccessDenied => "access_denied",
			AuditEventType::AccessPolicyCreated => "access_policy_created",
			AuditEventType::AccessPolicyUpdated => "access_policy_updated",
			AuditEventType::AccessPolicyDeleted => "access_policy_deleted",
			AuditEventType::UserGroupCreated => "user_group_created",
			AuditEventType::UserGroupDeleted => "user_group_deleted",
			AuditEventType::UserGroupMembersUpdated => "user_group_members_updated",
			AuditEventType::PermissionDenied => "permission_denied",
		};
		write!(f, "{s}")
	}
}

/// An entry in the audit log recording a security-relevant event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditLogEntry {
	pub id: Uuid,
	pub timestamp: DateTime<Utc>,
	pub event_type: AuditEventType,
	/// The user who performed the action (if known).
	pub actor_user_id: Option<UserId>,
	/// The app the request came through.
	pub app_id: Option<AppId>,
	/// The type of resource affected (e.g., "FileGroup", "AccessPolicy").
	pub resource_type: Option<String>,
	/// The ID of the resource affected; `*` for type-level requests.
	pub resource_id: Option<String>,
	/// Human-readable description of the action.
	pub action: String,
	/// Additional event-specific details.
	pub details: serde_json::Value,
}

impl AuditLogEntry {
	/// Create a new audit log builder for the given event type.
	pub fn builder(event_type: AuditEventType) -> AuditLogBuilder {
		AuditLogBuilder::new(event_type)
	}
}

/// Builder for constructing audit log entries with a fluent API.
#[derive(Debug, Clone)]
pub struct AuditLogBuilder {
	event_type: AuditEventType,
	actor_user_id: Option<UserId>,
	app_id: Option<AppId>,
	resource_type: Option<String>,
	resource_id: Option<String>,
	action: Option<String>,
	details: serde_json::Value,
}

impl AuditLogBuilder {
	pub fn new(event_type: AuditEventType) -> Self {
		Self {
			event_type,
			actor_user_id: None,
			app_id: None,
			resource_type: None,
			resource_id: None,
			action: None,
			details: serde_json::Value::Null,
		}
	}

	pub fn actor(mut self, user_id: UserId) -> Self {
		self.actor_user_id = Some(user_id);
		self
	}

	pub fn app(mut self, app_id: AppId) -> Self {
		self.app_id = Some(app_id);
		self
	}

	fn resource(
		mut self,
		resource_type: impl Into<String>,
		resource_id: impl Into<String>,
	) -> Self {
		self.resource_type = Some(resource_type.into());
		self.resource_id = Some(resource_id.into());
		self
	}

	/// Set the resource from a [`ResourceRef`].
	pub fn target(self, resource: &ResourceRef) -> Self {
		let id = resource
			.resource_id
			.map(|id| id.to_string())
			.unwrap_or_else(|| "*".to_string());
		self.resource(resource.resource_type.to_string(), id)
	}

	pub fn action(mut self, action: impl Into<String>) -> Self {
		self.action = Some(action.into());
		self
	}

	pub fn details(mut self, details: serde_json::Value) -> Self {
		self.details = details;
		self
	}

	pub fn build(self) -> AuditLogEntry {
		AuditLogEntry {
			id: Uuid::new_v4(),
			timestamp: Utc::now(),
			event_type: self.event_type,
			actor_user_id: self.actor_user_id,
			app_id: self.app_id,
			resource_type: self.resource_type,
			resource_id: self.resource_id,
			action: self.action.unwrap_or_else(|| self.event_type.to_string()),
			details: self.details,
		}
	}
}
