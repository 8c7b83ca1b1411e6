// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Access policy records and their partial-update changesets.
//!
//! - [`AccessPolicy`] - a single grant or denial of actions on a resource
//! - [`NewAccessPolicy`] - the payload of a create call
//! - [`AccessPolicyChangeset`] - a partial update; see [`Patch`] for how
//!   "absent" and "explicitly null" are told apart

use std::collections::BTreeSet;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use uuid::Uuid;

use crate::abac::ResourceRef;
use crate::error::AuthError;
use crate::types::{
	AccessPolicyId, Action, AppId, Effect, ResourceId, ResourceType, Subject, SubjectType, UserId,
};

/// A single contribution to access decisions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessPolicy {
	pub id: AccessPolicyId,

	/// The user that created the policy.
	pub owner_id: UserId,

	/// Display label; carries no meaning for evaluation.
	pub name: String,

	pub actions: BTreeSet<Action>,
	pub effect: Effect,
	pub resource_type: ResourceType,

	/// The targeted resource instance. `None` targets type-level requests only.
	pub resource_id: Option<ResourceId>,

	pub subject_type: SubjectType,
	pub subject_id: Uuid,

	/// Apps under which the policy is active. Empty means every app.
	pub context_app_ids: BTreeSet<AppId>,

	pub created_time: DateTime<Utc>,
	pub modified_time: DateTime<Utc>,
}

/// Payload for creating an access policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewAccessPolicy {
	pub name: String,
	pub actions: BTreeSet<Action>,
	pub effect: Effect,
	pub resource_type: ResourceType,
	#[serde(default)]
	pub resource_id: Option<ResourceId>,
	pub subject_type: SubjectType,
	pub subject_id: Uuid,
	#[serde(default)]
	pub context_app_ids: BTreeSet<AppId>,
}

impl AccessPolicy {
	/// Creates a validated policy owned by `owner_id`.
	///
	/// Generates a new policy ID and sets both timestamps to now.
	pub fn new(owner_id: UserId, new: NewAccessPolicy) -> Result<Self, AuthError> {
		let now = Utc::now();
		let policy = Self {
			id: AccessPolicyId::generate(),
			owner_id,
			name: new.name,
			actions: new.actions,
			effect: new.effect,
			resource_type: new.resource_type,
			resource_id: new.resource_id,
			subject_type: new.subject_type,
			subject_id: new.subject_id,
			context_app_ids: new.context_app_ids,
			created_time: now,
			modified_time: now,
		};
		policy.validate()?;
		Ok(policy)
	}

	pub fn subject(&self) -> Subject {
		Subject::from_parts(self.subject_type, self.subject_id)
	}

	/// The resource (or resource type) this policy names.
	pub fn target(&self) -> ResourceRef {
		ResourceRef {
			resource_type: self.resource_type,
			resource_id: self.resource_id,
		}
	}

	/// Returns true if the policy applies under `app_id`.
	pub fn is_active_for_app(&self, app_id: AppId) -> bool {
		self.context_app_ids.is_empty() || self.context_app_ids.contains(&app_id)
	}

	/// Checks the record-level invariants shared by create and update.
	pub fn validate(&self) -> Result<(), AuthError> {
		if self.name.trim().is_empty() {
			return Err(AuthError::InvalidPolicy("name must not be blank".into()));
		}
		if self.actions.is_empty() {
			return Err(AuthError::InvalidPolicy(
				"at least one action is required".into(),
			));
		}
		if let Some(action) = self
			.actions
			.iter()
			.find(|a| !a.applies_to(self.resource_type))
		{
			return Err(AuthError::InvalidPolicy(format!(
				"action {action} does not apply to resource type {}",
				self.resource_type
			)));
		}
		Ok(())
	}

	/// Returns the record that results from applying `changeset`.
	///
	/// Fields absent from the changeset are carried over unchanged.
	/// `modified_time` always advances, even for an empty changeset.
	pub fn apply_changeset(&self, changeset: &AccessPolicyChangeset) -> Result<Self, AuthError> {
		let mut updated = self.clone();

		if let Some(name) = &changeset.new_name {
			updated.name = name.clone();
		}
		if let Some(actions) = &changeset.new_actions {
			updated.actions = actions.clone();
		}
		if let Some(effect) = changeset.new_effect {
			updated.effect = effect;
		}
		if let Some(resource_type) = changeset.new_resource_type {
			updated.resource_type = resource_type;
		}
		changeset.new_resource_id.apply_to(&mut updated.resource_id);
		if let Some(subject_type) = changeset.new_subject_type {
			updated.subject_type = subject_type;
		}
		if let Some(subject_id) = changeset.new_subject_id {
			updated.subject_id = subject_id;
		}
		if let Some(app_ids) = &changeset.new_context_app_ids {
			updated.context_app_ids = app_ids.clone();
		}

		updated.validate()?;
		updated.modified_time = next_modified_time(self.modified_time);
		Ok(updated)
	}
}

fn next_modified_time(previous: DateTime<Utc>) -> DateTime<Utc> {
	let now = Utc::now();
	if now > previous {
		now
	} else {
		previous + Duration::microseconds(1)
	}
}

// =============================================================================
// Changesets
// =============================================================================

/// A changeset field for a nullable attribute.
///
/// On the wire a missing key is [`Patch::Unset`], an explicit `null` is
/// [`Patch::Clear`] and any value is [`Patch::Set`]. Fields using it need
/// `#[serde(default, skip_serializing_if = "Patch::is_unset")]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Patch<T> {
	Unset,
	Set(T),
	Clear,
}

impl<T> Default for Patch<T> {
	fn default() -> Self {
		Patch::Unset
	}
}

impl<T> Patch<T> {
	pub fn is_unset(&self) -> bool {
		matches!(self, Patch::Unset)
	}

	/// The value the attribute will hold after applying, or `None` if untouched.
	pub fn resulting(&self) -> Option<Option<&T>> {
		match self {
			Patch::Unset => None,
			Patch::Set(v) => Some(Some(v)),
			Patch::Clear => Some(None),
		}
	}
}

impl<T: Clone> Patch<T> {
	pub fn apply_to(&self, target: &mut Option<T>) {
		match self {
			Patch::Unset => {}
			Patch::Set(v) => *target = Some(v.clone()),
			Patch::Clear => *target = None,
		}
	}
}

impl<T: Serialize> Serialize for Patch<T> {
	fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
		match self {
			Patch::Set(v) => serializer.serialize_some(v),
			Patch::Unset | Patch::Clear => serializer.serialize_none(),
		}
	}
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Patch<T> {
	fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
		Option::<T>::deserialize(deserializer).map(|value| match value {
			Some(v) => Patch::Set(v),
			None => Patch::Clear,
		})
	}
}

/// Partial update of an [`AccessPolicy`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessPolicyChangeset {
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub new_name: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub new_actions: Option<BTreeSet<Action>>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub new_effect: Option<Effect>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub new_resource_type: Option<ResourceType>,
	#[serde(default, skip_serializing_if = "Patch::is_unset")]
	pub new_resource_id: Patch<ResourceId>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub new_subject_type: Option<SubjectType>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub new_subject_id: Option<Uuid>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub new_context_app_ids: Option<BTreeSet<AppId>>,
}

impl AccessPolicyChangeset {
	/// Returns true if no field is touched.
	pub fn is_empty(&self) -> bool {
		self == &Self::default()
	}
}
