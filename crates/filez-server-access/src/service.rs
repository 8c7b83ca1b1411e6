// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The access-control service and its store-backed decision path.
//!
//! Every request follows the same path:
//!
//! 1. The resource owner is allowed outright
//! 2. The caller's directory snapshot is read and resolved to a subject
//! 3. Candidate policies for (subject, resource) are fetched
//! 4. The evaluator decides over that snapshot
//!
//! Policy and group mutations live in [`crate::policies`] and
//! [`crate::groups`]; both reuse [`AccessControl::require_control`].

use std::collections::BTreeMap;
use std::sync::Arc;

use filez_server_auth::{
	enforce, explain, resolve_subject, Action, AppId, AuditEventType, AuditLogBuilder,
	AuditLogEntry, AuthError, Evaluation, ResolvedSubject, ResourceId, ResourceRef, ResourceType,
	UserId,
};
use filez_server_db::{AccessPolicyStore, ResourceOwnerStore, UserGroupStore, UserStore};
use tracing::instrument;

use crate::caller::Caller;
use crate::error::AccessError;
use crate::settings::AccessSettings;
use crate::sink::{AuditSink, TracingAuditSink};

/// Store-backed authorization plus policy and group management.
#[derive(Clone)]
pub struct AccessControl {
	pub(crate) policies: Arc<dyn AccessPolicyStore>,
	pub(crate) users: Arc<dyn UserStore>,
	pub(crate) groups: Arc<dyn UserGroupStore>,
	pub(crate) owners: Arc<dyn ResourceOwnerStore>,
	sinks: Vec<Arc<dyn AuditSink>>,
	settings: AccessSettings,
}

impl AccessControl {
	pub fn new(
		policies: Arc<dyn AccessPolicyStore>,
		users: Arc<dyn UserStore>,
		groups: Arc<dyn UserGroupStore>,
		owners: Arc<dyn ResourceOwnerStore>,
		settings: AccessSettings,
	) -> Self {
		Self {
			policies,
			users,
			groups,
			owners,
			sinks: vec![Arc::new(TracingAuditSink::new())],
			settings,
		}
	}

	/// Uses one store for every storage concern.
	pub fn from_store<S>(store: S, settings: AccessSettings) -> Self
	where
		S: AccessPolicyStore + UserStore + UserGroupStore + ResourceOwnerStore + 'static,
	{
		let store = Arc::new(store);
		Self::new(
			store.clone(),
			store.clone(),
			store.clone(),
			store,
			settings,
		)
	}

	/// Replaces the audit sinks.
	pub fn with_sinks(mut self, sinks: Vec<Arc<dyn AuditSink>>) -> Self {
		self.sinks = sinks;
		self
	}

	pub fn settings(&self) -> &AccessSettings {
		&self.settings
	}

	/// Builds a caller, falling back to the configured default app.
	pub fn caller(&self, user_id: UserId, app_id: Option<AppId>) -> Result<Caller, AccessError> {
		let app_id = app_id
			.or(self.settings.default_app_id)
			.ok_or(AccessError::MissingApp)?;
		Ok(Caller::new(user_id, app_id))
	}

	/// Evaluates a request and returns the decision with its reason.
	#[instrument(
		skip(self, caller, resource),
		fields(user_id = %caller.user_id, app_id = %caller.app_id, action = %action, resource = %resource)
	)]
	pub async fn explain(
		&self,
		caller: &Caller,
		action: Action,
		resource: &ResourceRef,
	) -> Result<Evaluation, AccessError> {
		let subject = self.resolve(caller.user_id).await?;
		let evaluation = self
			.evaluate_for(&subject, caller.app_id, action, resource)
			.await?;
		self.audit_decision(caller, action, resource, &evaluation).await;
		Ok(evaluation)
	}

	/// Permits the request or fails with [`AuthError::Forbidden`].
	pub async fn authorize(
		&self,
		caller: &Caller,
		action: Action,
		resource: &ResourceRef,
	) -> Result<(), AccessError> {
		let evaluation = self.explain(caller, action, resource).await?;
		enforce(&evaluation).map_err(|_| AuthError::Forbidden)?;
		Ok(())
	}

	/// Evaluates one action over many resources of one type.
	///
	/// The subject is resolved once, so every entry reflects the same
	/// membership snapshot.
	#[instrument(
		skip(self, caller, resource_ids),
		fields(user_id = %caller.user_id, action = %action, resource_type = %resource_type, count = resource_ids.len())
	)]
	pub async fn authorize_many(
		&self,
		caller: &Caller,
		action: Action,
		resource_type: ResourceType,
		resource_ids: &[ResourceId],
	) -> Result<BTreeMap<ResourceId, Evaluation>, AccessError> {
		let subject = self.resolve(caller.user_id).await?;

		let mut evaluations = BTreeMap::new();
		for resource_id in resource_ids {
			let resource = ResourceRef::new(resource_type, *resource_id);
			let evaluation = self
				.evaluate_for(&subject, caller.app_id, action, &resource)
				.await?;
			self.audit_decision(caller, action, &resource, &evaluation).await;
			evaluations.insert(*resource_id, evaluation);
		}
		Ok(evaluations)
	}

	pub(crate) async fn resolve(&self, user_id: UserId) -> Result<ResolvedSubject, AccessError> {
		let directory = self.groups.directory_snapshot_for(&user_id).await?;
		resolve_subject(user_id, &directory).map_err(AccessError::SubjectResolution)
	}

	pub(crate) async fn evaluate_for(
		&self,
		subject: &ResolvedSubject,
		app_id: AppId,
		action: Action,
		resource: &ResourceRef,
	) -> Result<Evaluation, AccessError> {
		if self.owners.resource_owner(resource).await? == Some(subject.user_id) {
			tracing::debug!(resource = %resource, "caller owns resource");
			return Ok(Evaluation::resource_owner());
		}

		let candidates = self.policies.find_candidate_policies(subject, resource).await?;
		Ok(explain(subject, action, resource, app_id, &candidates))
	}

	/// Whether the caller controls `resource` through ownership or an allow
	/// for `authority`.
	pub(crate) async fn controls(
		&self,
		caller: &Caller,
		authority: Action,
		resource: &ResourceRef,
	) -> Result<bool, AccessError> {
		let subject = self.resolve(caller.user_id).await?;
		let evaluation = self
			.evaluate_for(&subject, caller.app_id, authority, resource)
			.await?;
		Ok(evaluation.is_allowed())
	}

	/// Fails with [`AuthError::PermissionDenied`] unless the caller controls
	/// `resource`.
	pub(crate) async fn require_control(
		&self,
		caller: &Caller,
		authority: Action,
		resource: &ResourceRef,
		operation: &str,
	) -> Result<(), AccessError> {
		if self.controls(caller, authority, resource).await? {
			return Ok(());
		}

		tracing::info!(
			user_id = %caller.user_id,
			resource = %resource,
			operation,
			"mutation refused"
		);
		self
			.publish(
				AuditLogEntry::builder(AuditEventType::PermissionDenied)
					.actor(caller.user_id)
					.app(caller.app_id)
					.target(resource)
					.action(operation)
					.details(serde_json::json!({ "required": authority.to_string() })),
			)
			.await;

		Err(AuthError::PermissionDenied(format!("{operation} on {resource}")).into())
	}

	pub(crate) async fn require_user(&self, user_id: UserId) -> Result<(), AccessError> {
		match self.users.get_user(&user_id).await? {
			Some(_) => Ok(()),
			None => Err(AuthError::SubjectNotFound(user_id).into()),
		}
	}

	async fn audit_decision(
		&self,
		caller: &Caller,
		action: Action,
		resource: &ResourceRef,
		evaluation: &Evaluation,
	) {
		if !self.settings.audits(evaluation.is_allowed()) {
			return;
		}

		let event_type = if evaluation.is_allowed() {
			AuditEventType::AccessGranted
		} else {
			AuditEventType::AccessDenied
		};
		let details = serde_json::to_value(&evaluation.reason).unwrap_or_default();
		self
			.publish(
				AuditLogEntry::builder(event_type)
					.actor(caller.user_id)
					.app(caller.app_id)
					.target(resource)
					.action(action.to_string())
					.details(details),
			)
			.await;
	}

	/// Sends an entry to every sink. Sink failures never change the outcome.
	pub(crate) async fn publish(&self, entry: AuditLogBuilder) {
		let entry = Arc::new(entry.build());
		for sink in &self.sinks {
			if let Err(e) = sink.publish(Arc::clone(&entry)).await {
				tracing::warn!(
					sink = sink.name(),
					error = %e,
					event_type = %entry.event_type,
					"audit sink failed"
				);
			}
		}
	}
}
