// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Policy evaluation engine.
//!
//! [`evaluate`] decides a request in two steps:
//!
//! 1. **Filter**: keep policies whose actions, resource, subject and app
//!    context all match the request ([`policy_matches`])
//! 2. **Combine**: any matching Deny wins; otherwise one matching Allow is
//!    enough; with nothing matching the answer is Deny
//!
//! Both steps are pure. Callers fetch the candidate policies beforehand and
//! must hand over a snapshot that does not change during the call.

use tracing::{debug, instrument};

use super::types::{Decision, DecisionReason, Evaluation, ResolvedSubject, ResourceRef};
use crate::policy::AccessPolicy;
use crate::types::{Action, AppId, Effect};

/// Returns true if `policy` contributes to the decision for this request.
///
/// A policy without a resource id matches only type-level requests, and a
/// policy naming a resource matches only requests for that resource.
pub fn policy_matches(
	policy: &AccessPolicy,
	subject: &ResolvedSubject,
	action: Action,
	resource: &ResourceRef,
	app_id: AppId,
) -> bool {
	policy.actions.contains(&action)
		&& policy.resource_type == resource.resource_type
		&& policy.resource_id == resource.resource_id
		&& subject.matches(policy.subject_type, policy.subject_id)
		&& policy.is_active_for_app(app_id)
}

/// Evaluates a request and returns the decision with its reason.
///
/// Stops at the first matching Deny policy.
#[instrument(
	level = "debug",
	skip(subject, resource, policies),
	fields(
		user_id = %subject.user_id,
		action = %action,
		resource = %resource,
		app_id = %app_id,
		candidates = policies.len(),
	)
)]
pub fn explain(
	subject: &ResolvedSubject,
	action: Action,
	resource: &ResourceRef,
	app_id: AppId,
	policies: &[AccessPolicy],
) -> Evaluation {
	let mut allowed_by = Vec::new();

	for policy in policies
		.iter()
		.filter(|p| policy_matches(p, subject, action, resource, app_id))
	{
		match policy.effect {
			Effect::Deny => {
				debug!(policy_id = %policy.id, "denied by policy");
				return Evaluation {
					decision: Decision::Deny,
					reason: DecisionReason::DeniedByPolicy {
						policy_id: policy.id,
					},
				};
			}
			Effect::Allow => allowed_by.push(policy.id),
		}
	}

	if allowed_by.is_empty() {
		debug!("no matching policy");
		return Evaluation::no_matching_policy();
	}

	debug!(allowing = allowed_by.len(), "allowed by policies");
	Evaluation {
		decision: Decision::Allow,
		reason: DecisionReason::AllowedByPolicies {
			policy_ids: allowed_by,
		},
	}
}

/// Evaluates whether `subject` may perform `action` on `resource` under `app_id`.
pub fn evaluate(
	subject: &ResolvedSubject,
	action: Action,
	resource: &ResourceRef,
	app_id: AppId,
	policies: &[AccessPolicy],
) -> Decision {
	explain(subject, action, resource, app_id, policies).decision
}
