// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Authorization guard: resolve the subject, evaluate, map to permit/reject.

use thiserror::Error;
use tracing::instrument;

use crate::abac::{explain, resolve_subject, Evaluation, ResourceRef, SubjectDirectory};
use crate::error::AuthError;
use crate::policy::AccessPolicy;
use crate::types::{Action, AppId, UserId};

/// The evaluator denied the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("forbidden")]
pub struct Forbidden;

/// Failure modes of [`authorize`].
#[derive(Debug, Error)]
pub enum GuardError {
	/// An expected, non-exceptional rejection.
	#[error(transparent)]
	Forbidden(#[from] Forbidden),

	/// The subject could not be resolved. This is an internal failure, not a
	/// rejection.
	#[error("subject resolution failed: {0}")]
	SubjectResolution(#[source] AuthError),
}

impl GuardError {
	pub fn is_forbidden(&self) -> bool {
		matches!(self, GuardError::Forbidden(_))
	}

	/// Returns the HTTP status code the transport layer should surface.
	pub fn status_code(&self) -> u16 {
		match self {
			GuardError::Forbidden(_) => 403,
			GuardError::SubjectResolution(_) => 500,
		}
	}
}

/// Resolves `user_id` and evaluates the request, returning the full evaluation.
pub fn check<D: SubjectDirectory + ?Sized>(
	user_id: UserId,
	action: Action,
	resource: &ResourceRef,
	app_id: AppId,
	directory: &D,
	policies: &[AccessPolicy],
) -> Result<Evaluation, GuardError> {
	let subject = resolve_subject(user_id, directory).map_err(GuardError::SubjectResolution)?;
	Ok(explain(&subject, action, resource, app_id, policies))
}

/// Maps an evaluation to permit/reject.
pub fn enforce(evaluation: &Evaluation) -> Result<(), Forbidden> {
	if evaluation.is_allowed() {
		tracing::debug!("authorization check passed");
		Ok(())
	} else {
		tracing::info!(reason = ?evaluation.reason, "access denied");
		Err(Forbidden)
	}
}

/// Permits the request if the evaluator allows it.
#[instrument(
	level = "debug",
	skip(directory, policies),
	fields(user_id = %user_id, action = %action, resource = %resource)
)]
pub fn authorize<D: SubjectDirectory + ?Sized>(
	user_id: UserId,
	action: Action,
	resource: &ResourceRef,
	app_id: AppId,
	directory: &D,
	policies: &[AccessPolicy],
) -> Result<(), GuardError> {
	let evaluation = check(user_id, action, resource, app_id, directory, policies)?;
	enforce(&evaluation)?;
	Ok(())
}
