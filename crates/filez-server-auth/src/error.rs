// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Authorization error types.

use thiserror::Error;

use crate::types::{AccessPolicyId, UserGroupId, UserId};

/// Errors that can occur while resolving subjects, validating policies or
/// authorizing mutations.
#[derive(Debug, Error)]
pub enum AuthError {
	/// The user id handed to the subject resolver does not exist.
	#[error("subject not found: {0}")]
	SubjectNotFound(UserId),

	/// The caller lacks authority to mutate the named resource, policy or group.
	#[error("permission denied: {0}")]
	PermissionDenied(String),

	/// The evaluator denied the requested action.
	#[error("forbidden")]
	Forbidden,

	/// A policy record failed validation.
	#[error("invalid access policy: {0}")]
	InvalidPolicy(String),

	#[error("access policy not found: {0}")]
	PolicyNotFound(AccessPolicyId),

	#[error("user group not found: {0}")]
	UserGroupNotFound(UserGroupId),

	#[error("internal error: {0}")]
	Internal(String),
}

impl AuthError {
	/// Returns true if this error should be logged at error level.
	pub fn is_internal(&self) -> bool {
		matches!(self, AuthError::Internal(_))
	}

	/// Returns the HTTP status code the transport layer should surface.
	pub fn status_code(&self) -> u16 {
		match self {
			AuthError::PermissionDenied(_) | AuthError::Forbidden => 403,
			AuthError::SubjectNotFound(_)
			| AuthError::PolicyNotFound(_)
			| AuthError::UserGroupNotFound(_) => 404,
			AuthError::InvalidPolicy(_) => 422,
			AuthError::Internal(_) => 500,
		}
	}
}
