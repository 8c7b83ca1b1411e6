// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Access service error types.

use filez_server_auth::{AuthError, GuardError};
use filez_server_db::DbError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AccessError {
	#[error(transparent)]
	Auth(#[from] AuthError),

	/// The caller could not be resolved to a subject. Internal, never a
	/// rejection.
	#[error("subject resolution failed: {0}")]
	SubjectResolution(#[source] AuthError),

	#[error("storage error: {0}")]
	Store(#[from] DbError),

	#[error("no app id given and no default app configured")]
	MissingApp,
}

impl From<GuardError> for AccessError {
	fn from(e: GuardError) -> Self {
		match e {
			GuardError::Forbidden(_) => AccessError::Auth(AuthError::Forbidden),
			GuardError::SubjectResolution(e) => AccessError::SubjectResolution(e),
		}
	}
}

impl AccessError {
	pub fn is_forbidden(&self) -> bool {
		matches!(self, AccessError::Auth(AuthError::Forbidden))
	}

	pub fn is_permission_denied(&self) -> bool {
		matches!(self, AccessError::Auth(AuthError::PermissionDenied(_)))
	}

	/// Returns true if this error should be logged at error level.
	pub fn is_internal(&self) -> bool {
		match self {
			AccessError::Auth(e) => e.is_internal(),
			AccessError::SubjectResolution(_) => true,
			AccessError::Store(e) => matches!(e, DbError::Internal(_)),
			AccessError::MissingApp => false,
		}
	}

	/// Returns the HTTP status code the transport layer should surface.
	pub fn status_code(&self) -> u16 {
		match self {
			AccessError::Auth(e) => e.status_code(),
			AccessError::SubjectResolution(_) => 500,
			AccessError::Store(DbError::NotFound(_)) => 404,
			AccessError::Store(DbError::Conflict(_)) => 409,
			AccessError::Store(DbError::InvalidInput(_)) => 422,
			AccessError::Store(DbError::Internal(_)) => 500,
			AccessError::MissingApp => 400,
		}
	}
}
