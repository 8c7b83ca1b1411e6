// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Authorization engine configuration.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Authorization configuration (runtime, fully resolved).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthzConfig {
	/// App id used when a caller does not name one.
	pub default_app_id: Option<Uuid>,
	/// Emit an audit entry for evaluated requests.
	pub audit_decisions: bool,
	/// Also audit allowed requests; otherwise only denials are recorded.
	pub audit_allowed_decisions: bool,
}

impl Default for AuthzConfig {
	fn default() -> Self {
		Self {
			default_app_id: None,
			audit_decisions: true,
			audit_allowed_decisions: false,
		}
	}
}

/// Authorization configuration layer (partial, for merging).
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct AuthzConfigLayer {
	#[serde(default)]
	pub default_app_id: Option<Uuid>,
	#[serde(default)]
	pub audit_decisions: Option<bool>,
	#[serde(default)]
	pub audit_allowed_decisions: Option<bool>,
}

impl AuthzConfigLayer {
	pub fn merge(&mut self, other: AuthzConfigLayer) {
		if other.default_app_id.is_some() {
			self.default_app_id = other.default_app_id;
		}
		if other.audit_decisions.is_some() {
			self.audit_decisions = other.audit_decisions;
		}
		if other.audit_allowed_decisions.is_some() {
			self.audit_allowed_decisions = other.audit_allowed_decisions;
		}
	}

	pub fn finalize(self) -> AuthzConfig {
		let defaults = AuthzConfig::default();
		AuthzConfig {
			default_app_id: self.default_app_id,
			audit_decisions: self.audit_decisions.unwrap_or(defaults.audit_decisions),
			audit_allowed_decisions: self
				.audit_allowed_decisions
				.unwrap_or(defaults.audit_allowed_decisions),
		}
	}
}
