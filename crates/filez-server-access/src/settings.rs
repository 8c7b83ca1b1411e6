// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use filez_server_auth::AppId;
use filez_server_config::AuthzConfig;

/// Runtime knobs of the access service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessSettings {
	pub default_app_id: Option<AppId>,
	pub audit_decisions: bool,
	pub audit_allowed_decisions: bool,
}

impl Default for AccessSettings {
	fn default() -> Self {
		AuthzConfig::default().into()
	}
}

impl From<AuthzConfig> for AccessSettings {
	fn from(config: AuthzConfig) -> Self {
		Self {
			default_app_id: config.default_app_id.map(AppId::new),
			audit_decisions: config.audit_decisions,
			audit_allowed_decisions: config.audit_allowed_decisions,
		}
	}
}

impl AccessSettings {
	/// Whether a decision with this outcome is written to the audit sinks.
	pub fn audits(&self, allowed: bool) -> bool {
		self.audit_decisions && (!allowed || self.audit_allowed_decisions)
	}
}
