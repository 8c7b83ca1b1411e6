// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration for Filez access control.
//!
//! This crate provides:
//! - Layered configuration from multiple sources (defaults, TOML file, environment)
//! - Type-safe configuration with validation
//! - Consistent environment variable naming (`FILEZ_SERVER_*`)
//!
//! # Usage
//!
//! ```ignore
//! use filez_server_config::load_config;
//!
//! let config = load_config()?;
//! println!("audit decisions: {}", config.authz.audit_decisions);
//! ```

pub mod error;
pub mod layer;
pub mod sections;
pub mod sources;

pub use error::ConfigError;
pub use layer::FilezConfigLayer;
pub use sections::*;
pub use sources::{ConfigSource, DefaultsSource, EnvSource, Precedence, TomlSource};

use tracing::{debug, info};

/// Fully resolved configuration.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilezConfig {
	pub logging: LoggingConfig,
	pub authz: AuthzConfig,
}

/// Load configuration from all sources with standard precedence.
///
/// Precedence (highest to lowest):
/// 1. Environment variables (`FILEZ_SERVER_*`)
/// 2. Config file (`/etc/filez/authz.toml`)
/// 3. Built-in defaults
pub fn load_config() -> Result<FilezConfig, ConfigError> {
	load_config_from_sources(vec![
		Box::new(DefaultsSource),
		Box::new(TomlSource::system()),
		Box::new(EnvSource::new()),
	])
}

/// Load configuration with a custom config file path.
pub fn load_config_with_file(
	config_path: impl Into<std::path::PathBuf>,
) -> Result<FilezConfig, ConfigError> {
	load_config_from_sources(vec![
		Box::new(DefaultsSource),
		Box::new(TomlSource::new(config_path)),
		Box::new(EnvSource::new()),
	])
}

/// Merge `sources` in precedence order and finalize the result.
pub fn load_config_from_sources(
	mut sources: Vec<Box<dyn ConfigSource>>,
) -> Result<FilezConfig, ConfigError> {
	sources.sort_by_key(|s| s.precedence());

	let mut merged = FilezConfigLayer::default();
	for source in sources {
		debug!(source = source.name(), "loading configuration source");
		let layer = source.load()?;
		merged.merge(layer);
	}

	finalize(merged)
}

/// Finalize configuration layer into resolved config.
fn finalize(layer: FilezConfigLayer) -> Result<FilezConfig, ConfigError> {
	let logging = layer.logging.unwrap_or_default().finalize();
	let authz = layer.authz.unwrap_or_default().finalize();

	validate_config(&logging, &authz)?;

	info!(
		log_level = %logging.level,
		log_format = %logging.format,
		default_app_configured = authz.default_app_id.is_some(),
		audit_decisions = authz.audit_decisions,
		audit_allowed_decisions = authz.audit_allowed_decisions,
		"Authorization configuration loaded"
	);

	Ok(FilezConfig { logging, authz })
}

/// Validate cross-field configuration rules.
fn validate_config(logging: &LoggingConfig, authz: &AuthzConfig) -> Result<(), ConfigError> {
	if logging.level.trim().is_empty() {
		return Err(ConfigError::Validation(
			"logging.level must not be blank".to_string(),
		));
	}

	if authz.audit_allowed_decisions && !authz.audit_decisions {
		return Err(ConfigError::Validation(
			"FILEZ_SERVER_AUTHZ_AUDIT_ALLOWED is set while decision auditing is disabled. \
			 Enable FILEZ_SERVER_AUTHZ_AUDIT_DECISIONS or unset audit_allowed_decisions."
				.to_string(),
		));
	}

	Ok(())
}
