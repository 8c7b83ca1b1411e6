// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration sources: environment variables and TOML files.

use std::path::PathBuf;

use tracing::{debug, trace};
use uuid::Uuid;

use crate::error::ConfigError;
use crate::layer::FilezConfigLayer;
use crate::sections::{AuthzConfigLayer, LogFormat, LoggingConfigLayer};

/// Source precedence levels (higher = overrides lower).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Precedence {
	Defaults = 10,
	ConfigFile = 20,
	Environment = 50,
}

/// Trait for configuration sources.
pub trait ConfigSource: Send + Sync {
	fn name(&self) -> &'static str;
	fn precedence(&self) -> Precedence;
	fn load(&self) -> Result<FilezConfigLayer, ConfigError>;
}

/// Built-in defaults source.
pub struct DefaultsSource;

impl ConfigSource for DefaultsSource {
	fn name(&self) -> &'static str {
		"defaults"
	}

	fn precedence(&self) -> Precedence {
		Precedence::Defaults
	}

	fn load(&self) -> Result<FilezConfigLayer, ConfigError> {
		debug!("loading defaults");
		Ok(FilezConfigLayer::default())
	}
}

/// TOML file configuration source.
pub struct TomlSource {
	path: PathBuf,
}

impl TomlSource {
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self { path: path.into() }
	}

	pub fn system() -> Self {
		Self::new("/etc/filez/authz.toml")
	}
}

impl ConfigSource for TomlSource {
	fn name(&self) -> &'static str {
		"toml-config"
	}

	fn precedence(&self) -> Precedence {
		Precedence::ConfigFile
	}

	fn load(&self) -> Result<FilezConfigLayer, ConfigError> {
		if !self.path.exists() {
			debug!(path = %self.path.display(), "config file not found, skipping");
			return Ok(FilezConfigLayer::default());
		}

		debug!(path = %self.path.display(), "loading config file");
		let content = std::fs::read_to_string(&self.path).map_err(|e| ConfigError::FileRead {
			path: self.path.clone(),
			source: e,
		})?;

		let layer: FilezConfigLayer =
			toml::from_str(&content).map_err(|e| ConfigError::TomlParse {
				path: self.path.clone(),
				source: e,
			})?;

		trace!("parsed config layer from TOML");
		Ok(layer)
	}
}

type Lookup = dyn Fn(&str) -> Option<String> + Send + Sync;

/// Environment variable source.
///
/// Convention: FILEZ_SERVER_<SECTION>_<FIELD>
pub struct EnvSource {
	lookup: Box<Lookup>,
}

impl Default for EnvSource {
	fn default() -> Self {
		Self::new()
	}
}

impl EnvSource {
	/// Reads the process environment.
	pub fn new() -> Self {
		Self::with_lookup(|name| std::env::var(name).ok())
	}

	/// Reads variables through `lookup` instead of the process environment.
	pub fn with_lookup(lookup: impl Fn(&str) -> Option<String> + Send + Sync + 'static) -> Self {
		Self {
			lookup: Box::new(lookup),
		}
	}

	fn var(&self, name: &str) -> Option<String> {
		(self.lookup)(name).filter(|s| !s.is_empty())
	}

	fn bool(&self, name: &str) -> Result<Option<bool>, ConfigError> {
		match self.var(name) {
			Some(v) => match v.to_lowercase().as_str() {
				"true" | "1" | "yes" => Ok(Some(true)),
				"false" | "0" | "no" => Ok(Some(false)),
				_ => Err(ConfigError::InvalidValue {
					key: name.to_string(),
					message: format!("invalid boolean value '{v}'"),
				}),
			},
			None => Ok(None),
		}
	}

	fn uuid(&self, name: &str) -> Result<Option<Uuid>, ConfigError> {
		match self.var(name) {
			Some(v) => Uuid::parse_str(&v)
				.map(Some)
				.map_err(|_| ConfigError::InvalidValue {
					key: name.to_string(),
					message: format!("invalid UUID value '{v}'"),
				}),
			None => Ok(None),
		}
	}

	fn load_logging(&self) -> Result<LoggingConfigLayer, ConfigError> {
		let format = match self.var("FILEZ_SERVER_LOG_FORMAT") {
			Some(v) => Some(v.parse::<LogFormat>().map_err(|message| {
				ConfigError::InvalidValue {
					key: "FILEZ_SERVER_LOG_FORMAT".to_string(),
					message,
				}
			})?),
			None => None,
		};

		Ok(LoggingConfigLayer {
			level: self.var("FILEZ_SERVER_LOG_LEVEL"),
			format,
		})
	}

	fn load_authz(&self) -> Result<AuthzConfigLayer, ConfigError> {
		Ok(AuthzConfigLayer {
			default_app_id: self.uuid("FILEZ_SERVER_AUTHZ_DEFAULT_APP_ID")?,
			audit_decisions: self.bool("FILEZ_SERVER_AUTHZ_AUDIT_DECISIONS")?,
			audit_allowed_decisions: self.bool("FILEZ_SERVER_AUTHZ_AUDIT_ALLOWED")?,
		})
	}
}

impl ConfigSource for EnvSource {
	fn name(&self) -> &'static str {
		"environment"
	}

	fn precedence(&self) -> Precedence {
		Precedence::Environment
	}

	fn load(&self) -> Result<FilezConfigLayer, ConfigError> {
		debug!("loading environment variables");
		Ok(FilezConfigLayer {
			logging: Some(self.load_logging()?),
			authz: Some(self.load_authz()?),
		})
	}
}
