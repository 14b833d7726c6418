// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration sources: built-in defaults, TOML files and environment variables.

use std::path::PathBuf;

use edd_server_authz::StudyCreationPolicy;
use tracing::{debug, trace};

use crate::error::ConfigError;
use crate::layer::ServerConfigLayer;
use crate::sections::{AuthzConfigLayer, DatabaseConfigLayer, LoggingConfigLayer};

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
	fn load(&self) -> Result<ServerConfigLayer, ConfigError>;
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

	fn load(&self) -> Result<ServerConfigLayer, ConfigError> {
		debug!("loading defaults");
		Ok(ServerConfigLayer::default())
	}
}

/// TOML file configuration source. A missing file contributes nothing.
pub struct TomlSource {
	path: PathBuf,
}

impl TomlSource {
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self { path: path.into() }
	}

	pub fn system() -> Self {
		Self::new("/etc/edd/server.toml")
	}
}

impl ConfigSource for TomlSource {
	fn name(&self) -> &'static str {
		"toml-config"
	}

	fn precedence(&self) -> Precedence {
		Precedence::ConfigFile
	}

	fn load(&self) -> Result<ServerConfigLayer, ConfigError> {
		if !self.path.exists() {
			debug!(path = %self.path.display(), "config file not found, skipping");
			return Ok(ServerConfigLayer::default());
		}

		debug!(path = %self.path.display(), "loading config file");
		let content = std::fs::read_to_string(&self.path).map_err(|e| ConfigError::FileRead {
			path: self.path.clone(),
			source: e,
		})?;

		let layer: ServerConfigLayer =
			toml::from_str(&content).map_err(|e| ConfigError::TomlParse {
				path: self.path.clone(),
				source: e,
			})?;

		trace!("parsed config layer from TOML");
		Ok(layer)
	}
}

/// Environment variable source.
///
/// Convention: EDD_SERVER_<FIELD>
pub struct EnvSource;

impl ConfigSource for EnvSource {
	fn name(&self) -> &'static str {
		"environment"
	}

	fn precedence(&self) -> Precedence {
		Precedence::Environment
	}

	fn load(&self) -> Result<ServerConfigLayer, ConfigError> {
		debug!("loading environment variables");
		Ok(ServerConfigLayer {
			database: Some(DatabaseConfigLayer {
				url: env_var("EDD_SERVER_DATABASE_URL"),
				max_connections: env_number("EDD_SERVER_DATABASE_MAX_CONNECTIONS")?,
				busy_timeout_ms: env_number("EDD_SERVER_DATABASE_BUSY_TIMEOUT_MS")?,
			}),
			logging: Some(LoggingConfigLayer {
				level: env_var("EDD_SERVER_LOG_LEVEL"),
			}),
			authz: Some(load_authz_from_env()?),
		})
	}
}

fn env_var(name: &str) -> Option<String> {
	std::env::var(name).ok().filter(|s| !s.is_empty())
}

fn env_number<T: std::str::FromStr>(name: &str) -> Result<Option<T>, ConfigError> {
	env_var(name)
		.map(|v| {
			v.parse().map_err(|_| ConfigError::InvalidValue {
				key: name.to_string(),
				message: format!("expected a non-negative integer, got '{v}'"),
			})
		})
		.transpose()
}

fn env_bool(name: &str) -> Option<bool> {
	env_var(name).map(|v| v.eq_ignore_ascii_case("true") || v == "1")
}

fn load_authz_from_env() -> Result<AuthzConfigLayer, ConfigError> {
	const KEY: &str = "EDD_SERVER_STUDY_CREATION";

	let study_creation = env_var(KEY)
		.map(|v| {
			parse_study_creation(&v).ok_or_else(|| ConfigError::InvalidValue {
				key: KEY.to_string(),
				message: format!("expected anyone, superuser or permission, got '{v}'"),
			})
		})
		.transpose()?;

	Ok(AuthzConfigLayer {
		study_creation,
		elevated_role_reads_studies: env_bool("EDD_SERVER_ELEVATED_ROLE_READS_STUDIES"),
	})
}

fn parse_study_creation(value: &str) -> Option<StudyCreationPolicy> {
	match value.to_lowercase().as_str() {
		"anyone" => Some(StudyCreationPolicy::Anyone),
		"superuser" | "superuser_only" => Some(StudyCreationPolicy::SuperuserOnly),
		"permission" => Some(StudyCreationPolicy::Permission),
		_ => None,
	}
}
