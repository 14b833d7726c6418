// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Layered configuration for the EDD authorization engine.
//!
//! Values come from built-in defaults, then a TOML file, then `EDD_SERVER_*`
//! environment variables, each overriding the last.
//!
//! ```ignore
//! use edd_server_config::load_config;
//!
//! let config = load_config()?;
//! let engine = edd_server_authz::Engine::new(config.authz.engine_options());
//! ```

pub mod error;
pub mod layer;
pub mod sections;
pub mod sources;

pub use error::ConfigError;
pub use layer::ServerConfigLayer;
pub use sections::*;
pub use sources::{ConfigSource, DefaultsSource, EnvSource, Precedence, TomlSource};

use tracing::{debug, info};

/// Fully resolved configuration.
#[derive(Debug, Clone, Default)]
pub struct ServerConfig {
	pub database: DatabaseConfig,
	pub logging: LoggingConfig,
	pub authz: AuthzConfig,
}

/// Load configuration from all sources with standard precedence.
///
/// Precedence (highest to lowest):
/// 1. Environment variables (`EDD_SERVER_*`)
/// 2. Config file (`/etc/edd/server.toml`)
/// 3. Built-in defaults
pub fn load_config() -> Result<ServerConfig, ConfigError> {
	load_from(vec![
		Box::new(DefaultsSource),
		Box::new(TomlSource::system()),
		Box::new(EnvSource),
	])
}

/// Load configuration from environment only.
pub fn load_config_from_env() -> Result<ServerConfig, ConfigError> {
	load_from(vec![Box::new(EnvSource)])
}

/// Load configuration with a custom config file path.
pub fn load_config_with_file(
	config_path: impl Into<std::path::PathBuf>,
) -> Result<ServerConfig, ConfigError> {
	load_from(vec![
		Box::new(DefaultsSource),
		Box::new(TomlSource::new(config_path)),
		Box::new(EnvSource),
	])
}

fn load_from(mut sources: Vec<Box<dyn ConfigSource>>) -> Result<ServerConfig, ConfigError> {
	sources.sort_by_key(|s| s.precedence());

	let mut merged = ServerConfigLayer::default();
	for source in sources {
		debug!(source = source.name(), "loading configuration source");
		merged.merge(source.load()?);
	}

	finalize(merged)
}

/// Finalize configuration layer into resolved config.
fn finalize(layer: ServerConfigLayer) -> Result<ServerConfig, ConfigError> {
	let config = ServerConfig {
		database: layer.database.unwrap_or_default().finalize(),
		logging: layer.logging.unwrap_or_default().finalize(),
		authz: layer.authz.unwrap_or_default().finalize(),
	};

	validate_config(&config)?;

	info!(
		database = %config.database.url,
		max_connections = config.database.max_connections,
		log_level = %config.logging.level,
		study_creation = ?config.authz.study_creation,
		elevated_role_reads_studies = config.authz.elevated_role_reads_studies,
		"Server configuration loaded"
	);

	Ok(config)
}

fn validate_config(config: &ServerConfig) -> Result<(), ConfigError> {
	if !config.database.url.starts_with("sqlite:") {
		return Err(ConfigError::Validation(format!(
			"EDD_SERVER_DATABASE_URL must be a sqlite: URL, got '{}'",
			config.database.url
		)));
	}

	if config.database.max_connections == 0 {
		return Err(ConfigError::Validation(
			"EDD_SERVER_DATABASE_MAX_CONNECTIONS must be at least 1".to_string(),
		));
	}

	if config.logging.level.trim().is_empty() {
		return Err(ConfigError::Validation(
			"EDD_SERVER_LOG_LEVEL must not be blank".to_string(),
		));
	}

	Ok(())
}
