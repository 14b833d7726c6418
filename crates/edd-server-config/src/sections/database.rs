// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! SQLite store settings.

use std::time::Duration;

use edd_server_db::PoolOptions;
use serde::Deserialize;

const DEFAULT_URL: &str = "sqlite:./edd.db";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
	/// `sqlite:` connection string. The file is created if missing.
	pub url: String,
	pub max_connections: u32,
	/// How long a connection waits on a locked database before failing.
	pub busy_timeout_ms: u64,
}

impl Default for DatabaseConfig {
	fn default() -> Self {
		DatabaseConfigLayer::default().finalize()
	}
}

impl DatabaseConfig {
	pub fn pool_options(&self) -> PoolOptions {
		PoolOptions {
			max_connections: self.max_connections,
			busy_timeout: Duration::from_millis(self.busy_timeout_ms),
		}
	}
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DatabaseConfigLayer {
	pub url: Option<String>,
	pub max_connections: Option<u32>,
	pub busy_timeout_ms: Option<u64>,
}

impl DatabaseConfigLayer {
	pub fn merge(&mut self, other: DatabaseConfigLayer) {
		if other.url.is_some() {
			self.url = other.url;
		}
		if other.max_connections.is_some() {
			self.max_connections = other.max_connections;
		}
		if other.busy_timeout_ms.is_some() {
			self.busy_timeout_ms = other.busy_timeout_ms;
		}
	}

	pub fn finalize(self) -> DatabaseConfig {
		let defaults = PoolOptions::default();
		DatabaseConfig {
			url: self.url.unwrap_or_else(|| DEFAULT_URL.to_string()),
			max_connections: self.max_connections.unwrap_or(defaults.max_connections),
			busy_timeout_ms: self
				.busy_timeout_ms
				.unwrap_or(defaults.busy_timeout.as_millis() as u64),
		}
	}
}
