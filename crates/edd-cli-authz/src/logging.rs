// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Tracing setup. The subscriber is installed before configuration is read,
//! so messages emitted while loading it are not lost; the configured level
//! is applied afterwards.

use anyhow::Context;
use tracing_subscriber::{
	fmt::MakeWriter, layer::SubscriberExt, reload, util::SubscriberInitExt, EnvFilter, Registry,
};

/// Level used until the configured one is known.
const STARTUP_LEVEL: &str = "info";

pub struct LevelHandle {
	handle: reload::Handle<EnvFilter, Registry>,
	/// `RUST_LOG` was set and takes precedence over configuration.
	from_env: bool,
}

impl LevelHandle {
	pub fn apply(&self, level: &str) -> anyhow::Result<()> {
		if self.from_env {
			return Ok(());
		}
		self.handle
			.reload(EnvFilter::new(level))
			.with_context(|| format!("failed to apply log level '{level}'"))
	}
}

pub fn subscriber<W>(
	env: Option<EnvFilter>,
	writer: W,
) -> (impl tracing::Subscriber + Send + Sync + 'static, LevelHandle)
where
	W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
	let from_env = env.is_some();
	let (filter, handle) =
		reload::Layer::new(env.unwrap_or_else(|| EnvFilter::new(STARTUP_LEVEL)));
	let subscriber = tracing_subscriber::registry()
		.with(filter)
		.with(tracing_subscriber::fmt::layer().with_writer(writer));
	(subscriber, LevelHandle { handle, from_env })
}

/// Installs the global subscriber, writing to stderr.
pub fn init() -> LevelHandle {
	let (subscriber, handle) = subscriber(EnvFilter::try_from_default_env().ok(), std::io::stderr);
	subscriber.init();
	handle
}
