// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Operator CLI for the EDD authorization engine.

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use edd_server_authz::Engine;
use edd_server_db::{create_pool_with, schema, SqliteRecordStore};

mod commands;
mod logging;

use commands::RequestArgs;

/// edd-authz - explain and run authorization decisions against an EDD database.
#[derive(Parser, Debug)]
#[command(
	name = "edd-authz",
	about = "Explain and run EDD authorization decisions",
	version
)]
struct Args {
	/// Config file to load instead of /etc/edd/server.toml
	#[arg(long, global = true, env = "EDD_SERVER_CONFIG")]
	config: Option<PathBuf>,

	#[command(subcommand)]
	command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
	/// Create any missing tables in the configured database
	Init,
	/// Print the plan compiled for a request and the SQL it renders to
	Explain(RequestArgs),
	/// Execute a request and print what the caller would see
	Run(RequestArgs),
	/// Print the grants on a study and the effective level of every user
	Levels {
		/// Study key, UUID or slug
		#[arg(long)]
		study: String,
	},
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
	let args = Args::parse();

	dotenvy::dotenv().ok();

	let log_level = logging::init();

	let config = match &args.config {
		Some(path) => edd_server_config::load_config_with_file(path.clone()),
		None => edd_server_config::load_config(),
	}
	.context("failed to load configuration")?;
	log_level.apply(&config.logging.level)?;

	let pool = create_pool_with(&config.database.url, &config.database.pool_options())
		.await
		.with_context(|| format!("failed to open {}", config.database.url))?;
	let engine = Engine::new(config.authz.engine_options());

	let output = match args.command {
		Command::Init => {
			schema::apply(&pool).await?;
			tracing::info!(database = %config.database.url, "schema ready");
			return Ok(());
		}
		Command::Explain(request_args) => {
			let request = commands::resolve_request(&pool, &request_args).await?;
			commands::explain(&engine, &request)?
		}
		Command::Run(request_args) => {
			let request = commands::resolve_request(&pool, &request_args).await?;
			let store = SqliteRecordStore::new(pool.clone());
			commands::run(&engine, &store, &request).await?
		}
		Command::Levels { study } => commands::levels(&pool, &study).await?,
	};

	println!("{}", serde_json::to_string_pretty(&output)?);
	Ok(())
}
