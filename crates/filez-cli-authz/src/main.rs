// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Filez authorization CLI: evaluates one request against a directory fixture.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use filez_server_access::{AccessControl, AccessSettings};
use filez_server_auth::{
	Action, AppId, DecisionReason, Evaluation, ResourceId, ResourceRef, ResourceType, UserId,
};
use filez_server_config::{FilezConfig, LogFormat, LoggingConfig};
use filez_server_db::MemoryStore;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use uuid::Uuid;

mod fixture;

use fixture::Fixture;

/// Filez authz - explain access decisions offline.
#[derive(Parser, Debug)]
#[command(name = "filez-authz", about = "Filez access policy evaluation", version)]
struct Args {
	#[command(subcommand)]
	command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
	/// Decide whether a user may perform an action on a resource
	Check(CheckArgs),
	/// Show version information
	Version,
}

#[derive(clap::Args, Debug)]
struct CheckArgs {
	/// JSON file with users, user_groups, policies and resources
	#[arg(long)]
	fixture: PathBuf,

	/// Requesting user
	#[arg(long)]
	user: Uuid,

	/// Action name, e.g. FileGroupsListFiles
	#[arg(long)]
	action: Action,

	/// Resource type, e.g. FileGroup
	#[arg(long)]
	resource_type: ResourceType,

	/// Resource instance; omit for type-level actions
	#[arg(long)]
	resource_id: Option<Uuid>,

	/// Calling app; defaults to the configured default app
	#[arg(long, env = "FILEZ_AUTHZ_APP")]
	app: Option<Uuid>,

	/// Config file to use instead of /etc/filez/authz.toml
	#[arg(long)]
	config: Option<PathBuf>,

	/// Print the evaluation as JSON
	#[arg(long)]
	json: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
	let args = Args::parse();

	match args.command {
		Command::Version => {
			println!("filez-authz version: {}", env!("CARGO_PKG_VERSION"));
			ExitCode::SUCCESS
		}
		Command::Check(check) => match run_check(check).await {
			Ok(true) => ExitCode::SUCCESS,
			Ok(false) => ExitCode::from(1),
			Err(e) => {
				eprintln!("error: {e:#}");
				ExitCode::from(2)
			}
		},
	}
}

async fn run_check(args: CheckArgs) -> Result<bool> {
	let config = match &args.config {
		Some(path) => filez_server_config::load_config_with_file(path)?,
		None => filez_server_config::load_config()?,
	};
	init_tracing(&config.logging);

	let evaluation = evaluate(&args, &config).await?;
	if args.json {
		println!("{}", serde_json::to_string_pretty(&evaluation)?);
	} else {
		println!("{}: {}", evaluation.decision, describe(&evaluation.reason));
	}
	Ok(evaluation.is_allowed())
}

/// Logs go to stderr so stdout carries only the decision.
fn init_tracing(logging: &LoggingConfig) {
	let filter =
		EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));
	let registry = tracing_subscriber::registry().with(filter);

	match logging.format {
		LogFormat::Pretty => registry
			.with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
			.init(),
		LogFormat::Json => registry
			.with(
				tracing_subscriber::fmt::layer()
					.json()
					.with_writer(std::io::stderr),
			)
			.init(),
	}
}

async fn evaluate(args: &CheckArgs, config: &FilezConfig) -> Result<Evaluation> {
	let store = MemoryStore::new();
	Fixture::from_path(&args.fixture)?.seed(&store).await?;

	let access = AccessControl::from_store(store, AccessSettings::from(config.authz.clone()));
	let caller = access.caller(UserId::new(args.user), args.app.map(AppId::new))?;
	let resource = match args.resource_id {
		Some(id) => ResourceRef::new(args.resource_type, ResourceId::new(id)),
		None => ResourceRef::type_level(args.resource_type),
	};

	tracing::info!(
		user_id = %caller.user_id,
		app_id = %caller.app_id,
		action = %args.action,
		resource = %resource,
		"evaluating request"
	);
	Ok(access.explain(&caller, args.action, &resource).await?)
}

fn describe(reason: &DecisionReason) -> String {
	match reason {
		DecisionReason::NoMatchingPolicy => "no matching policy".to_string(),
		DecisionReason::AllowedByPolicies { policy_ids } => {
			let ids: Vec<String> = policy_ids.iter().map(ToString::to_string).collect();
			format!("allowed by policies {}", ids.join(", "))
		}
		DecisionReason::DeniedByPolicy { policy_id } => format!("denied by policy {policy_id}"),
		DecisionReason::ResourceOwner => "caller owns the resource".to_string(),
	}
}
