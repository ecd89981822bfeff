// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! relay: CLI for the relay workflow engine and its self-hosted deployer.

mod commands;
mod exit_error;

use clap::{Parser, Subcommand};
use exit_error::ExitError;

/// Default deployer name when only region/account are known.
const DEFAULT_DEPLOYER_NAME: &str = "relay-deployer";

#[derive(Parser)]
#[command(name = "relay", version, about = "Workflow engine and self-hosted deployer")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the deployer machine definition as JSON
    Json(commands::json::JsonArgs),
    /// Execute the deployer locally against in-memory backends
    Exec(commands::exec::ExecArgs),
    /// Upload code and definition directly, bypassing the deployer
    Bootstrap(commands::bundle::BundleArgs),
    /// Send a release through a running deployer workflow
    Deploy(commands::bundle::DeployArgs),
    /// Render a machine definition as a GraphViz digraph
    Dot(commands::dot::DotArgs),
}

/// Process environment, read once at startup.
#[derive(Debug, Clone, Default)]
pub(crate) struct RuntimeEnv {
    pub region: Option<String>,
    pub account: Option<String>,
}

impl RuntimeEnv {
    fn from_process() -> Self {
        Self {
            region: std::env::var("AWS_REGION").ok().filter(|v| !v.is_empty()),
            account: std::env::var("AWS_ACCOUNT_ID").ok().filter(|v| !v.is_empty()),
        }
    }

    /// Region and account, or an exit error naming what's missing.
    pub fn require(&self) -> Result<(String, String), ExitError> {
        match (&self.region, &self.account) {
            (Some(region), Some(account)) => Ok((region.clone(), account.clone())),
            _ => Err(ExitError::new(1, "AWS_REGION or AWS_ACCOUNT_ID not defined")),
        }
    }

    /// The default deployer function ARN, when the environment is set.
    pub fn default_lambda_arn(&self) -> Option<String> {
        match (&self.region, &self.account) {
            (Some(region), Some(account)) => {
                Some(relay_cloud::arn::lambda_arn(region, account, DEFAULT_DEPLOYER_NAME))
            }
            _ => None,
        }
    }

    /// The default deployer workflow ARN, when the environment is set.
    pub fn default_step_arn(&self) -> Option<String> {
        match (&self.region, &self.account) {
            (Some(region), Some(account)) => {
                Some(relay_cloud::arn::step_arn(region, account, DEFAULT_DEPLOYER_NAME))
            }
            _ => None,
        }
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let env = RuntimeEnv::from_process();

    let result = match cli.command {
        Command::Json(args) => commands::json::run(args, &env),
        Command::Exec(args) => commands::exec::run(args).await,
        Command::Bootstrap(args) => commands::bundle::bootstrap(args, &env).await,
        Command::Deploy(args) => commands::bundle::deploy(args, &env).await,
        Command::Dot(args) => commands::dot::run(args),
    };

    if let Err(err) = result {
        eprintln!("ERROR: {err}");
        std::process::exit(err.code);
    }
}
