// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `relay bootstrap` and `relay deploy`: build a release bundle and either
//! push it directly or send it through a deployer workflow.
//!
//! Both run against in-memory backends; wire a real control plane behind
//! `CloudClients` to target actual infrastructure.

use crate::exit_error::ExitError;
use crate::RuntimeEnv;
use clap::Args;
use relay_deployer::{client, DeployConfig};
use std::path::PathBuf;

#[derive(Args)]
pub struct BundleArgs {
    /// Project the release belongs to
    #[arg(long)]
    pub project: String,

    /// Config (environment) within the project
    #[arg(long)]
    pub config: String,

    /// Target function name or ARN
    #[arg(long)]
    pub lambda: String,

    /// Target workflow name or ARN
    #[arg(long)]
    pub step: String,

    /// Object-store bucket holding release artifacts
    #[arg(long)]
    pub bucket: String,

    /// Path to the code artifact
    #[arg(long, default_value = "lambda.zip")]
    pub zip: PathBuf,

    /// Machine definition JSON; defaults to the deployer's own graph
    #[arg(long)]
    pub states: Option<String>,

    /// Overrides AWS_REGION
    #[arg(long)]
    pub region: Option<String>,

    /// Overrides AWS_ACCOUNT_ID
    #[arg(long)]
    pub account: Option<String>,
}

#[derive(Args)]
pub struct DeployArgs {
    #[command(flatten)]
    pub bundle: BundleArgs,

    /// Deployer workflow name or ARN to send the release to
    #[arg(long)]
    pub deployer: Option<String>,
}

impl BundleArgs {
    fn into_config(self, env: &RuntimeEnv) -> Result<DeployConfig, ExitError> {
        let (region, account) = match (self.region, self.account) {
            (Some(region), Some(account)) => (region, account),
            (region, account) => {
                let (env_region, env_account) = env.require()?;
                (region.unwrap_or(env_region), account.unwrap_or(env_account))
            }
        };

        let lambda_arn = relay_cloud::arn::lambda_arn(&region, &account, &self.lambda);
        let states = match self.states {
            Some(states) => states,
            None => relay_deployer::machine::deployer_machine_with_resource(&lambda_arn)
                .map_err(ExitError::failure)?
                .to_json(),
        };

        Ok(DeployConfig {
            project_name: self.project,
            config_name: self.config,
            lambda_name: self.lambda,
            step_fn_name: self.step,
            bucket: self.bucket,
            zip_path: self.zip,
            states_json: states,
            region,
            account_id: account,
        })
    }
}

pub async fn bootstrap(args: BundleArgs, env: &RuntimeEnv) -> Result<(), ExitError> {
    let config = args.into_config(env)?;
    let clients = relay_cloud::CloudClients::in_memory();

    let release = client::bootstrap(&clients, &config).await.map_err(ExitError::failure)?;

    println!(
        "bootstrapped {} to {}",
        release.release_id.as_deref().unwrap_or_default(),
        release.step_arn()
    );
    Ok(())
}

pub async fn deploy(args: DeployArgs, env: &RuntimeEnv) -> Result<(), ExitError> {
    let config = args.bundle.into_config(env)?;
    let deployer_arn = match args.deployer {
        Some(deployer) => {
            relay_cloud::arn::step_arn(&config.region, &config.account_id, &deployer)
        }
        None => env
            .default_step_arn()
            .ok_or_else(|| ExitError::new(1, "no --deployer and no environment default"))?,
    };

    let clients = relay_cloud::CloudClients::in_memory();
    let outcome =
        client::deploy(&clients, &config, &deployer_arn).await.map_err(ExitError::failure)?;

    println!("execution: {}", outcome.status);
    if let Some(error) = &outcome.error {
        println!("error: {}\ncause: {}", error.error, error.cause);
    }

    if outcome.status == "SUCCEEDED" {
        Ok(())
    } else {
        Err(ExitError::new(1, format!("deploy finished {}", outcome.status)))
    }
}
