// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `relay json`: print the deployer machine definition.

use crate::exit_error::ExitError;
use crate::RuntimeEnv;
use clap::Args;

#[derive(Args)]
pub struct JsonArgs {
    /// Function name or ARN to fill into the tasks' Resource fields
    #[arg(long)]
    pub lambda: Option<String>,
}

pub fn run(args: JsonArgs, env: &RuntimeEnv) -> Result<(), ExitError> {
    let lambda_arn = args.lambda.or_else(|| env.default_lambda_arn());

    let machine = match &lambda_arn {
        Some(arn) => relay_deployer::machine::deployer_machine_with_resource(arn),
        None => relay_deployer::deployer_machine(),
    }
    .map_err(ExitError::failure)?;

    println!("{}", machine.to_json());
    Ok(())
}
