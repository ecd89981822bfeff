// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `relay exec`: run the deployer machine locally.
//!
//! Executes against in-memory backends, so this is a dry run of the graph
//! and its handlers rather than a real deploy.

use crate::exit_error::ExitError;
use clap::Args;
use relay_cloud::CloudClients;
use relay_deployer::{MemoryLocker, TableLocker};
use std::sync::Arc;

#[derive(Args)]
pub struct ExecArgs {
    /// Input JSON to execute
    #[arg(long, default_value = "{}")]
    pub input: String,

    /// Use the in-process locker instead of the lock-table locker
    #[arg(long)]
    pub memory_locker: bool,
}

pub async fn run(args: ExecArgs) -> Result<(), ExitError> {
    let memory = relay_cloud::MemoryClients::new();
    let clients: CloudClients = memory.clients();

    let locker: Arc<dyn relay_deployer::Locker> = if args.memory_locker {
        Arc::new(MemoryLocker::new())
    } else {
        Arc::new(TableLocker::new(clients.lock_table.clone()))
    };

    let machine = relay_deployer::deployer_machine_with_handlers(&clients, locker)
        .map_err(ExitError::failure)?;

    let execution = machine
        .execute_json(&args.input)
        .await
        .map_err(|e| ExitError::failure(format!("bad input JSON: {e}")))?;

    println!("{}", execution.output_json);
    eprintln!("path: {}", execution.path().join(" -> "));

    match execution.error {
        None => Ok(()),
        Some(err) => Err(ExitError::failure(err)),
    }
}
