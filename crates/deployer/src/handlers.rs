// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Task handlers for the deployer workflow.
//!
//! Each handler consumes the `{Task, Input}` envelope the TaskFn sugar
//! injects, operates on the release descriptor, and reports failures with
//! the error kinds the fixed graph routes on.

use crate::lock::Locker;
use crate::release::Release;
use chrono::Utc;
use relay_cloud::CloudClients;
use relay_core::StateError;
use relay_machine::{handler_fn, TaskContext, TaskHandler};
use serde::Deserialize;
use std::sync::Arc;

/// The payload a TaskFn-expanded task hands its handler.
#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(rename = "Task")]
    #[allow(dead_code)]
    task: String,
    #[serde(rename = "Input")]
    release: Release,
}

/// Wipe client-set derived fields, fingerprint, fill defaults from the
/// invocation context, and validate the descriptor's attributes.
pub fn validate_handler() -> Arc<dyn TaskHandler> {
    handler_fn(|ctx: TaskContext, envelope: Envelope| async move {
        let mut release = envelope.release;

        // Nothing the client set in the derived fields survives
        release.wipe_volatile();
        let fingerprint = release.fingerprint()?;
        release.release_sha256 = Some(fingerprint);
        release.success = Some(false);

        let (region, account) = ctx.region_account().unwrap_or_default();
        release.set_defaults(&region, &account);

        release.validate_attributes(Utc::now())?;
        Ok(release)
    })
}

/// Take the root lock. Not grabbed is `LockExistsError`; a backend
/// failure is `LockError` (the lock may or may not exist afterwards).
pub fn lock_handler(locker: Arc<dyn Locker>) -> Arc<dyn TaskHandler> {
    handler_fn(move |_ctx: TaskContext, envelope: Envelope| {
        let locker = locker.clone();
        async move {
            let release = envelope.release;
            match release.grab_lock(locker.as_ref()).await {
                Ok(true) => Ok(release),
                Ok(false) => Err(StateError::lock_exists("Lock Already Exists")),
                Err(err) => Err(StateError::lock(err.to_string())),
            }
        }
    })
}

/// Validate the stored release copy, the code artifact digest, and the
/// target resources. Runs after Lock so a competing deploy cannot change
/// them underneath us.
pub fn validate_resources_handler(clients: CloudClients) -> Arc<dyn TaskHandler> {
    handler_fn(move |_ctx: TaskContext, envelope: Envelope| {
        let clients = clients.clone();
        async move {
            let release = envelope.release;

            if let Some(message) = release.halt_message(&clients, Utc::now()).await? {
                return Err(StateError::bad_release(format!("deploys halted: {message}")));
            }

            release.validate_stored_release(&clients).await?;
            release.validate_zip_digest(&clients).await?;
            release.validate_resources(&clients).await?;
            Ok(release)
        }
    })
}

/// Update the workflow definition, then the function code.
///
/// The definition goes first: if it fails nothing remote has changed and
/// the failure is clean. A code-plane failure afterwards is dirty, so the
/// lock is intentionally left held for a human.
pub fn deploy_handler(clients: CloudClients, locker: Arc<dyn Locker>) -> Arc<dyn TaskHandler> {
    handler_fn(move |_ctx: TaskContext, envelope: Envelope| {
        let clients = clients.clone();
        let locker = locker.clone();
        async move {
            let mut release = envelope.release;

            release.deploy_state_machine(&clients).await?;
            release.deploy_function_code(&clients).await?;

            release.success = Some(true);
            if let Err(err) = release.write_log(&clients, Utc::now()).await {
                tracing::warn!(error = %err, "deployed but failed to write log");
            }
            if let Err(err) = release.release_lock(locker.as_ref()).await {
                tracing::warn!(error = %err, "deployed but failed to release lock");
            }

            Ok(release)
        }
    })
}

/// Release the root lock on a failure path; trouble doing so is
/// `LockError`, retried by the graph before alerting.
pub fn release_lock_failure_handler(locker: Arc<dyn Locker>) -> Arc<dyn TaskHandler> {
    handler_fn(move |_ctx: TaskContext, envelope: Envelope| {
        let locker = locker.clone();
        async move {
            let release = envelope.release;
            release
                .release_lock(locker.as_ref())
                .await
                .map_err(|err| StateError::lock(err.to_string()))?;
            Ok(release)
        }
    })
}

#[cfg(test)]
#[path = "handlers_tests.rs"]
mod tests;
