// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Thin client: build a release bundle, upload it, and either push it
//! directly (bootstrap) or hand it to the deployer workflow (deploy).

use crate::release::{Release, ReleaseError};
use chrono::Utc;
use relay_cloud::{arn, CloudClients, PutOptions, StoreError};
use relay_core::digest;
use relay_machine::Machine;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

const POLL_INTERVAL: Duration = Duration::from_millis(250);
const POLL_LIMIT: usize = 240;
const HISTORY_PAGE: usize = 20;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("invalid release: {0}")]
    Invalid(String),
    #[error("deploy failed: {0}")]
    Deploy(String),
    #[error("timed out waiting for deployer execution")]
    Timeout,
}

/// Everything the client needs to assemble a release.
#[derive(Debug, Clone)]
pub struct DeployConfig {
    pub project_name: String,
    pub config_name: String,
    pub lambda_name: String,
    pub step_fn_name: String,
    pub bucket: String,
    pub zip_path: PathBuf,
    pub states_json: String,
    pub region: String,
    pub account_id: String,
}

/// Terminal state of a deployer execution.
#[derive(Debug, Clone)]
pub struct DeployOutcome {
    pub status: String,
    pub error: Option<ReleaseError>,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    #[serde(default)]
    error: Option<ReleaseError>,
}

/// Read the code artifact, fingerprint everything, and upload the zip plus
/// the release record to their canonical paths.
pub async fn prepare_release_bundle(
    clients: &CloudClients,
    config: &DeployConfig,
) -> Result<Release, ClientError> {
    let zip = std::fs::read(&config.zip_path)?;

    let states = arn::interpolate(
        &config.states_json,
        &config.region,
        &config.account_id,
        &config.lambda_name,
    );
    Machine::validate_json(&states).map_err(|e| ClientError::Invalid(e.to_string()))?;

    let mut release = Release {
        aws_region: Some(config.region.clone()),
        aws_account_id: Some(config.account_id.clone()),
        release_id: Some(time_release_id()),
        created_at: Some(Utc::now()),
        project_name: Some(config.project_name.clone()),
        config_name: Some(config.config_name.clone()),
        bucket: Some(config.bucket.clone()),
        lock_table_name: Some(format!("{}-locks", config.lambda_name)),
        lambda_name: Some(config.lambda_name.clone()),
        lambda_sha256: Some(digest::sha256_hex(&zip)),
        step_fn_name: Some(config.step_fn_name.clone()),
        state_machine_json: Some(states),
        uuid: None,
        release_sha256: None,
        success: None,
        error: None,
    };
    let fingerprint =
        release.fingerprint().map_err(|e| ClientError::Invalid(e.to_string()))?;
    release.release_sha256 = Some(fingerprint);

    tracing::info!(
        release_id = release.release_id.as_deref().unwrap_or_default(),
        bucket = %config.bucket,
        "uploading release bundle"
    );
    clients
        .store
        .put(&config.bucket, &release.lambda_zip_path(), zip, PutOptions::default())
        .await?;
    relay_cloud::put_struct(clients.store.as_ref(), &config.bucket, &release.release_path(), &release)
        .await?;

    Ok(release)
}

/// Upload the bundle and push definition + code directly, bypassing the
/// deployer workflow.
pub async fn bootstrap(
    clients: &CloudClients,
    config: &DeployConfig,
) -> Result<Release, ClientError> {
    let release = prepare_release_bundle(clients, config).await?;

    tracing::info!("deploying workflow definition");
    release
        .deploy_state_machine(clients)
        .await
        .map_err(|e| ClientError::Deploy(e.to_string()))?;

    tracing::info!("deploying function code");
    release
        .deploy_function_code(clients)
        .await
        .map_err(|e| ClientError::Deploy(e.to_string()))?;

    Ok(release)
}

/// Upload the bundle, start the deployer workflow on it, and wait for the
/// execution to finish.
pub async fn deploy(
    clients: &CloudClients,
    config: &DeployConfig,
    deployer_arn: &str,
) -> Result<DeployOutcome, ClientError> {
    let release = prepare_release_bundle(clients, config).await?;
    let input = serde_json::to_string_pretty(&release)
        .map_err(|e| ClientError::Invalid(e.to_string()))?;

    let name = release.release_id.clone().unwrap_or_default();
    let handle = clients
        .workflows
        .start_execution(deployer_arn, &name, &input)
        .await
        .map_err(|e| ClientError::Deploy(e.to_string()))?;

    tracing::info!(execution = %handle.execution_arn, "started deployer execution");

    for _ in 0..POLL_LIMIT {
        let status = clients
            .workflows
            .describe_execution(&handle.execution_arn)
            .await
            .map_err(|e| ClientError::Deploy(e.to_string()))?;

        if status.status != "RUNNING" {
            let error = last_reported_error(clients, &handle.execution_arn).await;
            return Ok(DeployOutcome { status: status.status, error });
        }

        tokio::time::sleep(POLL_INTERVAL).await;
    }

    Err(ClientError::Timeout)
}

/// Scan the newest history events for a `$.error` written by a catcher.
async fn last_reported_error(clients: &CloudClients, execution_arn: &str) -> Option<ReleaseError> {
    let events = clients
        .workflows
        .execution_history(execution_arn, true, HISTORY_PAGE)
        .await
        .ok()?;

    events
        .iter()
        .filter_map(|event| event.output.as_deref())
        .filter_map(|output| serde_json::from_str::<ErrorEnvelope>(output).ok())
        .find_map(|envelope| envelope.error)
}

fn time_release_id() -> String {
    let stamp = Utc::now().format("%Y-%m-%dT%H-%M-%SZ");
    let suffix: String = uuid::Uuid::new_v4().simple().to_string().chars().take(7).collect();
    format!("release-{stamp}-{suffix}")
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;
