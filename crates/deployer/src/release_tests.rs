// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::lock::MemoryLocker;
use relay_core::digest::sha256_hex;
use relay_core::ErrorKind;
use relay_cloud::MemoryClients;

fn mock_release() -> Release {
    Release::builder()
        .aws_region("region")
        .aws_account_id("account")
        .lock_table_name("lambdaname-locks")
        .build()
}

/// Wire clients the way a client upload would have left them: matching
/// tags, role path, zip artifact, and stored release copy.
fn mock_clients(release: &mut Release) -> MemoryClients {
    let memory = MemoryClients::new();

    memory.functions.set_tag("ProjectName", "project");
    memory.functions.set_tag("ConfigName", "development");
    memory.functions.set_tag("DeployWith", "step-deployer");

    memory.workflows.set_role_arn(
        &release.step_arn(),
        "arn:aws:iam::0000000000:role/step/project/development/role-name",
    );

    let bucket = release.bucket.clone().unwrap_or_default();
    memory.store.seed(&bucket, &release.lambda_zip_path(), b"lambda_zip".to_vec());
    release.lambda_sha256 = Some(sha256_hex(b"lambda_zip"));

    let stored = serde_json::to_vec(release).unwrap();
    memory.store.seed(&bucket, &release.release_path(), stored);
    release.release_sha256 = Some(release.fingerprint().unwrap());

    memory
}

#[test]
fn canonical_paths() {
    let release = mock_release();
    assert_eq!(release.project_dir(), "account/project");
    assert_eq!(release.root_dir(), "account/project/development");
    assert_eq!(release.release_dir(), "account/project/development/release-1");
    assert_eq!(release.release_path(), "account/project/development/release-1/release");
    assert_eq!(release.log_path(), "account/project/development/release-1/log");
    assert_eq!(release.root_lock_path(), "account/project/development/lock");
    assert_eq!(release.release_lock_path(), "account/project/development/release-1/lock");
    assert_eq!(release.lambda_zip_path(), "account/project/development/release-1/lambda.zip");
}

#[test]
fn arns_derive_from_names() {
    let release = mock_release();
    assert_eq!(release.lambda_arn(), "arn:aws:lambda:region:account:function:lambdaname");
    assert_eq!(release.step_arn(), "arn:aws:states:region:account:stateMachine:stepfnname");
}

#[test]
fn set_defaults_fills_blanks_only() {
    let mut release = Release::builder().aws_region("explicit").build();
    release.set_defaults("ctx-region", "ctx-account");

    assert_eq!(release.aws_region.as_deref(), Some("explicit"));
    assert_eq!(release.aws_account_id.as_deref(), Some("ctx-account"));
    assert!(release.uuid.is_some());
    assert_eq!(release.lock_table_name.as_deref(), Some("lambdaname-locks"));
    // Bucket was set by the builder; untouched
    assert_eq!(release.bucket.as_deref(), Some("bucket"));
}

#[test]
fn set_defaults_derives_bucket_from_account() {
    let mut release = mock_release();
    release.bucket = None;
    release.set_defaults("", "");
    assert_eq!(release.bucket.as_deref(), Some("account-step-deployer"));
}

#[test]
fn set_defaults_keeps_existing_uuid() {
    let mut release = mock_release();
    release.uuid = Some("stable".to_string());
    release.set_defaults("r", "a");
    assert_eq!(release.uuid.as_deref(), Some("stable"));
}

#[test]
fn fingerprint_ignores_volatile_fields() {
    let clean = mock_release();
    let mut tampered = clean.clone();
    tampered.uuid = Some("attacker".to_string());
    tampered.release_sha256 = Some("attacker".to_string());
    tampered.success = Some(true);

    assert_eq!(clean.fingerprint().unwrap(), tampered.fingerprint().unwrap());
}

#[test]
fn fingerprint_tracks_identifying_fields() {
    let clean = mock_release();
    let mut changed = clean.clone();
    changed.created_at = Some(Utc::now() + Duration::minutes(1));
    assert_ne!(clean.fingerprint().unwrap(), changed.fingerprint().unwrap());
}

#[test]
fn validate_attributes_accepts_mock() {
    let mut release = mock_release();
    release.lambda_sha256 = Some("sha".to_string());
    assert!(release.validate_attributes(Utc::now()).is_ok());
}

#[yare::parameterized(
    release_id  = { |r: &mut Release| r.release_id = None,         "ReleaseId" },
    project     = { |r: &mut Release| r.project_name = None,       "ProjectName" },
    config      = { |r: &mut Release| r.config_name = None,        "ConfigName" },
    bucket      = { |r: &mut Release| r.bucket = None,             "Bucket" },
    lambda_name = { |r: &mut Release| r.lambda_name = None,        "LambdaName" },
    step_fn     = { |r: &mut Release| r.step_fn_name = None,       "StepFnName" },
    machine     = { |r: &mut Release| r.state_machine_json = None, "StateMachineJSON" },
    created_at  = { |r: &mut Release| r.created_at = None,         "CreatedAt" },
)]
fn validate_attributes_requires(clear: fn(&mut Release), label: &str) {
    let mut release = mock_release();
    release.lambda_sha256 = Some("sha".to_string());
    clear(&mut release);

    let err = release.validate_attributes(Utc::now()).unwrap_err();
    assert_eq!(err.kind, ErrorKind::BadRelease);
    assert!(err.cause.contains(label), "cause: {}", err.cause);
}

#[test]
fn validate_attributes_rejects_old_release() {
    let mut release = mock_release();
    release.lambda_sha256 = Some("sha".to_string());
    release.created_at = Some(Utc::now() - Duration::hours(6));
    let err = release.validate_attributes(Utc::now()).unwrap_err();
    assert!(err.cause.contains("older"), "cause: {}", err.cause);
}

#[test]
fn validate_attributes_rejects_future_release() {
    let mut release = mock_release();
    release.lambda_sha256 = Some("sha".to_string());
    release.created_at = Some(Utc::now() + Duration::minutes(11));
    let err = release.validate_attributes(Utc::now()).unwrap_err();
    assert!(err.cause.contains("future"), "cause: {}", err.cause);
}

#[test]
fn validate_attributes_rejects_bad_machine_json() {
    let mut release = mock_release();
    release.lambda_sha256 = Some("sha".to_string());
    release.state_machine_json = Some("{\"no\": \"states\"}".to_string());
    let err = release.validate_attributes(Utc::now()).unwrap_err();
    assert!(err.cause.contains("StateMachineJSON invalid"), "cause: {}", err.cause);
}

#[tokio::test]
async fn stored_release_check_passes_for_faithful_copy() {
    let mut release = mock_release();
    let memory = mock_clients(&mut release);
    release.validate_stored_release(&memory.clients()).await.unwrap();
}

#[tokio::test]
async fn stored_release_check_rejects_unparseable_copy() {
    let mut release = mock_release();
    let memory = mock_clients(&mut release);
    memory.store.seed("bucket", &release.release_path(), b"bad_release".to_vec());

    let err = release.validate_stored_release(&memory.clients()).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::BadRelease);
    assert!(err.cause.contains("uploaded Release record"), "cause: {}", err.cause);
}

#[tokio::test]
async fn stored_release_check_rejects_different_descriptor() {
    let mut release = mock_release();
    let memory = mock_clients(&mut release);
    memory.store.seed("bucket", &release.release_path(), b"{}".to_vec());

    let err = release.validate_stored_release(&memory.clients()).await.unwrap_err();
    assert!(err.cause.contains("Release SHA"), "cause: {}", err.cause);
}

#[tokio::test]
async fn zip_digest_check() {
    let mut release = mock_release();
    let memory = mock_clients(&mut release);
    release.validate_zip_digest(&memory.clients()).await.unwrap();

    release.lambda_sha256 = Some("wrongsha".to_string());
    let err = release.validate_zip_digest(&memory.clients()).await.unwrap_err();
    assert!(err.cause.contains("Lambda SHA"), "cause: {}", err.cause);
}

#[tokio::test]
async fn resource_validation_accepts_mock() {
    let mut release = mock_release();
    let memory = mock_clients(&mut release);
    release.validate_resources(&memory.clients()).await.unwrap();
}

#[tokio::test]
async fn resource_validation_rejects_wrong_deploy_with_tag() {
    let mut release = mock_release();
    let memory = mock_clients(&mut release);
    memory.functions.set_tag("DeployWith", "wrong_tag");

    let err = release.validate_resources(&memory.clients()).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::BadRelease);
    assert!(err.cause.contains("DeployWith"), "cause: {}", err.cause);
}

#[tokio::test]
async fn resource_validation_rejects_wrong_role_path() {
    let mut release = mock_release();
    let memory = mock_clients(&mut release);
    memory.workflows.set_role_arn(
        &release.step_arn(),
        "arn:aws:iam::0000000000:role/step/wrongproject/development/role-name",
    );

    let err = release.validate_resources(&memory.clients()).await.unwrap_err();
    assert!(err.cause.contains("Role Path"), "cause: {}", err.cause);
}

#[tokio::test]
async fn deploy_state_machine_records_definition() {
    let mut release = mock_release();
    let memory = mock_clients(&mut release);
    release.deploy_state_machine(&memory.clients()).await.unwrap();

    let updates = memory.workflows.updated_definitions();
    assert_eq!(updates.len(), 1);
    assert_eq!(updates[0].0, release.step_arn());
}

#[tokio::test]
async fn deploy_state_machine_failure_is_sfn_kind() {
    let mut release = mock_release();
    let memory = mock_clients(&mut release);
    memory.workflows.fail_updates("AWSSFNError");

    let err = release.deploy_state_machine(&memory.clients()).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::DeploySfn);
    assert!(err.cause.contains("AWSSFNError"));
}

#[tokio::test]
async fn deploy_function_code_pushes_stored_zip() {
    let mut release = mock_release();
    let memory = mock_clients(&mut release);
    release.deploy_function_code(&memory.clients()).await.unwrap();

    let updates = memory.functions.updates();
    assert_eq!(updates, vec![(release.lambda_arn(), b"lambda_zip".len())]);
}

#[tokio::test]
async fn deploy_function_code_failure_is_lambda_kind() {
    let mut release = mock_release();
    let memory = mock_clients(&mut release);
    memory.functions.fail_updates("AWSLambdaError");

    let err = release.deploy_function_code(&memory.clients()).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::DeployLambda);
}

#[tokio::test]
async fn halt_marker_round_trip() {
    let mut release = mock_release();
    let memory = mock_clients(&mut release);
    let clients = memory.clients();

    assert_eq!(release.halt_message(&clients, Utc::now()).await.unwrap(), None);

    release.halt(&clients, "incident 41").await.unwrap();
    assert!(memory.store.contains("bucket", "account/project/development/halt"));
    assert_eq!(
        release.halt_message(&clients, Utc::now()).await.unwrap(),
        Some("incident 41".to_string())
    );

    release.clear_halt(&clients).await.unwrap();
    assert_eq!(release.halt_message(&clients, Utc::now()).await.unwrap(), None);
}

#[tokio::test]
async fn stale_halt_markers_are_ignored() {
    let mut release = mock_release();
    let memory = mock_clients(&mut release);
    let clients = memory.clients();

    release.halt(&clients, "old incident").await.unwrap();
    memory.store.set_last_modified(
        "bucket",
        &release.halt_path(),
        Utc::now() - Duration::minutes(10),
    );

    assert_eq!(release.halt_message(&clients, Utc::now()).await.unwrap(), None);
}

#[tokio::test]
async fn write_log_records_outcome_at_log_path() {
    let mut release = mock_release();
    let memory = mock_clients(&mut release);
    release.uuid = Some("u1".to_string());
    release.success = Some(true);

    let at = Utc::now();
    release.write_log(&memory.clients(), at).await.unwrap();

    let body = memory.store.object("bucket", &release.log_path()).unwrap();
    let log: DeployLog = serde_json::from_slice(&body).unwrap();
    assert_eq!(log.release_id.as_deref(), Some("release-1"));
    assert_eq!(log.uuid.as_deref(), Some("u1"));
    assert!(log.success);
    assert_eq!(log.at, at);
}

#[tokio::test]
async fn lock_round_trip_uses_table_and_root_path() {
    let mut release = mock_release();
    release.uuid = Some("u1".to_string());
    let locker = MemoryLocker::new();

    assert!(release.grab_lock(&locker).await.unwrap());
    let record = locker.find("lambdaname-locks", "account/project/development/lock").unwrap();
    assert_eq!(record.uuid, "u1");
    assert!(record.reason.contains("release-1"));

    release.release_lock(&locker).await.unwrap();
    assert!(locker.find("lambdaname-locks", "account/project/development/lock").is_none());
}

#[test]
fn wire_shape_is_snake_case() {
    let release = mock_release();
    let value = serde_json::to_value(&release).unwrap();
    assert!(value.get("release_id").is_some());
    assert!(value.get("project_name").is_some());
    assert!(value.get("step_fn_name").is_some());
    // Unset derived fields stay off the wire
    assert!(value.get("uuid").is_none());
    assert!(value.get("release_sha256").is_none());
}
