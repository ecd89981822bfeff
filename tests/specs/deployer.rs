// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Deployer scenarios: one healthy deploy and every classified failure.

use crate::prelude::*;

#[tokio::test]
async fn happy_path_deploys_and_releases_lock() {
    let fixture = deployer_fixture();
    let execution = fixture.run().await;

    assert!(execution.error.is_none(), "error: {:?}", execution.error);
    assert_eq!(execution.output["success"], json!(true));
    assert!(!execution.last_output_json.contains("\"error\""));

    assert_eq!(
        execution.path(),
        vec!["Validate", "Lock", "ValidateResources", "Deploy", "Success"]
    );

    // Exactly one lock grab at the root lock key, and exactly one release
    assert_eq!(
        fixture.lock_grabs().iter().map(|(t, k, _)| (t.as_str(), k.as_str())).collect::<Vec<_>>(),
        vec![(LOCK_TABLE, ROOT_LOCK_KEY)]
    );
    assert_eq!(fixture.lock_releases().len(), 1);
    assert_eq!(fixture.lock_rows(), 0);

    // Definition then code both reached the control planes
    assert_eq!(fixture.memory.workflows.updated_definitions().len(), 1);
    assert_eq!(fixture.memory.functions.updates().len(), 1);

    // And the outcome was logged at the release's log path
    assert!(fixture.memory.store.contains("bucket", &fixture.release.log_path()));
}

#[tokio::test]
async fn empty_input_fails_cleanly_before_locking() {
    let fixture = deployer_fixture();
    let execution = fixture.machine.execute(json!({})).await;

    let err = execution.error.clone().unwrap();
    assert_eq!(err.kind, ErrorKind::Notify);
    assert!(execution.last_output_json.contains("BadReleaseError"));

    assert_eq!(execution.path(), vec!["Validate", "FailureClean"]);
    assert!(fixture.lock_grabs().is_empty());
}

#[tokio::test]
async fn missing_release_id_reports_field() {
    let fixture = deployer_fixture();
    let mut release = fixture.release.clone();
    release.release_id = None;

    let execution = fixture.machine.execute(serde_json::to_value(&release).unwrap()).await;

    assert!(execution.last_output_json.contains("BadReleaseError"));
    assert!(execution.last_output_json.contains("ReleaseId must"));
    assert_eq!(execution.path(), vec!["Validate", "FailureClean"]);
    assert!(fixture.lock_grabs().is_empty());
}

#[tokio::test]
async fn stale_release_fails_cleanly() {
    let fixture = deployer_fixture();
    let mut release = fixture.release.clone();
    release.created_at = Some(chrono::Utc::now() - chrono::Duration::hours(6));

    let execution = fixture.machine.execute(serde_json::to_value(&release).unwrap()).await;

    assert!(execution.last_output_json.contains("BadReleaseError"));
    assert!(execution.last_output_json.contains("older"));
    assert_eq!(execution.path(), vec!["Validate", "FailureClean"]);
}

#[tokio::test]
async fn competing_lock_fails_cleanly_without_mutations() {
    let fixture = deployer_fixture();
    fixture.memory.lock_table.seed(LOCK_TABLE, ROOT_LOCK_KEY, "notuuid");

    let execution = fixture.run().await;

    let err = execution.error.clone().unwrap();
    assert_eq!(err.kind, ErrorKind::Notify);
    assert!(execution.last_output_json.contains("LockExistsError"));
    assert!(execution.last_output_json.contains("Lock Already Exists"));

    assert_eq!(execution.path(), vec!["Validate", "Lock", "FailureClean"]);

    // Zero net lock mutations: the competing row is untouched
    assert!(fixture.lock_grabs().is_empty());
    assert!(fixture.lock_releases().is_empty());
    assert_eq!(fixture.memory.lock_table.row(LOCK_TABLE, ROOT_LOCK_KEY).unwrap().id, "notuuid");
}

#[tokio::test]
async fn lock_backend_failure_releases_and_fails_cleanly() {
    let fixture = deployer_fixture();
    fixture.memory.lock_table.fail_puts("PuttyError");

    let execution = fixture.run().await;

    assert!(execution.last_output_json.contains("LockError"));
    assert!(execution.last_output_json.contains("PuttyError"));
    assert_eq!(
        execution.path(),
        vec!["Validate", "Lock", "ReleaseLockFailure", "FailureClean"]
    );
    assert_eq!(fixture.lock_rows(), 0);
}

#[tokio::test]
async fn wrong_function_tags_release_lock_then_fail_clean() {
    let fixture = deployer_fixture();
    fixture.memory.functions.set_tag("DeployWith", "wrong_tag");

    let execution = fixture.run().await;

    let err = execution.error.clone().unwrap();
    assert_eq!(err.kind, ErrorKind::Notify);
    assert!(execution.last_output_json.contains("BadReleaseError"));
    assert!(execution.last_output_json.contains("DeployWith"));

    assert_eq!(
        execution.path(),
        vec!["Validate", "Lock", "ValidateResources", "ReleaseLockFailure", "FailureClean"]
    );

    // The lock was grabbed and then released on the failure path
    assert_eq!(fixture.lock_grabs().len(), 1);
    assert_eq!(fixture.lock_releases().len(), 1);
    assert_eq!(fixture.lock_rows(), 0);
}

#[tokio::test]
async fn wrong_role_path_release_lock_then_fail_clean() {
    let fixture = deployer_fixture();
    fixture.memory.workflows.set_role_arn(
        &fixture.release.step_arn(),
        "arn:aws:iam::0000000000:role/step/wrongproject/development/role-name",
    );

    let execution = fixture.run().await;

    assert!(execution.last_output_json.contains("BadReleaseError"));
    assert!(execution.last_output_json.contains("Role Path"));
    assert_eq!(
        execution.path(),
        vec!["Validate", "Lock", "ValidateResources", "ReleaseLockFailure", "FailureClean"]
    );
    assert_eq!(fixture.lock_rows(), 0);
}

#[tokio::test]
async fn wrong_zip_digest_release_lock_then_fail_clean() {
    let fixture = deployer_fixture();
    let mut release = fixture.release.clone();
    release.lambda_sha256 = Some("wrongsha".to_string());
    // Keep the stored copy consistent with what this client "uploaded"
    fixture.memory.store.seed(
        "bucket",
        &release.release_path(),
        serde_json::to_vec(&release).unwrap(),
    );

    let execution = fixture.machine.execute(serde_json::to_value(&release).unwrap()).await;

    assert!(execution.last_output_json.contains("BadReleaseError"));
    assert!(execution.last_output_json.contains("Lambda SHA"));
    assert_eq!(
        execution.path(),
        vec!["Validate", "Lock", "ValidateResources", "ReleaseLockFailure", "FailureClean"]
    );
    assert_eq!(fixture.lock_rows(), 0);
}

#[tokio::test]
async fn tampered_release_record_release_lock_then_fail_clean() {
    let fixture = deployer_fixture();
    fixture.memory.store.seed("bucket", &fixture.release.release_path(), b"{}".to_vec());

    let execution = fixture.run().await;

    assert!(execution.last_output_json.contains("BadReleaseError"));
    assert!(execution.last_output_json.contains("Release SHA"));
    assert_eq!(
        execution.path(),
        vec!["Validate", "Lock", "ValidateResources", "ReleaseLockFailure", "FailureClean"]
    );
}

#[tokio::test]
async fn fresh_halt_marker_stops_the_deploy_cleanly() {
    let fixture = deployer_fixture();
    fixture
        .release
        .halt(&fixture.memory.clients(), "incident 41")
        .await
        .unwrap();

    let execution = fixture.run().await;

    let err = execution.error.clone().unwrap();
    assert_eq!(err.kind, ErrorKind::Notify);
    assert!(execution.last_output_json.contains("deploys halted"));
    assert!(execution.last_output_json.contains("incident 41"));

    assert_eq!(
        execution.path(),
        vec!["Validate", "Lock", "ValidateResources", "ReleaseLockFailure", "FailureClean"]
    );
    assert_eq!(fixture.lock_rows(), 0);
    // Nothing remote was touched
    assert!(fixture.memory.workflows.updated_definitions().is_empty());
}

#[tokio::test]
async fn workflow_update_failure_is_clean() {
    let fixture = deployer_fixture();
    fixture.memory.workflows.fail_updates("AWSSFNError");

    let execution = fixture.run().await;

    let err = execution.error.clone().unwrap();
    assert_eq!(err.kind, ErrorKind::Notify);
    assert!(execution.last_output_json.contains("DeploySFNError"));
    assert!(execution.last_output_json.contains("AWSSFNError"));

    assert_eq!(
        execution.path(),
        vec![
            "Validate",
            "Lock",
            "ValidateResources",
            "Deploy",
            "ReleaseLockFailure",
            "FailureClean",
        ]
    );

    // The workflow was never touched, and the code plane never reached
    assert!(fixture.memory.workflows.updated_definitions().is_empty());
    assert!(fixture.memory.functions.updates().is_empty());
    assert_eq!(fixture.lock_rows(), 0);
}

#[tokio::test]
async fn code_update_failure_is_dirty_and_keeps_lock() {
    let fixture = deployer_fixture();
    fixture.memory.functions.fail_updates("AWSLambdaError");

    let execution = fixture.run().await;

    let err = execution.error.clone().unwrap();
    assert_eq!(err.kind, ErrorKind::Alert);
    assert!(execution.last_output_json.contains("DeployLambdaError"));
    assert!(execution.last_output_json.contains("AWSLambdaError"));

    assert_eq!(
        execution.path(),
        vec!["Validate", "Lock", "ValidateResources", "Deploy", "FailureDirty"]
    );

    // The definition went out before the code failed: dirty, lock held
    assert_eq!(fixture.memory.workflows.updated_definitions().len(), 1);
    assert_eq!(fixture.lock_rows(), 1);
}

#[tokio::test]
async fn unreleasable_lock_retries_then_alerts() {
    let fixture = deployer_fixture();
    fixture.memory.functions.set_tag("DeployWith", "wrong_tag");
    fixture.memory.lock_table.fail_deletes("connection reset");

    let execution = fixture.run().await;

    let err = execution.error.clone().unwrap();
    assert_eq!(err.kind, ErrorKind::Alert);

    // Release is attempted once, retried three times, then alerts
    assert_eq!(
        execution.path(),
        vec![
            "Validate",
            "Lock",
            "ValidateResources",
            "ReleaseLockFailure",
            "ReleaseLockFailure",
            "ReleaseLockFailure",
            "ReleaseLockFailure",
            "FailureDirty",
        ]
    );
    assert_eq!(fixture.lock_rows(), 1);
}

#[tokio::test]
async fn client_set_derived_fields_cannot_change_the_outcome() {
    let fixture = deployer_fixture();
    let mut tampered = fixture.release.clone();
    tampered.uuid = Some("attacker-uuid".to_string());
    tampered.release_sha256 = Some("attacker-sha".to_string());
    tampered.success = Some(true);

    let execution = fixture.machine.execute(serde_json::to_value(&tampered).unwrap()).await;

    assert!(execution.error.is_none(), "error: {:?}", execution.error);
    assert_eq!(
        execution.path(),
        vec!["Validate", "Lock", "ValidateResources", "Deploy", "Success"]
    );
    // The lock was grabbed under a fresh server-side uuid
    assert_ne!(fixture.lock_grabs()[0].2, "attacker-uuid");
}
