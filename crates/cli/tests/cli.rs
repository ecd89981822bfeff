// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![allow(clippy::panic)]
#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

//! Drive the relay binary end to end.

use assert_cmd::Command;

fn relay() -> Command {
    let mut cmd = Command::cargo_bin("relay").unwrap_or_else(|e| panic!("relay binary: {e}"));
    cmd.env_remove("AWS_REGION").env_remove("AWS_ACCOUNT_ID");
    cmd
}

#[test]
fn no_subcommand_prints_usage_and_fails() {
    relay().assert().failure();
}

#[test]
fn json_prints_the_deployer_definition() {
    let output = relay().args(["json"]).assert().success();
    let stdout = String::from_utf8_lossy(&output.get_output().stdout).into_owned();

    let machine: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(machine["StartAt"], serde_json::json!("Validate"));
    assert_eq!(machine["States"]["Deploy"]["Type"], serde_json::json!("Task"));
}

#[test]
fn json_fills_resources_from_environment() {
    let output = relay()
        .args(["json"])
        .env("AWS_REGION", "us-east-1")
        .env("AWS_ACCOUNT_ID", "000000000")
        .assert()
        .success();
    let stdout = String::from_utf8_lossy(&output.get_output().stdout).into_owned();
    assert!(stdout.contains("arn:aws:lambda:us-east-1:000000000:function:relay-deployer"));
}

#[test]
fn dot_renders_a_digraph() {
    let output = relay()
        .args(["dot", "--states", r#"{"StartAt": "WIN", "States": {"WIN": {"Type": "Succeed"}}}"#])
        .assert()
        .success();
    let stdout = String::from_utf8_lossy(&output.get_output().stdout).into_owned();
    assert!(stdout.starts_with("digraph StateMachine {"));
    assert!(stdout.contains("_Start -> \"WIN\""));
}

#[test]
fn dot_rejects_bad_definitions() {
    relay().args(["dot", "--states", "{\"no\": \"machine\"}"]).assert().failure();
}

#[test]
fn exec_with_empty_input_fails_cleanly() {
    let output = relay().args(["exec", "--input", "{}"]).assert().failure();
    let stdout = String::from_utf8_lossy(&output.get_output().stdout).into_owned();
    // The final output is FailureClean's {Error, Cause} payload
    assert!(stdout.contains("NotifyError"), "stdout: {stdout}");
}

#[test]
fn exec_rejects_unparseable_input() {
    relay().args(["exec", "--input", "not json"]).assert().failure();
}

#[test]
fn bootstrap_simulates_a_direct_push() {
    let dir = tempfile::tempdir().unwrap();
    let zip = dir.path().join("lambda.zip");
    std::fs::write(&zip, b"lambda_zip").unwrap();
    let zip_arg = zip.to_string_lossy().into_owned();

    let output = relay()
        .args([
            "bootstrap",
            "--project",
            "project",
            "--config",
            "development",
            "--lambda",
            "lambdaname",
            "--step",
            "stepfnname",
            "--bucket",
            "bucket",
            "--zip",
            zip_arg.as_str(),
            "--region",
            "region",
            "--account",
            "account",
        ])
        .assert()
        .success();

    let stdout = String::from_utf8_lossy(&output.get_output().stdout).into_owned();
    assert!(stdout.contains("bootstrapped release-"), "stdout: {stdout}");
}

#[test]
fn bootstrap_without_region_account_fails() {
    let dir = tempfile::tempdir().unwrap();
    let zip = dir.path().join("lambda.zip");
    std::fs::write(&zip, b"lambda_zip").unwrap();
    let zip_arg = zip.to_string_lossy().into_owned();

    relay()
        .args([
            "bootstrap",
            "--project",
            "project",
            "--config",
            "development",
            "--lambda",
            "lambdaname",
            "--step",
            "stepfnname",
            "--bucket",
            "bucket",
            "--zip",
            zip_arg.as_str(),
        ])
        .assert()
        .failure();
}
