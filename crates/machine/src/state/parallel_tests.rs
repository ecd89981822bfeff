// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serde_json::json;

fn parallel(raw: &str) -> ParallelState {
    let mut state: ParallelState = serde_json::from_str(raw).unwrap();
    state.name = "Fan".to_string();
    state
}

const TWO_BRANCHES: &str = r#"{
  "End": true,
  "Branches": [
    {
      "StartAt": "Left",
      "States": { "Left": { "Type": "Pass", "Result": {"branch": "left"}, "End": true } }
    },
    {
      "StartAt": "Right",
      "States": { "Right": { "Type": "Pass", "Result": {"branch": "right"}, "End": true } }
    }
  ]
}"#;

#[tokio::test]
async fn collects_branch_outputs_in_input_order() {
    let state = parallel(TWO_BRANCHES);
    let mut attempts = Vec::new();
    let (output, next) = state.execute(&mut attempts, &json!({"seed": 1})).await.unwrap();
    assert_eq!(output, json!([{"branch": "left"}, {"branch": "right"}]));
    assert_eq!(next, None);
}

#[tokio::test]
async fn result_path_merges_branch_outputs() {
    let raw = r#"{
      "End": true,
      "ResultPath": "$.branches",
      "Branches": [
        { "StartAt": "A", "States": { "A": { "Type": "Pass", "Result": 1, "End": true } } }
      ]
    }"#;
    let state = parallel(raw);
    let mut attempts = Vec::new();
    let (output, _) = state.execute(&mut attempts, &json!({"seed": 1})).await.unwrap();
    assert_eq!(output, json!({"seed": 1, "branches": [1]}));
}

#[tokio::test]
async fn branch_failure_propagates() {
    let raw = r#"{
      "End": true,
      "Branches": [
        { "StartAt": "Ok", "States": { "Ok": { "Type": "Succeed" } } },
        { "StartAt": "Boom", "States": { "Boom": { "Type": "Fail", "Error": "LockError", "Cause": "nope" } } }
      ]
    }"#;
    let state = parallel(raw);
    let mut attempts = Vec::new();
    let err = state.execute(&mut attempts, &json!({})).await.unwrap_err();
    assert_eq!(err.kind, relay_core::ErrorKind::Lock);
    assert!(err.cause.contains("branch failed"));
}

#[tokio::test]
async fn branch_failure_can_be_caught() {
    let raw = r#"{
      "Next": "N",
      "Catch": [{"ErrorEquals": ["States.ALL"], "ResultPath": "$.error", "Next": "Recover"}],
      "Branches": [
        { "StartAt": "Boom", "States": { "Boom": { "Type": "Fail", "Error": "LockError", "Cause": "nope" } } }
      ]
    }"#;
    let state = parallel(raw);
    let mut attempts = Vec::new();
    let (output, next) = state.execute(&mut attempts, &json!({"keep": 1})).await.unwrap();
    assert_eq!(next, Some("Recover".to_string()));
    assert_eq!(output["keep"], json!(1));
    assert_eq!(output["error"]["Error"], json!("LockError"));
}

#[test]
fn validate_requires_branches() {
    let state = parallel(r#"{"End": true}"#);
    assert!(state.validate().is_err());
}

#[test]
fn validate_checks_branch_machines() {
    let raw = r#"{
      "End": true,
      "Branches": [
        { "StartAt": "Ghost", "States": { "A": { "Type": "Succeed" } } }
      ]
    }"#;
    let state = parallel(raw);
    assert!(state.validate().is_err());
}
