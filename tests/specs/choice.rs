// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Choice routing through whole executions.

use crate::prelude::*;

const ROUTING_MACHINE: &str = r#"{
  "StartAt": "Route",
  "States": {
    "Route": {
      "Type": "Choice",
      "Default": "Unknown",
      "Choices": [
        {
          "And": [
            {"Variable": "$.env", "StringEquals": "production"},
            {"Variable": "$.approved", "BooleanEquals": true}
          ],
          "Next": "Production"
        },
        {"Variable": "$.env", "StringEquals": "development", "Next": "Development"},
        {"Variable": "$.retries", "NumericGreaterThanEquals": 3, "Next": "GiveUp"},
        {"Not": {"Variable": "$.env", "StringEquals": "test"}, "Next": "NotTest"}
      ]
    },
    "Production":  { "Type": "Pass", "Result": "production",  "ResultPath": "$.route", "End": true },
    "Development": { "Type": "Pass", "Result": "development", "ResultPath": "$.route", "End": true },
    "GiveUp":      { "Type": "Pass", "Result": "give-up",     "ResultPath": "$.route", "End": true },
    "NotTest":     { "Type": "Pass", "Result": "not-test",    "ResultPath": "$.route", "End": true },
    "Unknown":     { "Type": "Pass", "Result": "unknown",     "ResultPath": "$.route", "End": true }
  }
}"#;

async fn route_of(input: Value) -> String {
    let machine = Machine::from_json(ROUTING_MACHINE).unwrap();
    let execution = machine.execute(input).await;
    assert!(execution.error.is_none(), "error: {:?}", execution.error);
    execution.output["route"].as_str().unwrap_or_default().to_string()
}

#[tokio::test]
async fn and_branch_wins_when_both_hold() {
    let route = route_of(json!({"env": "production", "approved": true})).await;
    assert_eq!(route, "production");
}

#[tokio::test]
async fn first_matching_choice_is_taken_in_order() {
    // "development" also satisfies the Not-test rule further down
    let route = route_of(json!({"env": "development", "approved": false})).await;
    assert_eq!(route, "development");
}

#[tokio::test]
async fn numeric_threshold_routes() {
    let route = route_of(json!({"env": "test", "retries": 3})).await;
    assert_eq!(route, "give-up");
}

#[tokio::test]
async fn not_rule_routes() {
    let route = route_of(json!({"env": "staging", "retries": 0})).await;
    assert_eq!(route, "not-test");
}

// With a Default configured, odd inputs never fail the choice state
#[tokio::test]
async fn default_catches_everything_else() {
    for input in [
        json!({"env": "test", "retries": 0}),
        json!({"env": "test"}),
        json!({"env": "test", "retries": "nope"}),
    ] {
        let route = route_of(input).await;
        assert_eq!(route, "unknown");
    }
}

// A wrong-kind variable is simply false, which a Not rule then negates
#[tokio::test]
async fn not_rule_matches_wrong_kind_variables() {
    let route = route_of(json!({"env": 42, "retries": "nope"})).await;
    assert_eq!(route, "not-test");
}

#[tokio::test]
async fn no_default_and_no_match_fails_the_execution() {
    let raw = r#"{
      "StartAt": "Route",
      "States": {
        "Route": {
          "Type": "Choice",
          "Choices": [{"Variable": "$.n", "NumericEquals": 1, "Next": "Done"}]
        },
        "Done": { "Type": "Succeed" }
      }
    }"#;
    let machine = Machine::from_json(raw).unwrap();
    let execution = machine.execute(json!({"n": 2})).await;

    let err = execution.error.unwrap();
    assert!(err.cause.contains("ChoiceState(Route)"), "cause: {}", err.cause);
}

#[tokio::test]
async fn timestamp_comparison_routes_by_wall_clock() {
    let raw = r#"{
      "StartAt": "Cutover",
      "States": {
        "Cutover": {
          "Type": "Choice",
          "Default": "Before",
          "Choices": [
            {"Variable": "$.at", "TimestampGreaterThanEquals": "2024-01-01T00:00:00Z", "Next": "After"}
          ]
        },
        "Before": { "Type": "Pass", "Result": "before", "ResultPath": "$.route", "End": true },
        "After":  { "Type": "Pass", "Result": "after",  "ResultPath": "$.route", "End": true }
      }
    }"#;
    let machine = Machine::from_json(raw).unwrap();

    let after = machine.execute(json!({"at": "2024-06-01T00:00:00Z"})).await;
    assert_eq!(after.output["route"], json!("after"));

    let before = machine.execute(json!({"at": "2023-06-01T00:00:00Z"})).await;
    assert_eq!(before.output["route"], json!("before"));
}
