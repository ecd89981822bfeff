// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Engine laws that only show up across whole executions.

use crate::prelude::*;
use relay_core::StateError;
use relay_machine::{handler_fn, TaskContext};
use std::sync::atomic::{AtomicU32, Ordering};

#[tokio::test]
async fn deployer_history_orders_entries_and_exits() {
    let fixture = deployer_fixture();
    let execution = fixture.run().await;
    assert!(execution.error.is_none());

    let kinds: Vec<String> = execution.history.iter().map(|e| e.kind()).collect();
    assert_eq!(kinds.first().map(String::as_str), Some("ExecutionStarted"));
    assert_eq!(kinds.last().map(String::as_str), Some("ExecutionSucceeded"));

    // Every state enters before it exits, alternating through the run
    let inner = &kinds[1..kinds.len() - 1];
    for pair in inner.chunks(2) {
        assert!(pair[0].ends_with("StateEntered"), "got {pair:?}");
        assert!(pair[1].ends_with("StateExited"), "got {pair:?}");
    }

    // Timestamps never go backwards
    let times: Vec<_> = execution.history.iter().map(|e| e.timestamp()).collect();
    assert!(times.windows(2).all(|w| w[0] <= w[1]));
}

#[tokio::test]
async fn parallel_branches_collect_in_input_order() {
    let raw = r#"{
      "StartAt": "Fan",
      "States": {
        "Fan": {
          "Type": "Parallel",
          "End": true,
          "Branches": [
            {
              "StartAt": "Slow",
              "States": {
                "Slow": { "Type": "Wait", "Seconds": 1, "Next": "SlowDone" },
                "SlowDone": { "Type": "Pass", "Result": "slow", "End": true }
              }
            },
            {
              "StartAt": "Fast",
              "States": { "Fast": { "Type": "Pass", "Result": "fast", "End": true } }
            }
          ]
        }
      }
    }"#;
    let machine = Machine::from_json(raw).unwrap();
    let execution = machine.execute(json!({})).await;

    assert!(execution.error.is_none());
    // The slow branch still lands first: outputs are slotted by input order
    assert_eq!(execution.output, json!(["slow", "fast"]));
}

#[tokio::test]
async fn parallel_branches_do_not_share_input_mutations() {
    let raw = r#"{
      "StartAt": "Fan",
      "States": {
        "Fan": {
          "Type": "Parallel",
          "End": true,
          "Branches": [
            {
              "StartAt": "MarkA",
              "States": { "MarkA": { "Type": "Pass", "Result": "a", "ResultPath": "$.mark", "End": true } }
            },
            {
              "StartAt": "MarkB",
              "States": { "MarkB": { "Type": "Pass", "Result": "b", "ResultPath": "$.mark", "End": true } }
            }
          ]
        }
      }
    }"#;
    let machine = Machine::from_json(raw).unwrap();
    let execution = machine.execute(json!({"seed": 1})).await;

    assert_eq!(
        execution.output,
        json!([{"seed": 1, "mark": "a"}, {"seed": 1, "mark": "b"}])
    );
}

#[tokio::test]
async fn map_iterates_in_sequence_order() {
    let raw = r#"{
      "StartAt": "Each",
      "States": {
        "Each": {
          "Type": "Map",
          "ItemsPath": "$.items",
          "ResultPath": "$.out",
          "End": true,
          "Iterator": {
            "StartAt": "Tag",
            "States": { "Tag": { "Type": "Pass", "Result": true, "ResultPath": "$.seen", "End": true } }
          }
        }
      }
    }"#;
    let machine = Machine::from_json(raw).unwrap();
    let execution = machine.execute(json!({"items": [{"n": 1}, {"n": 2}]})).await;

    assert!(execution.error.is_none());
    assert_eq!(
        execution.output["out"],
        json!([{"n": 1, "seen": true}, {"n": 2, "seen": true}])
    );
}

#[tokio::test]
async fn retry_then_catch_across_distinct_kinds() {
    // LockError retries twice; the final BadReleaseError is caught instead
    let raw = r#"{
      "StartAt": "Flaky",
      "States": {
        "Flaky": {
          "Type": "TaskFn",
          "Next": "Done",
          "Retry": [{"ErrorEquals": ["LockError"], "MaxAttempts": 2}],
          "Catch": [{"ErrorEquals": ["BadReleaseError"], "ResultPath": "$.error", "Next": "Recovered"}]
        },
        "Recovered": { "Type": "Pass", "End": true },
        "Done": { "Type": "Succeed" }
      }
    }"#;
    let mut machine = Machine::from_json(raw).unwrap();

    let calls = Arc::new(AtomicU32::new(0));
    let seen = calls.clone();
    machine
        .set_task_handler(
            "Flaky",
            handler_fn(move |_ctx: TaskContext, _input: Value| {
                let seen = seen.clone();
                async move {
                    let n = seen.fetch_add(1, Ordering::SeqCst);
                    if n < 2 {
                        Err::<Value, _>(StateError::lock("transient"))
                    } else {
                        Err(StateError::bad_release("permanent"))
                    }
                }
            }),
        )
        .unwrap();

    let execution = machine.execute(json!({})).await;
    assert!(execution.error.is_none());
    assert_eq!(calls.load(Ordering::SeqCst), 3);
    assert_eq!(execution.path(), vec!["Flaky", "Flaky", "Flaky", "Recovered"]);
    assert_eq!(execution.output["error"]["Error"], json!("BadReleaseError"));
}

#[tokio::test]
async fn wait_states_validate_paths_and_continue() {
    let raw = r#"{
      "StartAt": "Hold",
      "States": {
        "Hold": { "Type": "Wait", "SecondsPath": "$.delay", "Next": "Done" },
        "Done": { "Type": "Succeed" }
      }
    }"#;
    let machine = Machine::from_json(raw).unwrap();

    let ok = machine.execute(json!({"delay": 2})).await;
    assert!(ok.error.is_none());
    assert_eq!(ok.path(), vec!["Hold", "Done"]);

    let bad = machine.execute(json!({"delay": "soon"})).await;
    assert!(bad.error.is_some());
}

#[tokio::test]
async fn concurrent_deploys_one_wins_one_fails_clean() {
    // Two executions race the same root lock; only one can deploy
    let fixture = deployer_fixture();
    let (first, second) = tokio::join!(fixture.run(), fixture.run());

    let succeeded =
        [&first, &second].iter().filter(|e| e.error.is_none()).count();
    let clean_failures = [&first, &second]
        .iter()
        .filter(|e| {
            e.error.as_ref().map(|err| err.kind == ErrorKind::Notify).unwrap_or(false)
        })
        .count();

    assert_eq!(succeeded + clean_failures, 2);
    assert!(succeeded >= 1, "at least one deploy wins the lock");
    // Whatever happened, nobody left the lock held
    assert_eq!(fixture.lock_rows(), 0);
}
