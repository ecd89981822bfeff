// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The fixed deployer graph and its handler wiring.

use crate::handlers;
use crate::lock::Locker;
use relay_cloud::CloudClients;
use relay_machine::{Machine, TaskHandlers};
use std::sync::Arc;

/// Validate → Lock → ValidateResources → Deploy → Success, with every
/// failure classified clean (`NotifyError`) or dirty (`AlertError`).
const DEPLOYER_MACHINE: &str = r#"{
  "Comment": "Workflow Deployer",
  "StartAt": "Validate",
  "States": {
    "Validate": {
      "Type": "TaskFn",
      "Comment": "Validate and Set Defaults",
      "Next": "Lock",
      "Catch": [
        {
          "Comment": "Bad Release or Error GoTo end",
          "ErrorEquals": ["BadReleaseError", "UnmarshalError"],
          "ResultPath": "$.error",
          "Next": "FailureClean"
        },
        {
          "ErrorEquals": ["States.ALL"],
          "ResultPath": "$.error",
          "Next": "FailureClean"
        }
      ]
    },
    "Lock": {
      "Type": "TaskFn",
      "Comment": "Grab Root Lock",
      "Next": "ValidateResources",
      "Catch": [
        {
          "Comment": "Something else is deploying",
          "ErrorEquals": ["LockExistsError"],
          "ResultPath": "$.error",
          "Next": "FailureClean"
        },
        {
          "Comment": "Try Release Lock Then Fail",
          "ErrorEquals": ["States.ALL"],
          "ResultPath": "$.error",
          "Next": "ReleaseLockFailure"
        }
      ]
    },
    "ValidateResources": {
      "Type": "TaskFn",
      "Comment": "Check Resources and Uploaded Artifacts",
      "Next": "Deploy",
      "Catch": [
        {
          "Comment": "Try Release Lock Then Fail",
          "ErrorEquals": ["States.ALL"],
          "ResultPath": "$.error",
          "Next": "ReleaseLockFailure"
        }
      ]
    },
    "Deploy": {
      "Type": "TaskFn",
      "Comment": "Update Workflow Definition and Code",
      "Next": "Success",
      "Catch": [
        {
          "Comment": "Workflow untouched, safe to release and retry",
          "ErrorEquals": ["DeploySFNError"],
          "ResultPath": "$.error",
          "Next": "ReleaseLockFailure"
        },
        {
          "Comment": "Unsure of State, Leave Lock and Alert",
          "ErrorEquals": ["States.ALL"],
          "ResultPath": "$.error",
          "Next": "FailureDirty"
        }
      ]
    },
    "ReleaseLockFailure": {
      "Type": "TaskFn",
      "Comment": "Release the Lock and Fail",
      "Next": "FailureClean",
      "Retry": [
        {
          "Comment": "Keep trying to Release",
          "ErrorEquals": ["LockError"],
          "MaxAttempts": 3,
          "IntervalSeconds": 30
        }
      ],
      "Catch": [
        {
          "ErrorEquals": ["States.ALL"],
          "ResultPath": "$.error",
          "Next": "FailureDirty"
        }
      ]
    },
    "FailureClean": {
      "Comment": "Deploy Failed Cleanly, Safe to Retry",
      "Type": "Fail",
      "Error": "NotifyError",
      "Cause": "Deploy Failed Cleanly"
    },
    "FailureDirty": {
      "Comment": "Deploy Failed, Resources Left in Bad State, ALERT!",
      "Type": "Fail",
      "Error": "AlertError",
      "Cause": "Deploy Failed Dirty"
    },
    "Success": {
      "Type": "Succeed"
    }
  }
}"#;

/// The deployer graph with no handlers bound.
pub fn deployer_machine() -> Result<Machine, serde_json::Error> {
    Machine::from_json(DEPLOYER_MACHINE)
}

/// The deployer graph rendered with a function resource, for publishing.
pub fn deployer_machine_with_resource(lambda_arn: &str) -> Result<Machine, serde_json::Error> {
    let mut machine = deployer_machine()?;
    machine.set_resource(lambda_arn);
    Ok(machine)
}

/// The task handler registry backing the deployer.
pub fn task_handlers(clients: &CloudClients, locker: Arc<dyn Locker>) -> TaskHandlers {
    let mut handlers_map = TaskHandlers::new();
    handlers_map.insert("Validate", handlers::validate_handler());
    handlers_map.insert("Lock", handlers::lock_handler(locker.clone()));
    handlers_map.insert(
        "ValidateResources",
        handlers::validate_resources_handler(clients.clone()),
    );
    handlers_map.insert("Deploy", handlers::deploy_handler(clients.clone(), locker.clone()));
    handlers_map.insert("ReleaseLockFailure", handlers::release_lock_failure_handler(locker));
    handlers_map
}

/// The deployer graph with its task handlers bound.
pub fn deployer_machine_with_handlers(
    clients: &CloudClients,
    locker: Arc<dyn Locker>,
) -> Result<Machine, serde_json::Error> {
    let mut machine = deployer_machine()?;
    let registry = task_handlers(clients, locker);
    for name in registry.names() {
        if let Some(handler) = registry.get(&name) {
            // Every registry entry matches a task state in the fixed graph
            let _ = machine.set_task_handler(&name, handler);
        }
    }
    Ok(machine)
}

#[cfg(test)]
#[path = "machine_tests.rs"]
mod tests;
