// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Execution results and history.
//!
//! Every run of a machine produces an [`Execution`]: the final output, the
//! last interim output, the terminal error if any, and a totally ordered
//! list of [`HistoryEvent`]s recording state entries and exits.

use crate::state::StateType;
use chrono::{DateTime, Utc};
use relay_core::StateError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One entry in the execution history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum HistoryEvent {
    ExecutionStarted {
        timestamp: DateTime<Utc>,
    },
    ExecutionSucceeded {
        timestamp: DateTime<Utc>,
    },
    ExecutionFailed {
        timestamp: DateTime<Utc>,
    },
    StateEntered {
        timestamp: DateTime<Utc>,
        state_type: StateType,
        name: String,
        /// JSON-rendered input handed to the state.
        input: String,
    },
    StateExited {
        timestamp: DateTime<Utc>,
        state_type: StateType,
        name: String,
        /// JSON-rendered output the state produced.
        output: String,
    },
}

impl HistoryEvent {
    /// The composite event tag, e.g. `TaskStateEntered`.
    pub fn kind(&self) -> String {
        match self {
            HistoryEvent::ExecutionStarted { .. } => "ExecutionStarted".to_string(),
            HistoryEvent::ExecutionSucceeded { .. } => "ExecutionSucceeded".to_string(),
            HistoryEvent::ExecutionFailed { .. } => "ExecutionFailed".to_string(),
            HistoryEvent::StateEntered { state_type, .. } => {
                format!("{state_type}StateEntered")
            }
            HistoryEvent::StateExited { state_type, .. } => {
                format!("{state_type}StateExited")
            }
        }
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            HistoryEvent::ExecutionStarted { timestamp }
            | HistoryEvent::ExecutionSucceeded { timestamp }
            | HistoryEvent::ExecutionFailed { timestamp }
            | HistoryEvent::StateEntered { timestamp, .. }
            | HistoryEvent::StateExited { timestamp, .. } => *timestamp,
        }
    }
}

/// The result of executing a state machine.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Execution {
    /// Final output value (`Null` until the run finishes).
    pub output: Value,
    /// Pretty-printed final output.
    pub output_json: String,
    /// Terminal error, when the run failed.
    pub error: Option<StateError>,

    /// Most recent state output observed while running.
    pub last_output: Value,
    pub last_output_json: String,

    pub history: Vec<HistoryEvent>,
}

impl Execution {
    /// A fresh execution with the `ExecutionStarted` event recorded.
    pub fn started() -> Self {
        let mut execution = Self::default();
        execution.history.push(HistoryEvent::ExecutionStarted { timestamp: Utc::now() });
        execution
    }

    pub(crate) fn entered(&mut self, state_type: StateType, name: &str, input: &Value) {
        self.history.push(HistoryEvent::StateEntered {
            timestamp: Utc::now(),
            state_type,
            name: name.to_string(),
            input: render(input),
        });
    }

    pub(crate) fn exited(&mut self, state_type: StateType, name: &str, output: &Value) {
        self.last_output = output.clone();
        self.last_output_json = render(output);
        self.history.push(HistoryEvent::StateExited {
            timestamp: Utc::now(),
            state_type,
            name: name.to_string(),
            output: render(output),
        });
    }

    pub(crate) fn succeeded(&mut self, output: Value) {
        self.output_json = render_pretty(&output);
        self.output = output;
        self.history.push(HistoryEvent::ExecutionSucceeded { timestamp: Utc::now() });
    }

    pub(crate) fn failed(&mut self, output: Value, error: StateError) {
        self.output_json = render_pretty(&output);
        self.output = output;
        self.error = Some(error);
        self.history.push(HistoryEvent::ExecutionFailed { timestamp: Utc::now() });
    }

    /// Names of states entered, in order.
    pub fn path(&self) -> Vec<String> {
        self.history
            .iter()
            .filter_map(|event| match event {
                HistoryEvent::StateEntered { name, .. } => Some(name.clone()),
                _ => None,
            })
            .collect()
    }

    /// JSON of the most recent state exit, scanning the history.
    pub fn last_exited_output(&self) -> String {
        self.history
            .iter()
            .rev()
            .find_map(|event| match event {
                HistoryEvent::StateExited { output, .. } => Some(output.clone()),
                _ => None,
            })
            .unwrap_or_default()
    }

    /// Final output as a map, when it is one.
    pub fn output_map(&self) -> Option<&serde_json::Map<String, Value>> {
        self.output.as_object()
    }

    pub fn succeeded_cleanly(&self) -> bool {
        self.error.is_none()
    }
}

fn render(value: &Value) -> String {
    serde_json::to_string(value).unwrap_or_default()
}

fn render_pretty(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_default()
}

#[cfg(test)]
#[path = "execution_tests.rs"]
mod tests;
