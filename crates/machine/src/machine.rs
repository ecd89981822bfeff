// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The state machine: parse, validate, execute.

use crate::execution::Execution;
use crate::handler::{handler_fn, TaskContext, TaskHandler};
use crate::state::{State, StateType, TaskState};
use indexmap::IndexMap;
use relay_core::StateError;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use thiserror::Error;

/// Hard cap on state transitions within one execution.
pub const MAX_TRANSITIONS: usize = 25_000;

/// A structural problem with a machine or one of its states.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct ValidationError(pub String);

impl ValidationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }

    pub(crate) fn prefixed(self, state_type: StateType, name: &str) -> Self {
        Self(format!(
            "{} {}",
            crate::state::error_prefix(state_type, name),
            self.0
        ))
    }
}

/// A directed graph of named states with a start state.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Machine {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    pub start_at: String,
    pub states: IndexMap<String, State>,
}

impl<'de> Deserialize<'de> for Machine {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        crate::parser::deserialize_machine(deserializer)
    }
}

impl Machine {
    /// Parse a machine from its JSON definition.
    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    /// Parse and validate in one step.
    pub fn validate_json(raw: &str) -> Result<(), ValidationError> {
        let machine = Self::from_json(raw).map_err(|e| ValidationError::new(e.to_string()))?;
        machine.validate()
    }

    /// Serialize back to the JSON definition form.
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_default()
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.start_at.is_empty() {
            return Err(ValidationError::new("State Machine requires StartAt"));
        }
        if self.states.is_empty() {
            return Err(ValidationError::new("State Machine must have States"));
        }

        let state_errors: Vec<String> = self
            .states
            .values()
            .filter_map(|state| state.validate().err().map(|e| e.to_string()))
            .collect();
        if !state_errors.is_empty() {
            return Err(ValidationError::new(format!("State Errors {state_errors:?}")));
        }

        if !self.states.contains_key(&self.start_at) {
            return Err(ValidationError::new(format!(
                "StartAt {:?} is not a defined state",
                self.start_at
            )));
        }

        for (name, state) in &self.states {
            for target in state.transition_targets() {
                if !self.states.contains_key(target) {
                    return Err(ValidationError::new(format!(
                        "state {name:?} transitions to undefined state {target:?}"
                    )));
                }
            }
        }

        Ok(())
    }

    /// Task states by name.
    pub fn tasks(&self) -> impl Iterator<Item = (&String, &TaskState)> {
        self.states.iter().filter_map(|(name, state)| match state {
            State::Task(task) => Some((name, task)),
            _ => None,
        })
    }

    /// Bind a handler to the named task state.
    ///
    /// Falls back to `<name>Fn` so callers can address sugar-expanded tasks
    /// by either spelling.
    pub fn set_task_handler(
        &mut self,
        name: &str,
        handler: Arc<dyn TaskHandler>,
    ) -> Result<(), ValidationError> {
        let key = [name.to_string(), format!("{name}Fn")]
            .into_iter()
            .find(|key| matches!(self.states.get(key.as_str()), Some(State::Task(_))));

        let Some(key) = key else {
            return Err(ValidationError::new(format!(
                "Handler Error: Cannot Find Task {name} or {name}Fn"
            )));
        };

        if let Some(State::Task(task)) = self.states.get_mut(&key) {
            task.bind_handler(handler);
        }
        Ok(())
    }

    /// Bind a no-op handler to every task state.
    pub fn set_default_handler(&mut self) {
        for state in self.states.values_mut() {
            if let State::Task(task) = state {
                task.bind_handler(default_handler());
            }
        }
    }

    /// Fill in `Resource` on task states that do not have one.
    pub fn set_resource(&mut self, arn: &str) {
        for state in self.states.values_mut() {
            if let State::Task(task) = state {
                if task.resource.is_none() {
                    task.resource = Some(arn.to_string());
                }
            }
        }
    }

    /// Execute the machine against a JSON-encoded input.
    pub async fn execute_json(&self, input: &str) -> Result<Execution, serde_json::Error> {
        let value: Value = serde_json::from_str(input)?;
        Ok(self.execute(value).await)
    }

    /// Execute the machine. Boxed so nested machines (Map iterators,
    /// Parallel branches) can recurse.
    pub fn execute<'a>(
        &'a self,
        input: Value,
    ) -> Pin<Box<dyn Future<Output = Execution> + Send + 'a>> {
        Box::pin(self.execute_inner(input))
    }

    async fn execute_inner(&self, input: Value) -> Execution {
        let mut execution = Execution::started();

        if let Err(err) = self.validate() {
            execution.failed(Value::Null, StateError::runtime(err.to_string()));
            return execution;
        }

        tracing::info!(start_at = %self.start_at, "executing state machine");

        // Flat loop instead of recursion, bounded to catch runaway graphs.
        // Retrier attempt counters live here, per state name, reset each run.
        let mut attempts: HashMap<String, Vec<u32>> = HashMap::new();
        let mut next = self.start_at.clone();
        let mut current = input;

        for _ in 0..MAX_TRANSITIONS {
            let Some(state) = self.states.get(&next) else {
                execution.failed(
                    Value::Null,
                    StateError::runtime(format!("Unknown State: {next}")),
                );
                return execution;
            };

            let state_type = state.state_type();
            execution.entered(state_type, &next, &current);
            tracing::debug!(state = %next, state_type = %state_type, "entered state");

            let ctx = TaskContext::local(&next);
            let slot = attempts.entry(next.clone()).or_default();
            match state.execute(&ctx, slot, &current).await {
                Ok((output, transition)) => {
                    execution.exited(state_type, &next, &output);
                    match transition {
                        Some(target) => {
                            next = target;
                            current = output;
                        }
                        None => {
                            tracing::info!(state = %next, "execution succeeded");
                            execution.succeeded(output);
                            return execution;
                        }
                    }
                }
                Err(err) => {
                    // Failure states don't exit; their configured payload
                    // becomes the final output.
                    let output = match state {
                        State::Fail(fail) => fail.error_output(),
                        _ => {
                            execution.exited(state_type, &next, &Value::Null);
                            Value::Null
                        }
                    };
                    tracing::warn!(state = %next, error = %err, "execution failed");
                    execution.failed(output, err);
                    return execution;
                }
            }
        }

        execution.failed(Value::Null, StateError::runtime("State Overflow"));
        execution
    }
}

fn default_handler() -> Arc<dyn TaskHandler> {
    handler_fn(|_ctx: TaskContext, _event: Value| async move {
        Ok(serde_json::Map::new())
    })
}

#[cfg(test)]
#[path = "machine_tests.rs"]
mod tests;
