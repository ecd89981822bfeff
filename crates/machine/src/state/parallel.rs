// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Parallel state: runs each branch machine concurrently on a copy of the
//! input and collects branch outputs in input order.

use super::{
    catchers_valid, end_valid, get_input, get_output, merge_result, name_valid, next_state,
    recover, retriers_valid, Catcher, Retrier,
};
use crate::machine::{Machine, ValidationError};
use crate::state::StateType;
use relay_core::{Path, StateError};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ParallelState {
    #[serde(skip)]
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_path: Option<Path>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_path: Option<Path>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result_path: Option<Path>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub branches: Vec<Machine>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub retry: Vec<Retrier>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub catch: Vec<Catcher>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub next: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end: Option<bool>,
}

impl ParallelState {
    pub(crate) async fn execute(
        &self,
        attempts: &mut Vec<u32>,
        input: &Value,
    ) -> Result<(Value, Option<String>), StateError> {
        let result = self.run(input).await;
        recover(&self.name, &self.retry, &self.catch, attempts, input, result)
    }

    async fn run(&self, input: &Value) -> Result<(Value, Option<String>), StateError> {
        let effective = get_input(self.input_path.as_ref(), input)?;

        // Each branch gets its own machine clone, input copy, and history;
        // no interpreter state is shared between branches.
        let mut handles = Vec::with_capacity(self.branches.len());
        for branch in &self.branches {
            let machine = branch.clone();
            let branch_input = effective.clone();
            handles.push(tokio::spawn(async move {
                machine.execute(branch_input).await
            }));
        }

        let mut outputs = Vec::with_capacity(handles.len());
        for handle in handles {
            let execution = handle
                .await
                .map_err(|e| StateError::runtime(format!("branch join failed: {e}")))?;
            if let Some(err) = execution.error {
                return Err(StateError::new(
                    err.kind,
                    format!("branch failed: {}", err.cause),
                ));
            }
            outputs.push(execution.output);
        }

        let merged = merge_result(self.result_path.as_ref(), &effective, Value::Array(outputs))?;
        let output = get_output(self.output_path.as_ref(), merged)?;
        Ok((output, next_state(self.next.as_ref())))
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        let prefixed = |e: ValidationError| e.prefixed(StateType::Parallel, &self.name);
        name_valid(&self.name).map_err(prefixed)?;
        end_valid(self.next.as_ref(), self.end).map_err(prefixed)?;

        if self.branches.is_empty() {
            return Err(prefixed(ValidationError::new("Requires Branches")));
        }
        for branch in &self.branches {
            branch.validate().map_err(prefixed)?;
        }

        retriers_valid(&self.retry).map_err(prefixed)?;
        catchers_valid(&self.catch).map_err(prefixed)
    }
}

#[cfg(test)]
#[path = "parallel_tests.rs"]
mod tests;
