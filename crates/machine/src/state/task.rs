// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Task state: invokes a bound task handler.

use super::{
    catchers_valid, end_valid, get_input, get_output, merge_result, name_valid, next_state,
    recover, render_parameters, retriers_valid, Catcher, Retrier,
};
use crate::handler::{call_contained, BoundHandler, TaskContext, TaskHandler};
use crate::machine::ValidationError;
use crate::state::StateType;
use relay_core::{Path, StateError};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TaskState {
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

    /// Remote function identifier; informational for local execution.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameters: Option<Value>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub retry: Vec<Retrier>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub catch: Vec<Catcher>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub next: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end: Option<bool>,

    /// Handler invoked when executing locally.
    #[serde(skip)]
    pub handler: Option<BoundHandler>,
}

impl TaskState {
    pub fn bind_handler(&mut self, handler: Arc<dyn TaskHandler>) {
        self.handler = Some(BoundHandler(handler));
    }

    pub(crate) async fn execute(
        &self,
        ctx: &TaskContext,
        attempts: &mut Vec<u32>,
        input: &Value,
    ) -> Result<(Value, Option<String>), StateError> {
        let result = self.run(ctx, input).await;
        recover(&self.name, &self.retry, &self.catch, attempts, input, result)
    }

    async fn run(
        &self,
        ctx: &TaskContext,
        input: &Value,
    ) -> Result<(Value, Option<String>), StateError> {
        let effective = get_input(self.input_path.as_ref(), input)?;
        let effective = match &self.parameters {
            Some(params) => render_parameters(params, &effective)?,
            None => effective,
        };

        let handler = self
            .handler
            .clone()
            .ok_or_else(|| StateError::task(format!("Cannot Find Task {}", self.name)))?;

        tracing::info!(task = %self.name, "invoking task handler");
        let result = call_contained(handler.0, ctx.clone(), effective.clone()).await?;

        let merged = merge_result(self.result_path.as_ref(), &effective, result)?;
        let output = get_output(self.output_path.as_ref(), merged)?;
        Ok((output, next_state(self.next.as_ref())))
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        let prefixed = |e: ValidationError| e.prefixed(StateType::Task, &self.name);
        name_valid(&self.name).map_err(prefixed)?;
        end_valid(self.next.as_ref(), self.end).map_err(prefixed)?;

        if self.handler.is_none() && self.resource.is_none() {
            return Err(prefixed(ValidationError::new("Requires Resource")));
        }

        retriers_valid(&self.retry).map_err(prefixed)?;
        catchers_valid(&self.catch).map_err(prefixed)
    }
}

#[cfg(test)]
#[path = "task_tests.rs"]
mod tests;
