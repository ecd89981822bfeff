// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Map state: runs the iterator machine over each item of a sequence,
//! collecting outputs in item order.

use super::{
    catchers_valid, end_valid, get_input, get_output, merge_result, name_valid, next_state,
    recover, render_parameters, retriers_valid, Catcher, Retrier,
};
use crate::machine::{Machine, ValidationError};
use crate::state::StateType;
use relay_core::{Path, StateError};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MapState {
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

    #[serde(skip_serializing_if = "Option::is_none")]
    pub iterator: Option<Machine>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items_path: Option<Path>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameters: Option<Value>,

    /// Advisory; items run sequentially.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_concurrency: Option<f64>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub retry: Vec<Retrier>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub catch: Vec<Catcher>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub next: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end: Option<bool>,
}

impl MapState {
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
        let effective = match &self.parameters {
            Some(params) => render_parameters(params, &effective)?,
            None => effective,
        };

        let iterator = self
            .iterator
            .as_ref()
            .ok_or_else(|| StateError::runtime("Requires Iterator"))?;

        let items: Vec<Value> = match &self.items_path {
            Some(path) => path
                .get_slice(&effective)
                .map_err(|e| StateError::runtime(e.to_string()))?
                .clone(),
            None => effective
                .as_array()
                .cloned()
                .ok_or_else(|| StateError::runtime("Map input must be a sequence"))?,
        };

        let mut outputs = Vec::with_capacity(items.len());
        for item in items {
            let execution = iterator.execute(item).await;
            if let Some(err) = execution.error {
                return Err(StateError::new(
                    err.kind,
                    format!("iteration failed: {}", err.cause),
                ));
            }
            outputs.push(execution.output);
        }

        let merged = merge_result(self.result_path.as_ref(), &effective, Value::Array(outputs))?;
        let output = get_output(self.output_path.as_ref(), merged)?;
        Ok((output, next_state(self.next.as_ref())))
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        let prefixed = |e: ValidationError| e.prefixed(StateType::Map, &self.name);
        name_valid(&self.name).map_err(prefixed)?;
        end_valid(self.next.as_ref(), self.end).map_err(prefixed)?;

        let Some(iterator) = &self.iterator else {
            return Err(prefixed(ValidationError::new("Requires Iterator")));
        };
        iterator.validate().map_err(prefixed)?;

        retriers_valid(&self.retry).map_err(prefixed)?;
        catchers_valid(&self.catch).map_err(prefixed)
    }
}

#[cfg(test)]
#[path = "map_tests.rs"]
mod tests;
