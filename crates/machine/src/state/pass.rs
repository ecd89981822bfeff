// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Pass state: emits a configured constant result, or forwards its input.

use super::{end_valid, get_input, get_output, merge_result, name_valid, next_state};
use crate::machine::ValidationError;
use crate::state::StateType;
use relay_core::{Path, StateError};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PassState {
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
    pub result: Option<Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub next: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end: Option<bool>,
}

impl PassState {
    pub(crate) fn execute(&self, input: &Value) -> Result<(Value, Option<String>), StateError> {
        let effective = get_input(self.input_path.as_ref(), input)?;
        let result = self.result.clone().unwrap_or(Value::Null);
        let merged = merge_result(self.result_path.as_ref(), &effective, result)?;
        let output = get_output(self.output_path.as_ref(), merged)?;
        Ok((output, next_state(self.next.as_ref())))
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        name_valid(&self.name).map_err(|e| e.prefixed(StateType::Pass, &self.name))?;
        end_valid(self.next.as_ref(), self.end).map_err(|e| e.prefixed(StateType::Pass, &self.name))
    }
}

#[cfg(test)]
#[path = "pass_tests.rs"]
mod tests;
