// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Succeed state: terminal identity with input/output paths applied.

use super::{get_input, get_output, name_valid};
use crate::machine::ValidationError;
use crate::state::StateType;
use relay_core::{Path, StateError};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SucceedState {
    #[serde(skip)]
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_path: Option<Path>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_path: Option<Path>,
}

impl SucceedState {
    pub(crate) fn execute(&self, input: &Value) -> Result<(Value, Option<String>), StateError> {
        let effective = get_input(self.input_path.as_ref(), input)?;
        let output = get_output(self.output_path.as_ref(), effective)?;
        Ok((output, None))
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        name_valid(&self.name).map_err(|e| e.prefixed(StateType::Succeed, &self.name))
    }
}
