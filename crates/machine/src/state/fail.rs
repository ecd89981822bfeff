// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fail state: terminal, surfaces its configured `{Error, Cause}` payload.

use super::{error_output, name_valid};
use crate::machine::ValidationError;
use crate::state::StateType;
use relay_core::{ErrorKind, StateError};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct FailState {
    #[serde(skip)]
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cause: Option<String>,
}

impl FailState {
    /// Fail states never produce a next state; they raise a sentinel error
    /// tagged with the configured `Error` kind.
    pub(crate) fn execute(&self) -> Result<(Value, Option<String>), StateError> {
        let kind = ErrorKind::from(self.error.as_deref().unwrap_or_default());
        let cause = self.cause.clone().unwrap_or_else(|| "Fail".to_string());
        Err(StateError::new(kind, cause))
    }

    /// The `{Error, Cause}` value this state leaves as execution output.
    pub fn error_output(&self) -> Value {
        error_output(
            self.error.as_deref().unwrap_or_default(),
            self.cause.as_deref().unwrap_or_default(),
        )
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        name_valid(&self.name).map_err(|e| e.prefixed(StateType::Fail, &self.name))?;
        if self.error.as_deref().unwrap_or_default().is_empty() {
            return Err(ValidationError::new("must contain Error").prefixed(StateType::Fail, &self.name));
        }
        Ok(())
    }
}
