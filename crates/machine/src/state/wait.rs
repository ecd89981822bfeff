// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wait state.
//!
//! The engine is a local simulation, so waits validate their configuration
//! and then sleep a small fixed delay rather than honoring wall-clock time.

use super::{end_valid, get_input, get_output, name_valid, next_state};
use crate::machine::ValidationError;
use crate::state::StateType;
use chrono::{DateTime, Utc};
use relay_core::{Path, StateError};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

const SIMULATED_WAIT: Duration = Duration::from_millis(50);

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct WaitState {
    #[serde(skip)]
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_path: Option<Path>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_path: Option<Path>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub seconds: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seconds_path: Option<Path>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp_path: Option<Path>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub next: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end: Option<bool>,
}

impl WaitState {
    pub(crate) async fn execute(&self, input: &Value) -> Result<(Value, Option<String>), StateError> {
        let effective = get_input(self.input_path.as_ref(), input)?;

        // Path variants must resolve to the right kind before sleeping
        if let Some(path) = &self.seconds_path {
            path.get_number(&effective)
                .map_err(|e| StateError::runtime(e.to_string()))?;
        } else if let Some(path) = &self.timestamp_path {
            path.get_time(&effective)
                .map_err(|e| StateError::runtime(e.to_string()))?;
        }

        tokio::time::sleep(SIMULATED_WAIT).await;

        let output = get_output(self.output_path.as_ref(), effective)?;
        Ok((output, next_state(self.next.as_ref())))
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        let prefixed = |e: ValidationError| e.prefixed(StateType::Wait, &self.name);
        name_valid(&self.name).map_err(prefixed)?;
        end_valid(self.next.as_ref(), self.end).map_err(prefixed)?;

        let configured = [
            self.seconds.is_some(),
            self.seconds_path.is_some(),
            self.timestamp.is_some(),
            self.timestamp_path.is_some(),
        ];
        if configured.iter().filter(|set| **set).count() != 1 {
            return Err(prefixed(ValidationError::new(
                "Exactly One (Seconds,SecondsPath,Timestamp,TimestampPath)",
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
#[path = "wait_tests.rs"]
mod tests;
