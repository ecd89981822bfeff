// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Workflow control-plane interface: update/describe a remote workflow
//! definition and start/inspect its executions.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WorkflowError {
    #[error("workflow error: {0}")]
    Api(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateMachineDetails {
    pub role_arn: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionHandle {
    pub execution_arn: String,
    pub start_date: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionStatus {
    /// `RUNNING`, `SUCCEEDED`, `FAILED`, …
    pub status: String,
    pub output: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteEvent {
    pub event_type: String,
    pub state_name: Option<String>,
    pub output: Option<String>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionSummary {
    pub execution_arn: String,
    pub name: String,
    pub status: String,
    pub start_date: DateTime<Utc>,
}

#[async_trait]
pub trait WorkflowApi: Send + Sync {
    async fn update_state_machine(&self, arn: &str, definition: &str)
        -> Result<(), WorkflowError>;

    async fn describe_state_machine(&self, arn: &str)
        -> Result<StateMachineDetails, WorkflowError>;

    async fn start_execution(
        &self,
        arn: &str,
        name: &str,
        input_json: &str,
    ) -> Result<ExecutionHandle, WorkflowError>;

    async fn describe_execution(
        &self,
        execution_arn: &str,
    ) -> Result<ExecutionStatus, WorkflowError>;

    /// History events, optionally newest-first, capped at `max_results`.
    async fn execution_history(
        &self,
        execution_arn: &str,
        reverse: bool,
        max_results: usize,
    ) -> Result<Vec<RemoteEvent>, WorkflowError>;

    async fn list_executions(
        &self,
        arn: &str,
        status_filter: Option<&str>,
    ) -> Result<Vec<ExecutionSummary>, WorkflowError>;
}

#[derive(Debug, Clone)]
pub struct StartedExecution {
    pub arn: String,
    pub name: String,
    pub input_json: String,
}

#[derive(Default)]
struct MemoryWorkflowsState {
    role_arns: HashMap<String, String>,
    definitions: Vec<(String, String)>,
    update_error: Option<String>,
    started: Vec<StartedExecution>,
    /// Scripted describe_execution responses; the final entry repeats.
    statuses: VecDeque<ExecutionStatus>,
    history: Vec<RemoteEvent>,
    executions: Vec<ExecutionSummary>,
}

/// In-memory workflow control plane with scriptable responses.
#[derive(Clone, Default)]
pub struct MemoryWorkflows {
    inner: Arc<Mutex<MemoryWorkflowsState>>,
}

impl MemoryWorkflows {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_role_arn(&self, arn: &str, role_arn: &str) {
        self.inner.lock().role_arns.insert(arn.to_string(), role_arn.to_string());
    }

    /// Make `update_state_machine` fail.
    pub fn fail_updates(&self, message: &str) {
        self.inner.lock().update_error = Some(message.to_string());
    }

    /// Queue a `describe_execution` response; the last one repeats.
    pub fn push_status(&self, status: &str, output: Option<&str>) {
        self.inner.lock().statuses.push_back(ExecutionStatus {
            status: status.to_string(),
            output: output.map(str::to_string),
        });
    }

    pub fn push_history_event(&self, event: RemoteEvent) {
        self.inner.lock().history.push(event);
    }

    pub fn add_execution(&self, summary: ExecutionSummary) {
        self.inner.lock().executions.push(summary);
    }

    /// Definitions written by `update_state_machine`, in order.
    pub fn updated_definitions(&self) -> Vec<(String, String)> {
        self.inner.lock().definitions.clone()
    }

    pub fn started_executions(&self) -> Vec<StartedExecution> {
        self.inner.lock().started.clone()
    }
}

#[async_trait]
impl WorkflowApi for MemoryWorkflows {
    async fn update_state_machine(
        &self,
        arn: &str,
        definition: &str,
    ) -> Result<(), WorkflowError> {
        let mut state = self.inner.lock();
        if let Some(message) = &state.update_error {
            return Err(WorkflowError::Api(message.clone()));
        }
        state.definitions.push((arn.to_string(), definition.to_string()));
        Ok(())
    }

    async fn describe_state_machine(
        &self,
        arn: &str,
    ) -> Result<StateMachineDetails, WorkflowError> {
        self.inner
            .lock()
            .role_arns
            .get(arn)
            .map(|role_arn| StateMachineDetails { role_arn: role_arn.clone() })
            .ok_or_else(|| WorkflowError::Api(format!("unknown state machine {arn}")))
    }

    async fn start_execution(
        &self,
        arn: &str,
        name: &str,
        input_json: &str,
    ) -> Result<ExecutionHandle, WorkflowError> {
        let mut state = self.inner.lock();
        state.started.push(StartedExecution {
            arn: arn.to_string(),
            name: name.to_string(),
            input_json: input_json.to_string(),
        });
        Ok(ExecutionHandle {
            execution_arn: format!("{arn}:{name}"),
            start_date: Utc::now(),
        })
    }

    async fn describe_execution(
        &self,
        _execution_arn: &str,
    ) -> Result<ExecutionStatus, WorkflowError> {
        let mut state = self.inner.lock();
        if state.statuses.len() > 1 {
            // The final scripted status repeats
            return state
                .statuses
                .pop_front()
                .ok_or_else(|| WorkflowError::Api("no scripted status".to_string()));
        }
        Ok(state.statuses.front().cloned().unwrap_or(ExecutionStatus {
            status: "SUCCEEDED".to_string(),
            output: None,
        }))
    }

    async fn execution_history(
        &self,
        _execution_arn: &str,
        reverse: bool,
        max_results: usize,
    ) -> Result<Vec<RemoteEvent>, WorkflowError> {
        let state = self.inner.lock();
        let mut events = state.history.clone();
        if reverse {
            events.reverse();
        }
        events.truncate(max_results);
        Ok(events)
    }

    async fn list_executions(
        &self,
        _arn: &str,
        status_filter: Option<&str>,
    ) -> Result<Vec<ExecutionSummary>, WorkflowError> {
        let state = self.inner.lock();
        Ok(state
            .executions
            .iter()
            .filter(|e| status_filter.map_or(true, |s| e.status == s))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
#[path = "workflow_tests.rs"]
mod tests;
