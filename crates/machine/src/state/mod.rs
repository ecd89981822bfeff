// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! State variants and the shared execution kernel.
//!
//! Every variant exposes `execute(ctx, input) → (output, next?, err)` and
//! `validate()`. The kernel provides the combinators the variants share:
//! input/output path narrowing, parameter templating, result-path merging,
//! retriers, catchers, and error wrapping.

mod choice;
mod fail;
mod map;
mod parallel;
mod pass;
mod succeed;
mod task;
mod wait;

pub use choice::{Choice, ChoiceRule, ChoiceState};
pub use fail::FailState;
pub use map::MapState;
pub use parallel::ParallelState;
pub use pass::PassState;
pub use succeed::SucceedState;
pub use task::TaskState;
pub use wait::WaitState;

use crate::handler::TaskContext;
use crate::machine::ValidationError;
use relay_core::{Path, StateError};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Retries are capped at three attempts unless the rule says otherwise.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Matches every error kind; only allowed as the sole entry of the final
/// retrier or catcher.
pub const STATES_ALL: &str = "States.ALL";

const KNOWN_STATES_ERRORS: &[&str] = &[
    "States.ALL",
    "States.Timeout",
    "States.TaskFailed",
    "States.Permissions",
    "States.ResultPathMatchFailure",
    "States.BranchFailed",
    "States.NoChoiceMatched",
];

/// The variant tag of a state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StateType {
    Pass,
    Task,
    Choice,
    Wait,
    Succeed,
    Fail,
    Parallel,
    Map,
}

relay_core::simple_display! {
    StateType {
        Pass => "Pass",
        Task => "Task",
        Choice => "Choice",
        Wait => "Wait",
        Succeed => "Succeed",
        Fail => "Fail",
        Parallel => "Parallel",
        Map => "Map",
    }
}

/// Re-executes the same state while a matching error keeps occurring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Retrier {
    pub error_equals: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interval_seconds: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_attempts: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backoff_rate: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

/// Routes a matching error to a follow-up state, recording `{Error, Cause}`
/// at `ResultPath` over the state's original input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Catcher {
    pub error_equals: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result_path: Option<Path>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

/// A state of the machine, dispatched by its `Type` tag.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "Type")]
pub enum State {
    Pass(PassState),
    Task(TaskState),
    Choice(ChoiceState),
    Wait(WaitState),
    Succeed(SucceedState),
    Fail(FailState),
    Parallel(ParallelState),
    Map(MapState),
}

impl State {
    pub fn name(&self) -> &str {
        match self {
            State::Pass(s) => &s.name,
            State::Task(s) => &s.name,
            State::Choice(s) => &s.name,
            State::Wait(s) => &s.name,
            State::Succeed(s) => &s.name,
            State::Fail(s) => &s.name,
            State::Parallel(s) => &s.name,
            State::Map(s) => &s.name,
        }
    }

    pub(crate) fn set_name(&mut self, name: &str) {
        let slot = match self {
            State::Pass(s) => &mut s.name,
            State::Task(s) => &mut s.name,
            State::Choice(s) => &mut s.name,
            State::Wait(s) => &mut s.name,
            State::Succeed(s) => &mut s.name,
            State::Fail(s) => &mut s.name,
            State::Parallel(s) => &mut s.name,
            State::Map(s) => &mut s.name,
        };
        *slot = name.to_string();
    }

    pub fn state_type(&self) -> StateType {
        match self {
            State::Pass(_) => StateType::Pass,
            State::Task(_) => StateType::Task,
            State::Choice(_) => StateType::Choice,
            State::Wait(_) => StateType::Wait,
            State::Succeed(_) => StateType::Succeed,
            State::Fail(_) => StateType::Fail,
            State::Parallel(_) => StateType::Parallel,
            State::Map(_) => StateType::Map,
        }
    }

    /// Every state name this state can transition to.
    pub fn transition_targets(&self) -> Vec<&str> {
        let mut targets = Vec::new();
        let (next, catch) = match self {
            State::Pass(s) => (s.next.as_deref(), None),
            State::Task(s) => (s.next.as_deref(), Some(&s.catch)),
            State::Wait(s) => (s.next.as_deref(), None),
            State::Parallel(s) => (s.next.as_deref(), Some(&s.catch)),
            State::Map(s) => (s.next.as_deref(), Some(&s.catch)),
            State::Succeed(_) | State::Fail(_) => (None, None),
            State::Choice(s) => {
                for choice in &s.choices {
                    if let Some(next) = &choice.next {
                        targets.push(next.as_str());
                    }
                }
                if let Some(default) = &s.default {
                    targets.push(default.as_str());
                }
                (None, None)
            }
        };
        if let Some(next) = next {
            targets.push(next);
        }
        if let Some(catchers) = catch {
            for catcher in catchers {
                if let Some(next) = &catcher.next {
                    targets.push(next.as_str());
                }
            }
        }
        targets
    }

    /// Run the state. Errors carry the `<Type>State(<name>) Error:` prefix.
    pub(crate) async fn execute(
        &self,
        ctx: &TaskContext,
        attempts: &mut Vec<u32>,
        input: &Value,
    ) -> Result<(Value, Option<String>), StateError> {
        let result = match self {
            State::Pass(s) => s.execute(input),
            State::Task(s) => s.execute(ctx, attempts, input).await,
            State::Choice(s) => s.execute(input),
            State::Wait(s) => s.execute(input).await,
            State::Succeed(s) => s.execute(input),
            State::Fail(s) => s.execute(),
            State::Parallel(s) => s.execute(attempts, input).await,
            State::Map(s) => s.execute(attempts, input).await,
        };
        result.map_err(|err| err.prefix_cause(&error_prefix(self.state_type(), self.name())))
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        match self {
            State::Pass(s) => s.validate(),
            State::Task(s) => s.validate(),
            State::Choice(s) => s.validate(),
            State::Wait(s) => s.validate(),
            State::Succeed(s) => s.validate(),
            State::Fail(s) => s.validate(),
            State::Parallel(s) => s.validate(),
            State::Map(s) => s.validate(),
        }
    }
}

//////
// Kernel combinators
//////

pub(crate) fn error_prefix(state_type: StateType, name: &str) -> String {
    if name.is_empty() {
        format!("{state_type}State Error:")
    } else {
        format!("{state_type}State({name}) Error:")
    }
}

/// The `{Error, Cause}` payload written by catchers and Fail states.
pub(crate) fn error_output(error: &str, cause: &str) -> Value {
    json!({ "Error": error, "Cause": cause })
}

pub(crate) fn error_output_from(err: &StateError) -> Value {
    error_output(err.kind_name(), &err.cause)
}

/// Whether an `ErrorEquals` list matches the error's kind name.
/// `States.ALL` matches everything.
pub(crate) fn error_included(error_equals: &[String], err: &StateError) -> bool {
    error_equals
        .iter()
        .any(|entry| entry == STATES_ALL || entry == err.kind_name())
}

pub(crate) fn next_state(next: Option<&String>) -> Option<String> {
    next.cloned()
}

/// Narrow the input through `InputPath` (`$` when absent).
pub(crate) fn get_input(path: Option<&Path>, input: &Value) -> Result<Value, StateError> {
    match path {
        None => Ok(input.clone()),
        Some(p) => p
            .get(input)
            .cloned()
            .map_err(|e| StateError::runtime(format!("Input Error: {e}"))),
    }
}

/// Narrow the output through `OutputPath` (`$` when absent).
pub(crate) fn get_output(path: Option<&Path>, output: Value) -> Result<Value, StateError> {
    match path {
        None => Ok(output),
        Some(p) => p
            .get(&output)
            .cloned()
            .map_err(|e| StateError::runtime(format!("Output Error: {e}"))),
    }
}

/// Merge a state's result into its input at `ResultPath`.
///
/// A null result leaves the input unchanged; an absent path replaces it.
pub(crate) fn merge_result(
    path: Option<&Path>,
    input: &Value,
    result: Value,
) -> Result<Value, StateError> {
    if result.is_null() {
        return Ok(input.clone());
    }
    match path {
        None => Ok(result),
        Some(p) => p
            .set(input.clone(), result)
            .map(Value::Object)
            .map_err(|e| StateError::runtime(e.to_string())),
    }
}

/// Replace `<key>.$` entries in a parameter template with the values their
/// paths resolve to in the input. Recurses through maps only.
pub(crate) fn render_parameters(params: &Value, input: &Value) -> Result<Value, StateError> {
    let Value::Object(map) = params else {
        return Ok(params.clone());
    };

    let mut rendered = serde_json::Map::with_capacity(map.len());
    for (key, value) in map {
        if let Some(plain_key) = key.strip_suffix(".$") {
            let Value::String(path_text) = value else {
                return Err(StateError::runtime(format!(
                    "value for key {plain_key:?} is not a path string"
                )));
            };
            let path = Path::parse(path_text).map_err(|e| StateError::runtime(e.to_string()))?;
            let resolved = path
                .get(input)
                .cloned()
                .map_err(|e| StateError::runtime(format!("parameter {key}: {e}")))?;
            rendered.insert(plain_key.to_string(), resolved);
        } else {
            rendered.insert(key.clone(), render_parameters(value, input)?);
        }
    }
    Ok(Value::Object(rendered))
}

/// Apply retriers then catchers to a failed execution.
///
/// A matching retrier with attempts remaining signals re-execution of the
/// same state by returning the original input with `next = <state name>`.
/// Otherwise the first matching catcher writes `{Error, Cause}` over the
/// original input at its `ResultPath` and forces its `Next`.
pub(crate) fn recover(
    name: &str,
    retry: &[Retrier],
    catch: &[Catcher],
    attempts: &mut Vec<u32>,
    input: &Value,
    result: Result<(Value, Option<String>), StateError>,
) -> Result<(Value, Option<String>), StateError> {
    let err = match result {
        Ok(output) => return Ok(output),
        Err(err) => err,
    };

    if attempts.len() < retry.len() {
        attempts.resize(retry.len(), 0);
    }

    for (index, retrier) in retry.iter().enumerate() {
        if !error_included(&retrier.error_equals, &err) {
            continue;
        }
        let max_attempts = retrier.max_attempts.unwrap_or(DEFAULT_MAX_ATTEMPTS);
        if attempts[index] < max_attempts {
            attempts[index] += 1;
            tracing::debug!(
                state = name,
                attempt = attempts[index],
                error = %err,
                "retrying state"
            );
            return Ok((input.clone(), Some(name.to_string())));
        }
        // First matching retrier decides; exhausted means the error escapes
        break;
    }

    for catcher in catch {
        if error_included(&catcher.error_equals, &err) {
            tracing::debug!(state = name, error = %err, next = ?catcher.next, "caught error");
            let output = merge_result(catcher.result_path.as_ref(), input, error_output_from(&err))?;
            return Ok((output, catcher.next.clone()));
        }
    }

    Err(err)
}

//////
// Shared validity checks
//////

/// Exactly one of `Next` or `End: true`.
pub(crate) fn end_valid(next: Option<&String>, end: Option<bool>) -> Result<(), ValidationError> {
    match (next, end) {
        (None, None) => Err(ValidationError::new("End and Next both undefined")),
        (Some(_), Some(_)) => Err(ValidationError::new("End and Next both defined")),
        (None, Some(false)) => Err(ValidationError::new("End can only be true or nil")),
        _ => Ok(()),
    }
}

pub(crate) fn name_valid(name: &str) -> Result<(), ValidationError> {
    if name.is_empty() {
        return Err(ValidationError::new("Must have Name"));
    }
    Ok(())
}

pub(crate) fn retriers_valid(retry: &[Retrier]) -> Result<(), ValidationError> {
    for (index, retrier) in retry.iter().enumerate() {
        error_equals_valid(&retrier.error_equals, index == retry.len() - 1)?;
    }
    Ok(())
}

pub(crate) fn catchers_valid(catch: &[Catcher]) -> Result<(), ValidationError> {
    for (index, catcher) in catch.iter().enumerate() {
        error_equals_valid(&catcher.error_equals, index == catch.len() - 1)?;
        if catcher.next.as_deref().unwrap_or_default().is_empty() {
            return Err(ValidationError::new("Catcher requires Next"));
        }
    }
    Ok(())
}

fn error_equals_valid(error_equals: &[String], last: bool) -> Result<(), ValidationError> {
    if error_equals.is_empty() {
        return Err(ValidationError::new("requires nonempty ErrorEquals"));
    }

    for entry in error_equals {
        if entry.starts_with("States.") && !KNOWN_STATES_ERRORS.contains(&entry.as_str()) {
            return Err(ValidationError::new(format!(
                "Unknown States.* error found {entry:?}"
            )));
        }

        if entry == STATES_ALL {
            if error_equals.len() != 1 {
                return Err(ValidationError::new(
                    r#""States.ALL" ErrorEquals must be only element in list"#,
                ));
            }
            if !last {
                return Err(ValidationError::new(
                    r#""States.ALL" must be last Catcher/Retrier"#,
                ));
            }
        }
    }

    Ok(())
}

#[cfg(test)]
#[path = "kernel_tests.rs"]
mod tests;
