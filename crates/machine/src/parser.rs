// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! State machine parsing.
//!
//! States are dispatched on their `"Type"` tag. The `TaskFn` sugar expands
//! here into a `Task` whose `Parameters` inject the task name and wrap the
//! incoming payload: `{"Task": <name>, "Input.$": "$"}`.

use crate::machine::Machine;
use crate::state::State;
use indexmap::IndexMap;
use serde::{Deserialize, Deserializer};
use serde_json::{json, Value};

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawMachine {
    #[serde(default)]
    comment: Option<String>,
    start_at: String,
    states: IndexMap<String, Value>,
}

pub(crate) fn deserialize_machine<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Machine, D::Error> {
    let raw = RawMachine::deserialize(deserializer)?;

    let mut states = IndexMap::with_capacity(raw.states.len());
    for (name, value) in raw.states {
        let state = parse_state(&name, value).map_err(serde::de::Error::custom)?;
        states.insert(name, state);
    }

    Ok(Machine {
        comment: raw.comment,
        start_at: raw.start_at,
        states,
    })
}

fn parse_state(name: &str, mut value: Value) -> Result<State, String> {
    let type_tag = value
        .get("Type")
        .and_then(Value::as_str)
        .ok_or_else(|| format!("state {name:?} missing Type"))?
        .to_string();

    if type_tag == "TaskFn" {
        let Some(object) = value.as_object_mut() else {
            return Err(format!("state {name:?} is not an object"));
        };
        object.insert("Type".to_string(), json!("Task"));
        object.insert(
            "Parameters".to_string(),
            json!({ "Task": name, "Input.$": "$" }),
        );
    }

    let mut state: State =
        serde_json::from_value(value).map_err(|e| format!("state {name:?}: {e}"))?;
    state.set_name(name);
    Ok(state)
}

#[cfg(test)]
#[path = "parser_tests.rs"]
mod tests;
