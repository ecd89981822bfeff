// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! relay-machine: the workflow state-machine interpreter.
//!
//! Parses declarative JSON state graphs (Amazon States Language dialect),
//! validates them, and executes them against application-supplied task
//! handlers, producing a typed output plus a structured execution history.

pub mod execution;
pub mod handler;
pub mod machine;
pub mod parser;
pub mod state;

pub use execution::{Execution, HistoryEvent};
pub use handler::{handler_fn, BoundHandler, TaskContext, TaskHandler, TaskHandlers};
pub use machine::{Machine, ValidationError, MAX_TRANSITIONS};
pub use state::{Catcher, Retrier, State, StateType};

/// A small valid state machine, useful as a fixture and default definition.
pub const EMPTY_STATE_MACHINE: &str = r#"{
  "StartAt": "WIN",
  "States": { "WIN": {"Type": "Succeed"}}
}"#;
