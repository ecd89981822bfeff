// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `relay dot`: render a machine definition as a GraphViz digraph.

use crate::exit_error::ExitError;
use clap::Args;
use relay_machine::{Machine, State};
use std::fmt::Write;

#[derive(Args)]
pub struct DotArgs {
    /// Machine definition JSON, or a path to a file containing it
    #[arg(long)]
    pub states: String,
}

pub fn run(args: DotArgs) -> Result<(), ExitError> {
    let raw = if std::path::Path::new(&args.states).is_file() {
        std::fs::read_to_string(&args.states).map_err(ExitError::failure)?
    } else {
        args.states
    };

    let machine = Machine::from_json(&raw).map_err(ExitError::failure)?;
    println!("{}", to_dot(&machine));
    Ok(())
}

/// Render the state graph: a start/end pair, one node per state, catch and
/// retry edges in red, and choice rules as edge labels.
pub fn to_dot(machine: &Machine) -> String {
    format!(
        r##"digraph StateMachine {{
  node      [ style="rounded,filled,bold", shape=box, fixedsize=true, width=2, fontname="Arial" ];
  edge      [ style=bold, fontname="Arial" ]
  _Start    [ fillcolor=black, shape=circle, label="", width=0.25 ];
  _End      [ fillcolor=black, shape=doublecircle, label="", width=0.3 ];

  _Start -> {:?} [weight=1000]

  # States
  {}
}}"##,
        machine.start_at,
        render_states(machine)
    )
}

fn render_states(machine: &Machine) -> String {
    let mut out = String::new();
    for (name, state) in &machine.states {
        render_state(&mut out, name, state);
    }
    out
}

fn render_state(out: &mut String, name: &str, state: &State) {
    match state {
        State::Pass(pass) => {
            line(out, format!("{name:?} [fillcolor=\"#b0b0b0\"]"));
            transition_edges(out, name, pass.next.as_deref(), pass.end);
        }

        State::Task(task) => {
            line(out, format!("{name:?} [fillcolor=\"#b0b0b0\"]"));
            if !task.retry.is_empty() {
                line(out, format!("{name:?} -> {name:?} [color=\"#FFa0a0\"]"));
            }
            for catcher in &task.catch {
                let Some(next) = catcher.next.as_deref() else { continue };
                let label = catch_label(&catcher.error_equals);
                line(
                    out,
                    format!("{name:?} -> {next:?} [color=\"#FFa0a0\", label={label:?}]"),
                );
            }
            transition_edges(out, name, task.next.as_deref(), task.end);
        }

        State::Choice(choice) => {
            line(out, format!("{name:?} [shape=diamond, fillcolor=\"#b0b0b0\"]"));
            if let Some(default) = &choice.default {
                line(
                    out,
                    format!("{name:?} -> {default:?} [label=\"default\", weight=10]"),
                );
            }
            for branch in &choice.choices {
                let Some(next) = branch.next.as_deref() else { continue };
                let label = branch.rule.to_string();
                line(out, format!("{name:?} -> {next:?} [label={label:?}, weight=100]"));
            }
        }

        State::Wait(wait) => {
            line(out, format!("{name:?} [shape=box, fillcolor=\"#b0e0ff\"]"));
            transition_edges(out, name, wait.next.as_deref(), wait.end);
        }

        State::Succeed(_) => {
            line(out, format!("{name:?} [fillcolor=\"#a0ffa0\"]"));
            line(out, format!("{name:?} -> _End"));
        }

        State::Fail(_) => {
            line(out, format!("{name:?} [fillcolor=\"#ffa0a0\"]"));
            line(out, format!("{name:?} -> _End"));
        }

        State::Parallel(parallel) => {
            line(out, format!("{name:?} [shape=box3d, fillcolor=\"#b0b0b0\"]"));
            transition_edges(out, name, parallel.next.as_deref(), parallel.end);
        }

        State::Map(map) => {
            line(out, format!("{name:?} [shape=box3d, fillcolor=\"#b0b0b0\"]"));
            transition_edges(out, name, map.next.as_deref(), map.end);
        }
    }
}

fn transition_edges(out: &mut String, name: &str, next: Option<&str>, end: Option<bool>) {
    if let Some(next) = next {
        line(out, format!("{name:?} -> {next:?} [weight=100]"));
    }
    if end == Some(true) {
        line(out, format!("{name:?} -> _End"));
    }
}

fn catch_label(error_equals: &[String]) -> String {
    if error_equals.len() == 1 && error_equals[0] == "States.ALL" {
        return String::new();
    }
    error_equals.join(",")
}

fn line(out: &mut String, content: String) {
    // Writing to a String cannot fail
    let _ = writeln!(out, "  {content}");
}

#[cfg(test)]
#[path = "dot_tests.rs"]
mod tests;
