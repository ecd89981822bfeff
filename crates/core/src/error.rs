// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Kind-tagged errors for workflow execution.
//!
//! Retriers and catchers match errors by the *kind name* (`"LockError"`,
//! `"BadReleaseError"`, …), never by message, so the engine error is a
//! `(kind, cause)` pair rather than a conventional error enum.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// The error taxonomy. `Named` carries kinds outside the built-in set
/// (e.g. the `Error` field of a Fail state).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    Unmarshal,
    Panic,
    Task,
    Runtime,
    BadRelease,
    LockExists,
    Lock,
    DeploySfn,
    DeployLambda,
    Notify,
    Alert,
    Log,
    Named(String),
}

impl ErrorKind {
    /// The name used in `ErrorEquals` matching and catcher output.
    pub fn name(&self) -> &str {
        match self {
            ErrorKind::Unmarshal => "UnmarshalError",
            ErrorKind::Panic => "PanicError",
            ErrorKind::Task => "TaskError",
            ErrorKind::Runtime => "RuntimeError",
            ErrorKind::BadRelease => "BadReleaseError",
            ErrorKind::LockExists => "LockExistsError",
            ErrorKind::Lock => "LockError",
            ErrorKind::DeploySfn => "DeploySFNError",
            ErrorKind::DeployLambda => "DeployLambdaError",
            ErrorKind::Notify => "NotifyError",
            ErrorKind::Alert => "AlertError",
            ErrorKind::Log => "LogError",
            ErrorKind::Named(name) => name,
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl From<&str> for ErrorKind {
    fn from(name: &str) -> Self {
        match name {
            "UnmarshalError" => ErrorKind::Unmarshal,
            "PanicError" => ErrorKind::Panic,
            "TaskError" => ErrorKind::Task,
            "RuntimeError" => ErrorKind::Runtime,
            "BadReleaseError" => ErrorKind::BadRelease,
            "LockExistsError" => ErrorKind::LockExists,
            "LockError" => ErrorKind::Lock,
            "DeploySFNError" => ErrorKind::DeploySfn,
            "DeployLambdaError" => ErrorKind::DeployLambda,
            "NotifyError" => ErrorKind::Notify,
            "AlertError" => ErrorKind::Alert,
            "LogError" => ErrorKind::Log,
            other => ErrorKind::Named(other.to_string()),
        }
    }
}

impl Serialize for ErrorKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

impl<'de> Deserialize<'de> for ErrorKind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        Ok(ErrorKind::from(name.as_str()))
    }
}

/// An error surfaced by a state, a task handler, or the interpreter.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{kind}: {cause}")]
pub struct StateError {
    pub kind: ErrorKind,
    pub cause: String,
}

impl StateError {
    pub fn new(kind: ErrorKind, cause: impl Into<String>) -> Self {
        Self { kind, cause: cause.into() }
    }

    pub fn unmarshal(cause: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unmarshal, cause)
    }

    pub fn panic(cause: impl Into<String>) -> Self {
        Self::new(ErrorKind::Panic, cause)
    }

    pub fn task(cause: impl Into<String>) -> Self {
        Self::new(ErrorKind::Task, cause)
    }

    pub fn runtime(cause: impl Into<String>) -> Self {
        Self::new(ErrorKind::Runtime, cause)
    }

    pub fn bad_release(cause: impl Into<String>) -> Self {
        Self::new(ErrorKind::BadRelease, cause)
    }

    pub fn lock_exists(cause: impl Into<String>) -> Self {
        Self::new(ErrorKind::LockExists, cause)
    }

    pub fn lock(cause: impl Into<String>) -> Self {
        Self::new(ErrorKind::Lock, cause)
    }

    pub fn deploy_sfn(cause: impl Into<String>) -> Self {
        Self::new(ErrorKind::DeploySfn, cause)
    }

    pub fn deploy_lambda(cause: impl Into<String>) -> Self {
        Self::new(ErrorKind::DeployLambda, cause)
    }

    /// The name matched against `ErrorEquals` entries.
    pub fn kind_name(&self) -> &str {
        self.kind.name()
    }

    /// Prepend a state-identifying prefix to the cause, keeping the kind.
    pub fn prefix_cause(mut self, prefix: &str) -> Self {
        self.cause = format!("{prefix} {}", self.cause);
        self
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
