// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Function code-plane interface: push code artifacts and read tags.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FunctionError {
    #[error("function error: {0}")]
    Api(String),
}

#[async_trait]
pub trait FunctionApi: Send + Sync {
    async fn update_function_code(&self, arn: &str, zip: &[u8]) -> Result<(), FunctionError>;
    async fn list_tags(&self, arn: &str) -> Result<HashMap<String, String>, FunctionError>;
}

#[derive(Default)]
struct MemoryFunctionsState {
    tags: HashMap<String, String>,
    update_error: Option<String>,
    updates: Vec<(String, usize)>,
}

/// In-memory function plane.
#[derive(Clone, Default)]
pub struct MemoryFunctions {
    inner: Arc<Mutex<MemoryFunctionsState>>,
}

impl MemoryFunctions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_tag(&self, key: &str, value: &str) {
        self.inner.lock().tags.insert(key.to_string(), value.to_string());
    }

    /// Make `update_function_code` fail.
    pub fn fail_updates(&self, message: &str) {
        self.inner.lock().update_error = Some(message.to_string());
    }

    /// `(arn, zip length)` pairs recorded per update, in order.
    pub fn updates(&self) -> Vec<(String, usize)> {
        self.inner.lock().updates.clone()
    }
}

#[async_trait]
impl FunctionApi for MemoryFunctions {
    async fn update_function_code(&self, arn: &str, zip: &[u8]) -> Result<(), FunctionError> {
        let mut state = self.inner.lock();
        if let Some(message) = &state.update_error {
            return Err(FunctionError::Api(message.clone()));
        }
        state.updates.push((arn.to_string(), zip.len()));
        Ok(())
    }

    async fn list_tags(&self, _arn: &str) -> Result<HashMap<String, String>, FunctionError> {
        Ok(self.inner.lock().tags.clone())
    }
}

#[cfg(test)]
#[path = "functions_tests.rs"]
mod tests;
