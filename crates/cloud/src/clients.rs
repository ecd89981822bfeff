// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Client bundle handed to deployer handlers and the thin client.

use crate::functions::{FunctionApi, MemoryFunctions};
use crate::locktable::{LockTable, MemoryLockTable};
use crate::store::{MemoryObjectStore, ObjectStore};
use crate::workflow::{MemoryWorkflows, WorkflowApi};
use std::sync::Arc;

/// One of each external collaborator.
#[derive(Clone)]
pub struct CloudClients {
    pub store: Arc<dyn ObjectStore>,
    pub lock_table: Arc<dyn LockTable>,
    pub workflows: Arc<dyn WorkflowApi>,
    pub functions: Arc<dyn FunctionApi>,
}

impl CloudClients {
    pub fn new(
        store: Arc<dyn ObjectStore>,
        lock_table: Arc<dyn LockTable>,
        workflows: Arc<dyn WorkflowApi>,
        functions: Arc<dyn FunctionApi>,
    ) -> Self {
        Self { store, lock_table, workflows, functions }
    }

    /// A fully in-memory bundle for local execution.
    pub fn in_memory() -> Self {
        MemoryClients::new().clients()
    }
}

/// The concrete in-memory backends, kept around so callers can seed
/// fixtures and assert on recorded calls.
#[derive(Clone, Default)]
pub struct MemoryClients {
    pub store: MemoryObjectStore,
    pub lock_table: MemoryLockTable,
    pub workflows: MemoryWorkflows,
    pub functions: MemoryFunctions,
}

impl MemoryClients {
    pub fn new() -> Self {
        Self::default()
    }

    /// Trait-object view over the same shared state.
    pub fn clients(&self) -> CloudClients {
        CloudClients {
            store: Arc::new(self.store.clone()),
            lock_table: Arc::new(self.lock_table.clone()),
            workflows: Arc::new(self.workflows.clone()),
            functions: Arc::new(self.functions.clone()),
        }
    }
}
