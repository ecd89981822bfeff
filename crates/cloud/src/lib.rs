// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! relay-cloud: interfaces to the external collaborators of the deployer —
//! object store, lock table, workflow control plane, and function code
//! plane — plus the in-memory implementations that back local execution
//! and the scenario suite.

pub mod arn;
pub mod clients;
pub mod functions;
pub mod locktable;
pub mod store;
pub mod workflow;

pub use clients::{CloudClients, MemoryClients};
pub use functions::{FunctionApi, FunctionError, MemoryFunctions};
pub use locktable::{LockItem, LockTable, MemoryLockTable, TableError};
pub use store::{
    get_sha256, get_struct, put_struct, MemoryObjectStore, ObjectStore, PutOptions, StoreError,
};
pub use workflow::{
    ExecutionHandle, ExecutionStatus, ExecutionSummary, MemoryWorkflows, RemoteEvent,
    StateMachineDetails, WorkflowApi, WorkflowError,
};
