// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Lock table interface: conditional put/delete over `{key, id, time}` rows.
//!
//! The conditional predicate is `attribute_not_exists(key) OR id = <id>`;
//! a rejected condition is the distinguishable [`TableError::ConditionFailed`]
//! so lockers can map it to "not grabbed" / "lock was stolen" without
//! treating it as a backend failure.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TableError {
    #[error("conditional check failed")]
    ConditionFailed,
    #[error("lock table error: {0}")]
    Other(String),
}

/// One lock row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockItem {
    pub key: String,
    pub id: String,
    pub time: String,
}

#[async_trait]
pub trait LockTable: Send + Sync {
    /// Insert guarded by `attribute_not_exists(key) OR id = item.id`.
    async fn put_conditional(&self, table: &str, item: LockItem) -> Result<(), TableError>;

    /// Delete guarded by `attribute_not_exists(key) OR id = id`.
    async fn delete_conditional(&self, table: &str, key: &str, id: &str) -> Result<(), TableError>;
}

#[derive(Default)]
struct MemoryLockTableState {
    rows: HashMap<(String, String), LockItem>,
    put_failure: Option<String>,
    delete_failure: Option<String>,
    puts: Vec<(String, String, String)>,
    deletes: Vec<(String, String, String)>,
}

/// In-memory lock table.
#[derive(Clone, Default)]
pub struct MemoryLockTable {
    inner: Arc<Mutex<MemoryLockTableState>>,
}

impl MemoryLockTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populate a row, e.g. a competing lock.
    pub fn seed(&self, table: &str, key: &str, id: &str) {
        self.inner.lock().rows.insert(
            (table.to_string(), key.to_string()),
            LockItem { key: key.to_string(), id: id.to_string(), time: String::new() },
        );
    }

    /// Make every put fail with a backend error.
    pub fn fail_puts(&self, message: &str) {
        self.inner.lock().put_failure = Some(message.to_string());
    }

    /// Make every delete fail with a backend error.
    pub fn fail_deletes(&self, message: &str) {
        self.inner.lock().delete_failure = Some(message.to_string());
    }

    /// Successful inserts as `(table, key, id)`, in order.
    pub fn puts(&self) -> Vec<(String, String, String)> {
        self.inner.lock().puts.clone()
    }

    /// Successful removals as `(table, key, id)`, in order.
    pub fn deletes(&self) -> Vec<(String, String, String)> {
        self.inner.lock().deletes.clone()
    }

    pub fn row(&self, table: &str, key: &str) -> Option<LockItem> {
        self.inner.lock().rows.get(&(table.to_string(), key.to_string())).cloned()
    }

    pub fn row_count(&self, table: &str) -> usize {
        self.inner.lock().rows.keys().filter(|(t, _)| t == table).count()
    }
}

#[async_trait]
impl LockTable for MemoryLockTable {
    async fn put_conditional(&self, table: &str, item: LockItem) -> Result<(), TableError> {
        let mut state = self.inner.lock();
        if let Some(message) = &state.put_failure {
            return Err(TableError::Other(message.clone()));
        }

        let slot = (table.to_string(), item.key.clone());
        if let Some(existing) = state.rows.get(&slot) {
            if existing.id != item.id {
                return Err(TableError::ConditionFailed);
            }
        }
        state.puts.push((table.to_string(), item.key.clone(), item.id.clone()));
        state.rows.insert(slot, item);
        Ok(())
    }

    async fn delete_conditional(&self, table: &str, key: &str, id: &str) -> Result<(), TableError> {
        let mut state = self.inner.lock();
        if let Some(message) = &state.delete_failure {
            return Err(TableError::Other(message.clone()));
        }

        let slot = (table.to_string(), key.to_string());
        if let Some(existing) = state.rows.get(&slot) {
            if existing.id != id {
                return Err(TableError::ConditionFailed);
            }
            state.deletes.push((table.to_string(), key.to_string(), id.to_string()));
            state.rows.remove(&slot);
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "locktable_tests.rs"]
mod tests;
