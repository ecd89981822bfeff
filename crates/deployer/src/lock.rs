// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Distributed lock protocol.
//!
//! `grab_lock` is idempotent for the same uuid: holding your own lock is
//! success, a competing uuid is `(false, no error)`, and only backend
//! failures error. `release_lock` succeeds when no record exists or the
//! record carries the caller's uuid.

use async_trait::async_trait;
use parking_lot::Mutex;
use relay_cloud::{LockItem, LockTable, TableError};
use relay_core::{Clock, SystemClock};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LockerError {
    #[error("Lock was stolen for release with UUID({uuid})")]
    Stolen { uuid: String },
    #[error("{0}")]
    Backend(String),
}

#[async_trait]
pub trait Locker: Send + Sync {
    /// Returns whether the lock is now held by `uuid`.
    async fn grab_lock(
        &self,
        namespace: &str,
        lock_path: &str,
        uuid: &str,
        reason: &str,
    ) -> Result<bool, LockerError>;

    async fn release_lock(
        &self,
        namespace: &str,
        lock_path: &str,
        uuid: &str,
    ) -> Result<(), LockerError>;
}

/// One held lock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockRecord {
    pub lock_path: String,
    pub uuid: String,
    pub reason: String,
}

/// Mutex-protected in-process locker.
#[derive(Clone, Default)]
pub struct MemoryLocker {
    locks: Arc<Mutex<HashMap<String, Vec<LockRecord>>>>,
}

impl MemoryLocker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn locks_in(&self, namespace: &str) -> Vec<LockRecord> {
        self.locks.lock().get(namespace).cloned().unwrap_or_default()
    }

    pub fn find(&self, namespace: &str, lock_path: &str) -> Option<LockRecord> {
        self.locks_in(namespace).into_iter().find(|lock| lock.lock_path == lock_path)
    }
}

#[async_trait]
impl Locker for MemoryLocker {
    async fn grab_lock(
        &self,
        namespace: &str,
        lock_path: &str,
        uuid: &str,
        reason: &str,
    ) -> Result<bool, LockerError> {
        let mut locks = self.locks.lock();
        let records = locks.entry(namespace.to_string()).or_default();

        if let Some(existing) = records.iter().find(|lock| lock.lock_path == lock_path) {
            return Ok(existing.uuid == uuid);
        }

        records.push(LockRecord {
            lock_path: lock_path.to_string(),
            uuid: uuid.to_string(),
            reason: reason.to_string(),
        });
        Ok(true)
    }

    async fn release_lock(
        &self,
        namespace: &str,
        lock_path: &str,
        uuid: &str,
    ) -> Result<(), LockerError> {
        let mut locks = self.locks.lock();
        let records = locks.entry(namespace.to_string()).or_default();

        if let Some(existing) = records.iter().find(|lock| lock.lock_path == lock_path) {
            if existing.uuid != uuid {
                return Err(LockerError::Stolen { uuid: uuid.to_string() });
            }
        }

        records.retain(|lock| lock.uuid != uuid);
        Ok(())
    }
}

/// Locker over a remote lock table. The whole protocol is one conditional
/// write (`attribute_not_exists(key) OR id = uuid`) and one conditional
/// delete, so concurrency control is delegated to the backend.
#[derive(Clone)]
pub struct TableLocker<C: Clock = SystemClock> {
    table: Arc<dyn LockTable>,
    clock: C,
}

impl TableLocker {
    pub fn new(table: Arc<dyn LockTable>) -> Self {
        Self { table, clock: SystemClock }
    }
}

impl<C: Clock> TableLocker<C> {
    pub fn with_clock(table: Arc<dyn LockTable>, clock: C) -> Self {
        Self { table, clock }
    }
}

#[async_trait]
impl<C: Clock + 'static> Locker for TableLocker<C> {
    async fn grab_lock(
        &self,
        namespace: &str,
        lock_path: &str,
        uuid: &str,
        _reason: &str,
    ) -> Result<bool, LockerError> {
        let item = LockItem {
            key: lock_path.to_string(),
            id: uuid.to_string(),
            time: self.clock.now_utc().to_rfc3339(),
        };

        match self.table.put_conditional(namespace, item).await {
            Ok(()) => Ok(true),
            // A lock already exists for the same key under another uuid
            Err(TableError::ConditionFailed) => Ok(false),
            Err(err) => Err(LockerError::Backend(err.to_string())),
        }
    }

    async fn release_lock(
        &self,
        namespace: &str,
        lock_path: &str,
        uuid: &str,
    ) -> Result<(), LockerError> {
        match self.table.delete_conditional(namespace, lock_path, uuid).await {
            Ok(()) => Ok(()),
            Err(TableError::ConditionFailed) => {
                Err(LockerError::Stolen { uuid: uuid.to_string() })
            }
            Err(err) => Err(LockerError::Backend(err.to_string())),
        }
    }
}

/// Locker over plain object storage: the lock is a small JSON file whose
/// body names the holding uuid. Weaker than the conditional-write table
/// (reads and writes race), but needs nothing beyond a bucket.
#[derive(Clone)]
pub struct StoreLocker {
    store: Arc<dyn relay_cloud::ObjectStore>,
}

#[derive(Debug, Default, serde::Serialize, serde::Deserialize)]
struct LockFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    uuid: Option<String>,
}

/// A human-held lock file: `{user, lock_reason}`.
#[derive(Debug, Default, serde::Serialize, serde::Deserialize)]
pub struct UserLockFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lock_reason: Option<String>,
}

impl StoreLocker {
    pub fn new(store: Arc<dyn relay_cloud::ObjectStore>) -> Self {
        Self { store }
    }

    async fn read_lock(&self, bucket: &str, path: &str) -> Result<LockFile, LockerError> {
        match relay_cloud::get_struct::<LockFile>(self.store.as_ref(), bucket, path).await {
            Ok(lock) => Ok(lock),
            Err(err) if err.is_not_found() => Ok(LockFile::default()),
            Err(err) => Err(LockerError::Backend(err.to_string())),
        }
    }

    /// Take a human lock so automated deploys are refused until released.
    pub async fn grab_user_lock(
        &self,
        bucket: &str,
        path: &str,
        user: &str,
        reason: &str,
    ) -> Result<bool, LockerError> {
        match relay_cloud::get_struct::<UserLockFile>(self.store.as_ref(), bucket, path).await {
            Ok(existing) if existing.user.is_some() => return Ok(false),
            Ok(_) => {}
            Err(err) if err.is_not_found() => {}
            Err(err) => return Err(LockerError::Backend(err.to_string())),
        }

        let lock = UserLockFile {
            user: Some(user.to_string()),
            lock_reason: Some(reason.to_string()),
        };
        relay_cloud::put_struct(self.store.as_ref(), bucket, path, &lock)
            .await
            .map_err(|e| LockerError::Backend(e.to_string()))?;
        Ok(true)
    }

    pub async fn release_user_lock(&self, bucket: &str, path: &str) -> Result<(), LockerError> {
        self.store
            .delete(bucket, path)
            .await
            .map_err(|e| LockerError::Backend(e.to_string()))
    }
}

/// Errors when a human has locked deploys at `path`, naming them and why.
pub async fn check_user_lock(
    store: &dyn relay_cloud::ObjectStore,
    bucket: &str,
    path: &str,
) -> Result<(), LockerError> {
    match relay_cloud::get_struct::<UserLockFile>(store, bucket, path).await {
        Err(err) if err.is_not_found() => Ok(()),
        Err(err) => Err(LockerError::Backend(err.to_string())),
        Ok(lock) => Err(LockerError::Backend(format!(
            "Deploys locked by {} for reason: {}",
            lock.user.as_deref().unwrap_or("unknown"),
            lock.lock_reason.as_deref().unwrap_or("unknown"),
        ))),
    }
}

#[async_trait]
impl Locker for StoreLocker {
    async fn grab_lock(
        &self,
        namespace: &str,
        lock_path: &str,
        uuid: &str,
        _reason: &str,
    ) -> Result<bool, LockerError> {
        let existing = self.read_lock(namespace, lock_path).await?;
        if let Some(existing_uuid) = existing.uuid {
            // Holding our own lock is fine (caused by a retry, maybe)
            return Ok(existing_uuid == uuid);
        }

        let lock = LockFile { uuid: Some(uuid.to_string()) };
        relay_cloud::put_struct(self.store.as_ref(), namespace, lock_path, &lock)
            .await
            .map_err(|e| LockerError::Backend(e.to_string()))?;
        Ok(true)
    }

    async fn release_lock(
        &self,
        namespace: &str,
        lock_path: &str,
        uuid: &str,
    ) -> Result<(), LockerError> {
        let existing = self.read_lock(namespace, lock_path).await?;
        match existing.uuid {
            None => Ok(()),
            Some(existing_uuid) if existing_uuid == uuid => self
                .store
                .delete(namespace, lock_path)
                .await
                .map_err(|e| LockerError::Backend(e.to_string())),
            Some(existing_uuid) => {
                Err(LockerError::Stolen { uuid: existing_uuid })
            }
        }
    }
}

#[cfg(test)]
#[path = "lock_tests.rs"]
mod tests;
