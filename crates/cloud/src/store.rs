// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Object store interface.
//!
//! `NotFound` is a distinguishable variant: release logic treats a missing
//! lock file as a success condition.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("Not Found {bucket} {key}")]
    NotFound { bucket: String, key: String },
    #[error("store error: {0}")]
    Other(String),
}

impl StoreError {
    pub fn not_found(bucket: &str, key: &str) -> Self {
        StoreError::NotFound { bucket: bucket.to_string(), key: key.to_string() }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }
}

/// Optional attributes for a put.
#[derive(Debug, Clone, Default)]
pub struct PutOptions {
    pub content_type: Option<String>,
    /// Defaults to `private` when unset.
    pub acl: Option<String>,
    pub server_side_encryption: Option<String>,
    pub kms_key_id: Option<String>,
}

impl PutOptions {
    relay_core::setters! {
        option {
            content_type: String,
            acl: String,
            server_side_encryption: String,
            kms_key_id: String,
        }
    }
}

#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn get(&self, bucket: &str, key: &str) -> Result<Vec<u8>, StoreError>;
    async fn put(
        &self,
        bucket: &str,
        key: &str,
        body: Vec<u8>,
        options: PutOptions,
    ) -> Result<(), StoreError>;
    async fn delete(&self, bucket: &str, key: &str) -> Result<(), StoreError>;
    async fn last_modified(&self, bucket: &str, key: &str) -> Result<DateTime<Utc>, StoreError>;
    async fn bucket_tags(&self, bucket: &str) -> Result<HashMap<String, String>, StoreError>;
}

/// Fetch and JSON-decode an object.
pub async fn get_struct<T: DeserializeOwned>(
    store: &dyn ObjectStore,
    bucket: &str,
    key: &str,
) -> Result<T, StoreError> {
    let body = store.get(bucket, key).await?;
    serde_json::from_slice(&body).map_err(|e| StoreError::Other(e.to_string()))
}

/// JSON-encode and upload a value.
pub async fn put_struct<T: Serialize>(
    store: &dyn ObjectStore,
    bucket: &str,
    key: &str,
    value: &T,
) -> Result<(), StoreError> {
    let body = serde_json::to_vec(value).map_err(|e| StoreError::Other(e.to_string()))?;
    store.put(bucket, key, body, PutOptions::default()).await
}

/// Hex SHA-256 of an object's bytes.
pub async fn get_sha256(
    store: &dyn ObjectStore,
    bucket: &str,
    key: &str,
) -> Result<String, StoreError> {
    let body = store.get(bucket, key).await?;
    Ok(relay_core::digest::sha256_hex(&body))
}

#[derive(Debug, Clone)]
struct StoredObject {
    body: Vec<u8>,
    last_modified: DateTime<Utc>,
}

#[derive(Default)]
struct MemoryStoreState {
    objects: HashMap<(String, String), StoredObject>,
    bucket_tags: HashMap<String, HashMap<String, String>>,
    /// Keys whose puts should fail, with the error message to return.
    put_failures: HashMap<String, String>,
    puts: Vec<String>,
    deletes: Vec<String>,
}

/// In-memory object store backing local execution and the scenario suite.
#[derive(Clone, Default)]
pub struct MemoryObjectStore {
    inner: Arc<Mutex<MemoryStoreState>>,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populate an object.
    pub fn seed(&self, bucket: &str, key: &str, body: impl Into<Vec<u8>>) {
        self.inner.lock().objects.insert(
            (bucket.to_string(), key.to_string()),
            StoredObject { body: body.into(), last_modified: Utc::now() },
        );
    }

    /// Make puts to `key` fail with `message`.
    pub fn fail_puts_to(&self, key: &str, message: &str) {
        self.inner.lock().put_failures.insert(key.to_string(), message.to_string());
    }

    pub fn set_bucket_tags(&self, bucket: &str, tags: HashMap<String, String>) {
        self.inner.lock().bucket_tags.insert(bucket.to_string(), tags);
    }

    /// Backdate an object, e.g. to simulate a stale marker file.
    pub fn set_last_modified(&self, bucket: &str, key: &str, when: DateTime<Utc>) {
        if let Some(object) =
            self.inner.lock().objects.get_mut(&(bucket.to_string(), key.to_string()))
        {
            object.last_modified = when;
        }
    }

    /// The stored bytes, if present.
    pub fn object(&self, bucket: &str, key: &str) -> Option<Vec<u8>> {
        self.inner
            .lock()
            .objects
            .get(&(bucket.to_string(), key.to_string()))
            .map(|o| o.body.clone())
    }

    pub fn contains(&self, bucket: &str, key: &str) -> bool {
        self.object(bucket, key).is_some()
    }

    /// Keys written so far, in order.
    pub fn put_keys(&self) -> Vec<String> {
        self.inner.lock().puts.clone()
    }

    pub fn delete_keys(&self) -> Vec<String> {
        self.inner.lock().deletes.clone()
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn get(&self, bucket: &str, key: &str) -> Result<Vec<u8>, StoreError> {
        self.object(bucket, key).ok_or_else(|| StoreError::not_found(bucket, key))
    }

    async fn put(
        &self,
        bucket: &str,
        key: &str,
        body: Vec<u8>,
        _options: PutOptions,
    ) -> Result<(), StoreError> {
        let mut state = self.inner.lock();
        if let Some(message) = state.put_failures.get(key) {
            return Err(StoreError::Other(message.clone()));
        }
        state.puts.push(key.to_string());
        state.objects.insert(
            (bucket.to_string(), key.to_string()),
            StoredObject { body, last_modified: Utc::now() },
        );
        Ok(())
    }

    async fn delete(&self, bucket: &str, key: &str) -> Result<(), StoreError> {
        let mut state = self.inner.lock();
        state.deletes.push(key.to_string());
        state.objects.remove(&(bucket.to_string(), key.to_string()));
        Ok(())
    }

    async fn last_modified(&self, bucket: &str, key: &str) -> Result<DateTime<Utc>, StoreError> {
        self.inner
            .lock()
            .objects
            .get(&(bucket.to_string(), key.to_string()))
            .map(|o| o.last_modified)
            .ok_or_else(|| StoreError::not_found(bucket, key))
    }

    async fn bucket_tags(&self, bucket: &str) -> Result<HashMap<String, String>, StoreError> {
        Ok(self.inner.lock().bucket_tags.get(bucket).cloned().unwrap_or_default())
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
