// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Task handler registration and dispatch.
//!
//! Handlers are opaque async callables taking `(context, event)` and
//! returning a dynamic JSON value. [`handler_fn`] lifts a typed closure into
//! the dynamic signature; the registry dispatches the `{Task, …}` envelope
//! used when a whole handler set is hosted behind one function endpoint.

use async_trait::async_trait;
use relay_core::StateError;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;

/// Ambient context for a task invocation.
///
/// Carries the invoked function ARN so handlers can derive the region,
/// account, and function name they are running as.
#[derive(Debug, Clone)]
pub struct TaskContext {
    pub function_arn: String,
}

impl TaskContext {
    pub fn new(function_arn: impl Into<String>) -> Self {
        Self { function_arn: function_arn.into() }
    }

    /// Context injected by the local interpreter for a state.
    pub fn local(function_name: &str) -> Self {
        Self::new(format!(
            "arn:aws:lambda:us-east-1:000000000:function:{function_name}"
        ))
    }

    /// `(region, account)` parsed from the function ARN.
    pub fn region_account(&self) -> Option<(String, String)> {
        let parts: Vec<&str> = self.function_arn.split(':').collect();
        match parts.as_slice() {
            ["arn", _, _, region, account, ..] if !region.is_empty() && !account.is_empty() => {
                Some((region.to_string(), account.to_string()))
            }
            _ => None,
        }
    }

    /// The function name segment of the ARN, when present.
    pub fn function_name(&self) -> Option<&str> {
        let parts: Vec<&str> = self.function_arn.split(':').collect();
        match parts.as_slice() {
            ["arn", _, _, _, _, "function", name, ..] => Some(name),
            _ => None,
        }
    }
}

/// An async task handler over dynamic JSON values.
#[async_trait]
pub trait TaskHandler: Send + Sync {
    async fn call(&self, ctx: TaskContext, input: Value) -> Result<Value, StateError>;
}

/// A handler bound to a task state. Wrapper so state structs stay `Debug`.
#[derive(Clone)]
pub struct BoundHandler(pub Arc<dyn TaskHandler>);

impl std::fmt::Debug for BoundHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("BoundHandler")
    }
}

struct FnHandler<F, T, R> {
    f: F,
    _marker: PhantomData<fn(T) -> R>,
}

#[async_trait]
impl<F, Fut, T, R> TaskHandler for FnHandler<F, T, R>
where
    F: Fn(TaskContext, T) -> Fut + Send + Sync,
    Fut: Future<Output = Result<R, StateError>> + Send,
    T: DeserializeOwned + Send,
    R: Serialize + Send,
{
    async fn call(&self, ctx: TaskContext, input: Value) -> Result<Value, StateError> {
        let event: T = serde_json::from_value(input)
            .map_err(|e| StateError::unmarshal(e.to_string()))?;
        let output = (self.f)(ctx, event).await?;
        serde_json::to_value(output).map_err(|e| StateError::unmarshal(e.to_string()))
    }
}

/// Lift a typed async closure into a [`TaskHandler`].
///
/// The event is decoded from the dynamic input (failure is
/// `UnmarshalError`), and the result is re-encoded into dynamic form.
pub fn handler_fn<F, Fut, T, R>(f: F) -> Arc<dyn TaskHandler>
where
    F: Fn(TaskContext, T) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<R, StateError>> + Send + 'static,
    T: DeserializeOwned + Send + 'static,
    R: Serialize + Send + 'static,
{
    Arc::new(FnHandler { f, _marker: PhantomData })
}

/// Invoke a handler on its own task so a panicking handler surfaces as a
/// `PanicError` instead of unwinding through the interpreter.
pub async fn call_contained(
    handler: Arc<dyn TaskHandler>,
    ctx: TaskContext,
    input: Value,
) -> Result<Value, StateError> {
    let joined = tokio::spawn(async move { handler.call(ctx, input).await }).await;
    match joined {
        Ok(result) => result,
        Err(join_err) if join_err.is_panic() => {
            let payload = join_err.into_panic();
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            Err(StateError::panic(message))
        }
        Err(join_err) => Err(StateError::runtime(join_err.to_string())),
    }
}

/// Registry mapping task names to handlers.
///
/// Read-only after construction; dispatch clones the `Arc` per call.
#[derive(Clone, Default)]
pub struct TaskHandlers {
    handlers: HashMap<String, Arc<dyn TaskHandler>>,
}

impl TaskHandlers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, handler: Arc<dyn TaskHandler>) {
        self.handlers.insert(name.into(), handler);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn TaskHandler>> {
        self.handlers.get(name).cloned()
    }

    /// Registered task names, sorted for stable error messages.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.handlers.keys().cloned().collect();
        names.sort();
        names
    }

    /// Dispatch a `{Task, …}` envelope to the named handler.
    pub async fn dispatch(&self, ctx: TaskContext, envelope: Value) -> Result<Value, StateError> {
        let task = envelope
            .as_object()
            .and_then(|m| m.get("Task"))
            .and_then(Value::as_str)
            .map(str::to_string);

        let Some(task) = task else {
            return Err(StateError::task("Nil Task"));
        };

        let Some(handler) = self.get(&task) else {
            return Err(StateError::task(format!(
                "Cannot Find Task {task} : {:?}",
                self.names()
            )));
        };

        tracing::info!(task = %task, "dispatching task handler");
        call_contained(handler, ctx, envelope).await
    }
}

impl std::fmt::Debug for TaskHandlers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskHandlers").field("names", &self.names()).finish()
    }
}

#[cfg(test)]
#[path = "handler_tests.rs"]
mod tests;
