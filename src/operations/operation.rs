//! # Operation abstraction.
//!
//! An [`Operation`] is an opaque async function from a request payload to a
//! result or an [`OperationError`]. Typical operations are network requests
//! (start scrape, poll progress, fetch file); the runtime never looks inside
//! them.
//!
//! The common handle type is [`OperationRef`], an `Arc<dyn Operation>` suitable
//! for sharing across watchers and executions.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde_json::Value;

use crate::error::OperationError;

/// Boxed future returned by [`Operation::call`].
pub type BoxOperationFuture = Pin<Box<dyn Future<Output = Result<Value, OperationError>> + Send>>;

/// Shared handle to an operation.
pub type OperationRef = Arc<dyn Operation>;

/// # Asynchronous request function.
///
/// `call` produces a fresh, owned future per invocation so that executions can
/// be spawned and dropped (cancelled) independently.
///
/// # Example
/// ```
/// use serde_json::{Value, json};
/// use reqvisor::{BoxOperationFuture, Operation, OperationError};
///
/// struct Echo;
///
/// impl Operation for Echo {
///     fn call(&self, payload: Value) -> BoxOperationFuture {
///         Box::pin(async move { Ok::<_, OperationError>(json!({ "echo": payload })) })
///     }
/// }
/// ```
pub trait Operation: Send + Sync + 'static {
    /// Starts one invocation with the given request payload.
    fn call(&self, payload: Value) -> BoxOperationFuture;
}
