//! # Call-and-wait primitive.
//!
//! Handlers never call an operation directly: they go through an [`Invoke`]
//! implementation. Production code uses [`DirectInvoke`]; test harnesses can
//! install their own invoker to record or stub calls without doing real I/O.
//!
//! ```text
//! Handler::execute
//!   ├─► publish <base>_PENDING
//!   ├─► invoker.invoke(base, operation, payload).await   ← single suspension point
//!   └─► publish <base>_SUCCESSFUL / <base>_FAILED
//! ```
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use serde_json::{Value, json};
//! use reqvisor::{
//!     BoxOperationFuture, Invoke, OperationError, OperationRef, Registry, SupervisorConfig,
//! };
//!
//! /// Answers every call with a canned result.
//! struct Canned(Value);
//!
//! impl Invoke for Canned {
//!     fn invoke(&self, _base: &str, _op: &OperationRef, _payload: Value) -> BoxOperationFuture {
//!         let out = self.0.clone();
//!         Box::pin(async move { Ok::<_, OperationError>(out) })
//!     }
//! }
//!
//! let registry = Registry::with_invoker(&SupervisorConfig::default(), Arc::new(Canned(json!(1))));
//! # let _ = registry;
//! ```

use std::sync::Arc;

use serde_json::Value;

use crate::operations::{BoxOperationFuture, OperationRef};

/// Shared handle to an invoker.
pub type InvokeRef = Arc<dyn Invoke>;

/// Indirection between a handler and the operation it runs.
pub trait Invoke: Send + Sync + 'static {
    /// Starts `operation` with `payload` on behalf of the handler for `base`.
    fn invoke(&self, base: &str, operation: &OperationRef, payload: Value) -> BoxOperationFuture;
}

/// Calls the operation as-is.
#[derive(Debug, Default, Clone, Copy)]
pub struct DirectInvoke;

impl Invoke for DirectInvoke {
    #[inline]
    fn invoke(&self, _base: &str, operation: &OperationRef, payload: Value) -> BoxOperationFuture {
        operation.call(payload)
    }
}
