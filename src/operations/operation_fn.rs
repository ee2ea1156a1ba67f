//! # Function-backed operation (`OperationFn`)
//!
//! [`OperationFn`] wraps a closure `F: Fn(Value) -> Fut`, producing a fresh
//! future per call. State shared between calls has to be captured explicitly
//! (e.g. an `Arc<Client>` cloned into the future).
//!
//! ## Example
//! ```rust
//! use serde_json::{Value, json};
//! use reqvisor::{OperationError, OperationFn, OperationRef};
//!
//! let fetch_file: OperationRef = OperationFn::arc(|payload: Value| async move {
//!     match payload.get("id").and_then(Value::as_u64) {
//!         Some(7) => Ok(json!({"name": "a.txt"})),
//!         _ => Err(OperationError::status(404)),
//!     }
//! });
//! # let _ = fetch_file;
//! ```

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use serde_json::Value;

use crate::error::OperationError;
use crate::operations::operation::{BoxOperationFuture, Operation};

/// Function-backed operation implementation.
pub struct OperationFn<F> {
    f: F,
}

impl<F> OperationFn<F> {
    /// Creates a new function-backed operation.
    ///
    /// Prefer [`OperationFn::arc`] when you immediately need an
    /// [`OperationRef`](crate::OperationRef).
    pub fn new(f: F) -> Self {
        Self { f }
    }

    /// Creates the operation and returns it as a shared handle.
    pub fn arc(f: F) -> Arc<Self> {
        Arc::new(Self::new(f))
    }
}

impl<F> fmt::Debug for OperationFn<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OperationFn").finish_non_exhaustive()
    }
}

impl<F, Fut> Operation for OperationFn<F>
where
    F: Fn(Value) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Value, OperationError>> + Send + 'static,
{
    fn call(&self, payload: Value) -> BoxOperationFuture {
        Box::pin((self.f)(payload))
    }
}
