//! # Handler: run one execution of an operation.
//!
//! A [`Handler`] is produced by [`Registry::register`](crate::Registry::register)
//! for each base name. Watchers run it once per `<BASE>_REQUESTED` action; it
//! can also be invoked directly with [`Handler::handle`].
//!
//! ## Action flow
//! ```text
//! Success:
//!   publish PENDING → invoke(payload) → Ok(result)  → publish SUCCESSFUL(result)
//!
//! Failure:
//!   publish PENDING → invoke(payload) → Err(error)  → publish FAILED(normalize_error(error))
//!
//! Panic in the operation:
//!   publish PENDING → invoke(payload) → panic        → publish FAILED({statusCode: null})
//!
//! Cancellation (superseded or shutdown):
//!   publish PENDING → invoke(payload) ✕ dropped      → nothing else
//! ```
//!
//! ## Rules
//! - `PENDING` is published **before** the operation is started.
//! - The invocation is the **only** suspension point.
//! - At most **one** terminal action per execution; never retried.
//! - Operation failures never escape the handler.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::{
    actions::{Action, Bus, Phase},
    core::{gate::Lease, invoke::InvokeRef},
    error::OperationError,
    normalize::normalize_error,
    operations::OperationRef,
};

/// How an execution ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// `<base>_SUCCESSFUL` was published.
    Successful,
    /// `<base>_FAILED` was published.
    Failed,
    /// The execution was superseded or shut down; no terminal action.
    Cancelled,
}

/// Executable procedure bound to one base name and operation.
///
/// Cheap to clone (all fields are shared handles).
#[derive(Clone)]
pub struct Handler {
    base: Arc<str>,
    operation: OperationRef,
    bus: Bus,
    invoker: InvokeRef,
}

impl std::fmt::Debug for Handler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Handler").field("base", &self.base).finish_non_exhaustive()
    }
}

impl Handler {
    pub(crate) fn new(base: Arc<str>, operation: OperationRef, bus: Bus, invoker: InvokeRef) -> Self {
        Self {
            base,
            operation,
            bus,
            invoker,
        }
    }

    /// Base name this handler emits actions for.
    pub fn base(&self) -> &str {
        &self.base
    }

    /// Runs one execution for `action`, bypassing any watcher and concurrency policy.
    ///
    /// The action's payload (or `null` if absent) is passed to the operation.
    /// Lifecycle actions are published on the registry's bus.
    pub async fn handle(&self, action: &Action) -> Outcome {
        let payload = action.payload.clone().unwrap_or(Value::Null);
        self.execute(payload, Lease::free(CancellationToken::new())).await
    }

    /// Runs one execution under `lease`.
    pub(crate) async fn execute(&self, payload: Value, lease: Lease) -> Outcome {
        if !lease.publish(&self.bus, Action::pending(Arc::clone(&self.base))) {
            return Outcome::Cancelled;
        }

        let call = async { self.invoker.invoke(&self.base, &self.operation, payload).await };
        let res = tokio::select! {
            biased;
            _ = lease.token().cancelled() => {
                debug!(base = %self.base, "execution cancelled");
                return Outcome::Cancelled;
            }
            res = AssertUnwindSafe(call).catch_unwind() => res,
        };

        let action = match res {
            Ok(Ok(result)) => Action::successful(Arc::clone(&self.base), result),
            Ok(Err(err)) => {
                debug!(base = %self.base, label = err.as_label(), error = %err, "operation failed");
                Action::failed(Arc::clone(&self.base), normalize_error(&err))
            }
            Err(panic) => {
                let reason = panic_message(panic.as_ref());
                warn!(base = %self.base, %reason, "operation panicked");
                Action::failed(
                    Arc::clone(&self.base),
                    normalize_error(&OperationError::transport(reason)),
                )
            }
        };

        let phase = action.phase();
        if !lease.publish(&self.bus, action) {
            debug!(base = %self.base, "result discarded: execution superseded");
            return Outcome::Cancelled;
        }
        match phase {
            Phase::Successful => Outcome::Successful,
            _ => Outcome::Failed,
        }
    }
}

/// Best-effort text of a panic payload.
pub(crate) fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
