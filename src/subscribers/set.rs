//! # Non-blocking action fan-out to multiple subscribers.
//!
//! ## Architecture
//! ```text
//! emit(action)
//!     │
//!     ├──► [queue 1] ──► worker 1 ──► subscriber1.on_action()
//!     │    (bounded)         └──────► panic → logged, worker continues
//!     ├──► [queue 2] ──► worker 2 ──► subscriber2.on_action()
//!     └──► [queue N] ──► worker N ──► subscriberN.on_action()
//! ```
//!
//! ## Rules
//! - **No cross-subscriber ordering**: subscriber A may process action N while B processes N+5
//! - **Overflow**: action dropped for that subscriber only (warn)
//! - **Non-blocking**: `emit()` returns immediately (uses `try_send`)
//! - **Isolation**: a slow or panicking subscriber doesn't affect others
//! - **Per-subscriber FIFO**: each subscriber sees actions in order
//!
//! **Warning**: `AssertUnwindSafe` is used, which can leave shared state inconsistent
//! if a subscriber panics while holding a lock.

use std::sync::Arc;

use futures::FutureExt;
use tokio::{sync::mpsc, task::JoinHandle};
use tracing::{error, warn};

use crate::actions::Action;
use crate::subscribers::Subscribe;

struct SubscriberChannel {
    name: &'static str,
    sender: mpsc::Sender<Arc<Action>>,
}

/// Fan-out coordinator for multiple action subscribers.
pub struct SubscriberSet {
    channels: Vec<SubscriberChannel>,
    workers: Vec<JoinHandle<()>>,
}

impl SubscriberSet {
    /// Creates a new set and spawns one worker task per subscriber.
    ///
    /// Must be called inside a tokio runtime. Minimum queue capacity is 1.
    #[must_use]
    pub fn new(subs: Vec<Arc<dyn Subscribe>>) -> Self {
        let mut channels = Vec::with_capacity(subs.len());
        let mut workers = Vec::with_capacity(subs.len());

        for sub in subs {
            let cap = sub.queue_capacity().max(1);
            let name = sub.name();
            let (tx, mut rx) = mpsc::channel::<Arc<Action>>(cap);

            let handle = tokio::spawn(async move {
                while let Some(action) = rx.recv().await {
                    let fut = sub.on_action(action.as_ref());
                    if let Err(panic_err) = std::panic::AssertUnwindSafe(fut).catch_unwind().await
                    {
                        let info = if let Some(msg) = panic_err.downcast_ref::<&'static str>() {
                            (*msg).to_string()
                        } else if let Some(msg) = panic_err.downcast_ref::<String>() {
                            msg.clone()
                        } else {
                            "unknown panic".to_string()
                        };
                        error!(subscriber = sub.name(), %info, "subscriber panicked");
                    }
                }
            });

            channels.push(SubscriberChannel { name, sender: tx });
            workers.push(handle);
        }

        Self { channels, workers }
    }

    /// Fans one action out to all subscribers (non-blocking).
    pub fn emit(&self, action: &Action) {
        self.emit_arc(Arc::new(action.clone()));
    }

    /// Fans a pre-allocated `Arc<Action>` out to all subscribers.
    pub fn emit_arc(&self, action: Arc<Action>) {
        for channel in &self.channels {
            match channel.sender.try_send(Arc::clone(&action)) {
                Ok(()) => {}
                Err(mpsc::error::TrySendError::Full(_)) => {
                    warn!(subscriber = channel.name, action = %action.kind, "dropped action: queue full");
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    warn!(subscriber = channel.name, action = %action.kind, "dropped action: worker closed");
                }
            }
        }
    }

    /// Closes all queues and waits until every worker has drained its queue.
    pub async fn shutdown(self) {
        drop(self.channels);
        for h in self.workers {
            let _ = h.await;
        }
    }

    /// True if there are no subscribers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    /// Number of subscribers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.channels.len()
    }
}
