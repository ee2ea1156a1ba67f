//! # Watcher: standing subscription for one base name.
//!
//! Drains the base's request route (see [`Bus`](crate::Bus)) and starts one
//! [`Handler`] execution per `<BASE>_REQUESTED`, applying the registration's
//! [`ConcurrencyMode`].
//!
//! ## Architecture
//! ```text
//! Registration ──► Supervisor ──► Watcher::run(bus.open_route(base))
//!
//! loop {
//!   ├─► recv() → action.kind == trigger ?
//!   │     ├─ Latest → gate.supersede()  (cancel previous, new generation)
//!   │     ├─ Every  → Lease::free(child token)
//!   │     └─► executions.spawn(handler.execute(payload, lease))
//!   ├─► reap finished executions
//!   └─ exit conditions:
//!        - runtime_token cancelled → Shutdown
//!        - route closed            → RouteClosed
//! }
//!
//! On exit: executions are cancelled (child tokens) and joined.
//! ```
//!
//! ## Rules
//! - Anything other than the trigger type is ignored.
//! - Under `Latest`, superseding happens **before** the new execution is spawned.
//! - The route is unbounded: a burst of requests is never dropped.

use std::sync::Arc;

use tokio::{select, sync::mpsc, task::JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

use crate::{
    actions::{Action, ActionType},
    core::{
        gate::{LatestGate, Lease},
        handler::{Handler, Outcome},
    },
    policies::ConcurrencyMode,
};

/// Why a watcher loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum WatcherExit {
    /// Runtime token cancelled.
    Shutdown,
    /// The request route was closed while the runtime was live.
    RouteClosed,
}

impl WatcherExit {
    pub(crate) fn as_label(self) -> &'static str {
        match self {
            WatcherExit::Shutdown => "shutdown",
            WatcherExit::RouteClosed => "route_closed",
        }
    }
}

/// Runs `handler` for every matching request.
pub(crate) struct Watcher {
    handler: Handler,
    trigger: ActionType,
    mode: ConcurrencyMode,
    gate: Arc<LatestGate>,
}

impl Watcher {
    pub(crate) fn new(handler: Handler, trigger: ActionType, mode: ConcurrencyMode) -> Self {
        Self {
            handler,
            trigger,
            mode,
            gate: LatestGate::new(),
        }
    }

    /// Runs until the runtime token is cancelled or the route closes.
    ///
    /// The route must be opened before the supervisor reports ready, otherwise
    /// requests dispatched in between are missed.
    pub(crate) async fn run(
        self,
        mut rx: mpsc::UnboundedReceiver<Action>,
        runtime_token: CancellationToken,
    ) -> WatcherExit {
        let mut executions: JoinSet<Outcome> = JoinSet::new();

        let exit = loop {
            select! {
                biased;
                _ = runtime_token.cancelled() => break WatcherExit::Shutdown,
                Some(joined) = executions.join_next(), if !executions.is_empty() => {
                    if let Err(e) = joined {
                        if e.is_panic() {
                            error!(base = self.handler.base(), "execution task panicked");
                        }
                    }
                }
                msg = rx.recv() => match msg {
                    Some(action) if action.kind == self.trigger => {
                        self.admit(action, &mut executions, &runtime_token);
                    }
                    Some(_) => {}
                    None => break WatcherExit::RouteClosed,
                }
            }
        };

        executions.shutdown().await;
        exit
    }

    /// Starts one execution for `action` under this watcher's concurrency mode.
    fn admit(
        &self,
        action: Action,
        executions: &mut JoinSet<Outcome>,
        runtime_token: &CancellationToken,
    ) {
        let lease = match self.mode {
            ConcurrencyMode::Latest => self.gate.supersede(runtime_token),
            ConcurrencyMode::Every => Lease::free(runtime_token.child_token()),
        };
        debug!(
            base = self.handler.base(),
            mode = self.mode.as_label(),
            seq = action.seq,
            "request admitted"
        );

        let handler = self.handler.clone();
        let payload = action.payload.unwrap_or_default();
        executions.spawn(async move { handler.execute(payload, lease).await });
    }
}
