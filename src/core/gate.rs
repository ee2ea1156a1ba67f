//! # Emission gating for executions.
//!
//! Every execution owns a [`Lease`]: its cancellation token plus, under
//! `ConcurrencyMode::Latest`, the generation it was admitted with. All
//! lifecycle actions of the execution are published through
//! [`Lease::publish`], which drops them once the lease is no longer current.
//!
//! ## Latest mode
//! ```text
//! request #1 ─► supersede() ─► gen=1, token₁        exec₁: PENDING ... (suspended)
//! request #2 ─► supersede() ─► cancel token₁, gen=2  exec₂: PENDING ... SUCCESSFUL
//!                                                    exec₁: result arrives → dropped (gen 1 ≠ 2)
//! ```
//!
//! ## Rules
//! - `supersede()` cancels the previous token and advances the generation
//!   **before** the new execution is spawned, so the old one can never emit
//!   after the new `PENDING`.
//! - The generation check and the publish happen under the same lock; this
//!   keeps the rule true on a multi-threaded runtime too.
//! - A cancelled token (superseded or runtime shutdown) also closes the lease.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

use crate::actions::{Action, Bus};

#[derive(Default)]
struct GateState {
    generation: u64,
    current: Option<CancellationToken>,
}

/// Per-base generation counter used by `Latest` watchers.
#[derive(Default)]
pub(crate) struct LatestGate {
    state: Mutex<GateState>,
}

impl LatestGate {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Cancels the current execution (if any) and admits a new one.
    pub(crate) fn supersede(self: &Arc<Self>, parent: &CancellationToken) -> Lease {
        let mut state = self.state.lock();
        if let Some(prev) = state.current.take() {
            prev.cancel();
        }
        state.generation += 1;

        let token = parent.child_token();
        state.current = Some(token.clone());

        Lease {
            token,
            latest: Some((Arc::clone(self), state.generation)),
        }
    }

    /// Current generation (number of admitted executions).
    #[cfg(test)]
    pub(crate) fn generation(&self) -> u64 {
        self.state.lock().generation
    }
}

/// Right of one execution to publish lifecycle actions.
pub(crate) struct Lease {
    token: CancellationToken,
    latest: Option<(Arc<LatestGate>, u64)>,
}

impl Lease {
    /// Lease that is only closed by cancelling `token` (`Every` mode, direct calls).
    pub(crate) fn free(token: CancellationToken) -> Self {
        Self {
            token,
            latest: None,
        }
    }

    /// Cancellation token of this execution.
    pub(crate) fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// Publishes `action` if the lease is still current; returns whether it was published.
    pub(crate) fn publish(&self, bus: &Bus, action: Action) -> bool {
        match &self.latest {
            Some((gate, generation)) => {
                let state = gate.state.lock();
                if state.generation != *generation || self.token.is_cancelled() {
                    return false;
                }
                bus.publish(action);
                true
            }
            None => {
                if self.token.is_cancelled() {
                    return false;
                }
                bus.publish(action);
                true
            }
        }
    }
}

impl Drop for Lease {
    fn drop(&mut self) {
        if let Some((gate, generation)) = &self.latest {
            let mut state = gate.state.lock();
            if state.generation == *generation {
                state.current = None;
            }
        }
    }
}
