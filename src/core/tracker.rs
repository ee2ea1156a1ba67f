//! # Per-base phase tracker with sequence-based ordering.
//!
//! Records the last lifecycle phase observed for each base name and how many
//! of its executions are in flight. This is what a store would derive its
//! "loading" flag from.
//!
//! ## Architecture
//! ```text
//! Handler ──► Bus ──► subscriber_listener() ──► PhaseTracker::update()
//!                                                      │
//!                                                      ▼
//!                                       HashMap<String, BaseState>
//!                                     (base → {seq, phase, in_flight})
//! ```
//!
//! ## Rules
//! - Only `Pending` / `Successful` / `Failed` are tracked; `Requested` is ignored.
//! - `Latest` bases: one execution at a time. Actions with `seq <= last_seq` are
//!   **rejected** (stale); `Pending` sets the count to 1, a terminal action to 0.
//!   A superseded execution never reports, so the next `Pending` replaces it.
//! - `Every` bases: `Pending` adds one, a terminal action removes one. No action
//!   is stale since overlapping executions finish in any order.
//! - A base is pending while its count is above zero.
//! - Reads are **eventually consistent** with the bus.

use std::collections::HashMap;

use tokio::sync::RwLock;

use crate::actions::{Action, Phase};
use crate::policies::ConcurrencyMode;

#[derive(Debug, Clone, Copy)]
struct BaseState {
    last_seq: Option<u64>,
    phase: Phase,
    in_flight: usize,
}

/// Thread-safe tracker of lifecycle phases per base.
#[derive(Default)]
pub struct PhaseTracker {
    modes: HashMap<String, ConcurrencyMode>,
    state: RwLock<HashMap<String, BaseState>>,
}

impl PhaseTracker {
    /// Creates a new empty tracker; every base is treated as `Latest`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a tracker that knows the concurrency mode of each base.
    ///
    /// Bases missing from `modes` are treated as `Latest`.
    pub fn with_modes<I, S>(modes: I) -> Self
    where
        I: IntoIterator<Item = (S, ConcurrencyMode)>,
        S: Into<String>,
    {
        Self {
            modes: modes.into_iter().map(|(b, m)| (b.into(), m)).collect(),
            state: RwLock::default(),
        }
    }

    /// Applies `action` if it is a lifecycle action; returns false if ignored.
    ///
    /// ```text
    /// Latest: update(FETCH_FILE_SUCCESSFUL, seq=100) → phase=Successful, in_flight=0
    ///         update(FETCH_FILE_PENDING,    seq=99)  → rejected (stale)
    /// Every:  PENDING, PENDING, SUCCESSFUL           → in_flight=1, still pending
    /// ```
    pub async fn update(&self, action: &Action) -> bool {
        let phase = action.phase();
        if phase == Phase::Requested {
            return false;
        }
        let mode = self.modes.get(action.base()).copied().unwrap_or_default();

        let mut state = self.state.write().await;
        let entry = state
            .entry(action.base().to_string())
            .or_insert(BaseState {
                last_seq: None,
                phase,
                in_flight: 0,
            });

        match mode {
            ConcurrencyMode::Latest => {
                if entry.last_seq.is_some_and(|last| action.seq <= last) {
                    return false;
                }
                entry.in_flight = usize::from(phase == Phase::Pending);
            }
            ConcurrencyMode::Every => {
                if phase == Phase::Pending {
                    entry.in_flight += 1;
                } else {
                    entry.in_flight = entry.in_flight.saturating_sub(1);
                }
            }
        }
        entry.last_seq = Some(entry.last_seq.map_or(action.seq, |last| last.max(action.seq)));
        entry.phase = phase;
        true
    }

    /// Last observed phase for `base`.
    pub async fn phase(&self, base: &str) -> Option<Phase> {
        self.state.read().await.get(base).map(|s| s.phase)
    }

    /// Number of executions of `base` that reported `Pending` but not yet a terminal action.
    pub async fn in_flight(&self, base: &str) -> usize {
        self.state.read().await.get(base).map_or(0, |s| s.in_flight)
    }

    /// True while at least one execution of `base` is in flight.
    pub async fn is_pending(&self, base: &str) -> bool {
        self.in_flight(base).await > 0
    }

    /// Returns sorted list of bases currently pending.
    pub async fn snapshot_pending(&self) -> Vec<String> {
        let state = self.state.read().await;
        let mut pending: Vec<String> = state
            .iter()
            .filter(|(_, s)| s.in_flight > 0)
            .map(|(base, _)| base.clone())
            .collect();
        pending.sort_unstable();
        pending
    }
}
