//! # Supervisor: runs every watcher, fans actions out, shuts down gracefully.
//!
//! The [`Supervisor`] owns the frozen [`Watchers`], the [`SubscriberSet`] and
//! the [`PhaseTracker`]. [`run`](Supervisor::run) starts one task per watcher
//! and waits on them jointly until shutdown or a structural fault.
//!
//! ## High-level architecture
//! ```text
//! Registry ──freeze()──► Watchers ──► Supervisor::builder(cfg).build(watchers)
//!
//! run():
//!   subscriber_listener(): Bus.subscribe() ─► PhaseTracker::update() ─► SubscriberSet::emit()
//!
//!   Registration[0]  Registration[1]  ...  Registration[N-1]
//!         │                │                      │
//!         └──► Watcher::new(handler, trigger, mode)  (route opened before ready)
//!                   └──► set.spawn(catch_unwind(watcher.run(route, runtime_token)))
//!
//!   RunState::Ready ─► wait_ready() resolves
//!
//! Action flow:
//!   dispatch(<BASE>_REQUESTED) ──► Bus ──► route[base] ──► Watcher ──► Handler ──► Bus (PENDING, SUCCESSFUL/FAILED)
//!                                   └──► ring ──► listener ──► tracker + subscribers
//!
//! Exit paths:
//!   shutdown() / SIGINT | SIGTERM | SIGQUIT (Ctrl-C off unix)
//!       └─► runtime_token.cancel()  → watchers stop, executions cancelled silently
//!       └─► wait_all_with_grace(cfg.grace):
//!              ├─ all joined    → Ok(())
//!              └─ grace exceeded → Err(GraceExceeded { pending: tracker.snapshot_pending() })
//!
//!   watcher panicked / exited while live
//!       └─► runtime_token.cancel() → Err(WatcherPanicked | WatcherExited)
//!
//!   either way: routes closed, RunState::Stopped
//! ```
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use serde_json::{Value, json};
//! use reqvisor::{
//!     OperationError, OperationFn, Phase, Registry, Supervisor, SupervisorConfig, bases,
//! };
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let cfg = SupervisorConfig { handle_signals: false, ..SupervisorConfig::default() };
//!
//!     let mut registry = Registry::new(&cfg);
//!     registry.register(
//!         OperationFn::arc(|p: Value| async move { Ok::<_, OperationError>(json!({ "echo": p })) }),
//!         bases::FETCH_FILE,
//!     )?;
//!
//!     let sup = Supervisor::builder(cfg).build(registry.freeze());
//!     let mut rx = sup.bus().subscribe();
//!
//!     let runner = Arc::clone(&sup);
//!     let run = tokio::spawn(async move { runner.run().await });
//!     sup.wait_ready().await;
//!
//!     sup.request(bases::FETCH_FILE, json!({ "id": 7 }));
//!     loop {
//!         let action = rx.recv().await?;
//!         if action.phase() == Phase::Successful {
//!             break;
//!         }
//!     }
//!
//!     sup.shutdown();
//!     run.await??;
//!     Ok(())
//! }
//! ```

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use parking_lot::Mutex;
use serde_json::Value;
use tokio::{
    select,
    sync::{broadcast::error::RecvError, watch},
    task::{JoinError, JoinHandle, JoinSet},
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::{
    actions::{Action, Bus},
    error::RuntimeError,
    subscribers::SubscriberSet,
};

use super::{
    builder::SupervisorBuilder,
    config::SupervisorConfig,
    handler::panic_message,
    registry::Watchers,
    tracker::PhaseTracker,
    watcher::{Watcher, WatcherExit},
};

type WatcherResult = (Arc<str>, Result<WatcherExit, String>);

/// Where the supervisor is in its single run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RunState {
    Idle,
    Ready,
    Stopped,
}

/// Runs the watchers of a frozen registry; see the module docs.
pub struct Supervisor {
    cfg: SupervisorConfig,
    bus: Bus,
    subs: Arc<SubscriberSet>,
    tracker: Arc<PhaseTracker>,
    watchers: Mutex<Option<Watchers>>,
    runtime_token: CancellationToken,
    state: watch::Sender<RunState>,
}

impl Supervisor {
    /// Creates a new builder for configuring the supervisor.
    pub fn builder(cfg: SupervisorConfig) -> SupervisorBuilder {
        SupervisorBuilder::new(cfg)
    }

    pub(super) fn new_internal(
        cfg: SupervisorConfig,
        subs: Arc<SubscriberSet>,
        watchers: Watchers,
    ) -> Self {
        let (state, _) = watch::channel(RunState::Idle);
        let tracker = PhaseTracker::with_modes(
            watchers
                .registrations()
                .map(|r| (r.base().to_string(), r.mode())),
        );
        Self {
            cfg,
            bus: watchers.bus.clone(),
            subs,
            tracker: Arc::new(tracker),
            watchers: Mutex::new(Some(watchers)),
            runtime_token: CancellationToken::new(),
            state,
        }
    }

    /// Runs every watcher until shutdown.
    ///
    /// Returns:
    /// - `Ok(())` after [`shutdown`](Self::shutdown) (or an OS signal) once all watchers stopped within grace;
    /// - `Err(GraceExceeded)` if they did not;
    /// - `Err(WatcherPanicked | WatcherExited)` if a watcher died while the runtime was live;
    /// - `Err(AlreadyRunning)` on a second call.
    pub async fn run(&self) -> Result<(), RuntimeError> {
        let watchers = self
            .watchers
            .lock()
            .take()
            .ok_or(RuntimeError::AlreadyRunning)?;

        let listener = self.subscriber_listener();
        let mut set = JoinSet::new();
        self.spawn_watchers(&mut set, watchers);

        self.state.send_replace(RunState::Ready);
        info!(watchers = set.len(), "supervisor ready");

        let res = self.drive_shutdown(&mut set).await;

        self.bus.close_routes();
        self.state.send_replace(RunState::Stopped);
        let _ = listener.await;
        res
    }

    /// Requests shutdown; [`run`](Self::run) cancels all watchers and returns.
    pub fn shutdown(&self) {
        self.runtime_token.cancel();
    }

    /// Resolves once [`run`](Self::run) has opened the request route of every watcher,
    /// or once `run` has finished.
    ///
    /// Requests dispatched while ready are seen by their watcher. Before `run` is
    /// called this keeps waiting.
    pub async fn wait_ready(&self) {
        let mut rx = self.state.subscribe();
        let _ = rx.wait_for(|state| *state != RunState::Idle).await;
    }

    /// Publishes `action` on the bus.
    pub fn dispatch(&self, action: Action) {
        self.bus.publish(action);
    }

    /// Publishes `<base>_REQUESTED` with `payload`.
    pub fn request(&self, base: &str, payload: Value) {
        self.dispatch(Action::requested(base, payload));
    }

    /// Action bus shared with all handlers.
    pub fn bus(&self) -> &Bus {
        &self.bus
    }

    /// True while an execution of `base` has reported `<base>_PENDING` but no terminal action.
    pub async fn is_pending(&self, base: &str) -> bool {
        self.tracker.is_pending(base).await
    }

    /// Sorted list of bases with at least one execution in flight.
    pub async fn pending(&self) -> Vec<String> {
        self.tracker.snapshot_pending().await
    }

    /// Forwards bus actions to the tracker and subscribers until shutdown.
    ///
    /// Subscribed synchronously so that nothing published after `run` starts is missed.
    fn subscriber_listener(&self) -> JoinHandle<()> {
        let mut rx = self.bus.subscribe();
        let subs = Arc::clone(&self.subs);
        let tracker = Arc::clone(&self.tracker);
        let token = self.runtime_token.clone();

        tokio::spawn(async move {
            loop {
                select! {
                    biased;
                    msg = rx.recv() => match msg {
                        Ok(action) => {
                            tracker.update(&action).await;
                            subs.emit(&action);
                        }
                        Err(RecvError::Lagged(skipped)) => {
                            warn!(skipped, "subscriber listener lagged; actions lost");
                        }
                        Err(RecvError::Closed) => break,
                    },
                    _ = token.cancelled() => break,
                }
            }
        })
    }

    /// Spawns one task per watcher; each route is open before this returns.
    fn spawn_watchers(&self, set: &mut JoinSet<WatcherResult>, watchers: Watchers) {
        for (registration, handler) in watchers.entries {
            let base = Arc::clone(registration.base_arc());
            let route = self.bus.open_route(Arc::clone(&base));
            let watcher = Watcher::new(handler, registration.trigger(), registration.mode());
            let token = self.runtime_token.clone();

            debug!(base = %base, mode = registration.mode().as_label(), "watcher started");
            set.spawn(async move {
                let res = AssertUnwindSafe(watcher.run(route, token))
                    .catch_unwind()
                    .await
                    .map_err(|panic| panic_message(panic.as_ref()));
                (base, res)
            });
        }
    }

    /// Waits until shutdown is requested or a watcher dies.
    async fn drive_shutdown(&self, set: &mut JoinSet<WatcherResult>) -> Result<(), RuntimeError> {
        select! {
            biased;
            source = self.shutdown_requested() => {
                info!(source, "shutdown requested");
                self.runtime_token.cancel();
                self.wait_all_with_grace(set).await
            }
            Some(joined) = set.join_next() => {
                let err = watcher_fault(joined);
                error!(label = err.as_label(), error = %err, "watcher stopped; shutting down");
                self.runtime_token.cancel();
                let _ = self.wait_all_with_grace(set).await;
                Err(err)
            }
        }
    }

    /// Completes on `shutdown()`, or on an OS signal when `handle_signals` is set.
    ///
    /// Returns what triggered it, for the log line.
    async fn shutdown_requested(&self) -> &'static str {
        const EXPLICIT: &str = "shutdown()";
        if !self.cfg.handle_signals {
            self.runtime_token.cancelled().await;
            return EXPLICIT;
        }
        select! {
            res = termination_signal() => match res {
                Ok(signal) => signal,
                Err(e) => {
                    warn!(error = %e, "signal handlers unavailable; waiting for shutdown()");
                    self.runtime_token.cancelled().await;
                    EXPLICIT
                }
            },
            _ = self.runtime_token.cancelled() => EXPLICIT,
        }
    }

    /// Waits for all watchers to finish within the configured grace period.
    ///
    /// `grace = 0` aborts the remaining watchers without waiting.
    async fn wait_all_with_grace(
        &self,
        set: &mut JoinSet<WatcherResult>,
    ) -> Result<(), RuntimeError> {
        let grace = self.cfg.grace;
        if grace.is_zero() {
            set.abort_all();
            return Ok(());
        }

        let done = async { while set.join_next().await.is_some() {} };
        match tokio::time::timeout(grace, done).await {
            Ok(()) => {
                info!("all watchers stopped within grace");
                Ok(())
            }
            Err(_) => {
                set.abort_all();
                let pending = self.tracker.snapshot_pending().await;
                warn!(?grace, ?pending, "grace exceeded");
                Err(RuntimeError::GraceExceeded { grace, pending })
            }
        }
    }
}

/// Waits for SIGINT, SIGTERM or SIGQUIT and names the one received.
#[cfg(unix)]
async fn termination_signal() -> std::io::Result<&'static str> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut int = signal(SignalKind::interrupt())?;
    let mut term = signal(SignalKind::terminate())?;
    let mut quit = signal(SignalKind::quit())?;
    let name = select! {
        _ = int.recv() => "SIGINT",
        _ = term.recv() => "SIGTERM",
        _ = quit.recv() => "SIGQUIT",
    };
    Ok(name)
}

/// Waits for Ctrl-C.
#[cfg(not(unix))]
async fn termination_signal() -> std::io::Result<&'static str> {
    tokio::signal::ctrl_c().await?;
    Ok("ctrl_c")
}

/// Maps a watcher task result to the structural fault it represents.
fn watcher_fault(joined: Result<WatcherResult, JoinError>) -> RuntimeError {
    match joined {
        Ok((base, Ok(exit))) => RuntimeError::WatcherExited {
            base: base.to_string(),
            reason: exit.as_label().to_string(),
        },
        Ok((base, Err(reason))) => RuntimeError::WatcherPanicked {
            base: base.to_string(),
            reason,
        },
        Err(e) => RuntimeError::WatcherPanicked {
            base: "unknown".to_string(),
            reason: e.to_string(),
        },
    }
}
