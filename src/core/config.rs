//! # Global runtime configuration.
//!
//! Provides [`SupervisorConfig`] centralized settings for the registry and the
//! supervisor runtime.
//!
//! Config is used in two ways:
//! 1. **Registry creation**: `Registry::new(&config)` (bus capacity, default mode)
//! 2. **Supervisor creation**: `Supervisor::builder(config)` (grace, signals)
//!
//! ## Sentinel values
//! - `grace = 0s` → do not wait for watchers on shutdown
//! - `bus_capacity = 0` → clamped to 1

use std::time::Duration;

use crate::policies::ConcurrencyMode;

/// Global configuration for the request runtime.
///
/// ## Field semantics
/// - `grace`: Maximum wait for watchers to stop after shutdown is requested
/// - `bus_capacity`: Action bus ring buffer size (min 1; clamped by Bus)
/// - `default_mode`: Concurrency mode used by `Registry::register`
/// - `handle_signals`: Whether `Supervisor::run` listens for OS termination signals
#[derive(Clone, Debug)]
pub struct SupervisorConfig {
    /// Maximum time to wait for watchers and in-flight executions on shutdown.
    ///
    /// If exceeded, `run` returns `RuntimeError::GraceExceeded` listing the
    /// bases still pending.
    pub grace: Duration,

    /// Capacity of the action bus broadcast channel ring buffer.
    ///
    /// Observers that lag behind more than `bus_capacity` actions skip the
    /// older ones. Requests reach their watcher through a separate unbounded
    /// route and are never skipped.
    pub bus_capacity: usize,

    /// Concurrency mode for registrations that do not pick one.
    pub default_mode: ConcurrencyMode,

    /// Listen for SIGINT/SIGTERM/SIGQUIT (Ctrl-C on Windows) and shut down on receipt.
    pub handle_signals: bool,
}

impl SupervisorConfig {
    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }
}

impl Default for SupervisorConfig {
    /// Default configuration:
    ///
    /// - `grace = 5s`
    /// - `bus_capacity = 1024`
    /// - `default_mode = ConcurrencyMode::Latest`
    /// - `handle_signals = true`
    fn default() -> Self {
        Self {
            grace: Duration::from_secs(5),
            bus_capacity: 1024,
            default_mode: ConcurrencyMode::Latest,
            handle_signals: true,
        }
    }
}
