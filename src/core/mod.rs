//! Runtime core: handlers, watchers and the supervisor.
//!
//! Internal modules:
//! - [`handler`]: runs one execution of an operation and publishes its lifecycle actions;
//! - [`gate`]: take-latest generation gate (cancel previous, drop late results);
//! - [`watcher`]: standing subscription per base applying the concurrency mode;
//! - [`registry`]: registration phase, frozen into [`Watchers`];
//! - [`supervisor`]: runs all watchers, fans actions out, graceful shutdown;
//! - [`tracker`]: last lifecycle phase and in-flight count per base;
//! - [`invoke`]: call-and-wait seam between handlers and operations.

mod builder;
mod config;
mod gate;
mod handler;
mod invoke;
mod registry;
mod supervisor;
mod tracker;
mod watcher;

pub use builder::SupervisorBuilder;
pub use config::SupervisorConfig;
pub use handler::{Handler, Outcome};
pub use invoke::{DirectInvoke, Invoke, InvokeRef};
pub use registry::{Registry, Watchers};
pub use supervisor::Supervisor;
pub use tracker::PhaseTracker;
