//! Actions: types and broadcast bus.
//!
//! ## Contents
//! - [`Phase`], [`ActionType`], [`Action`] action classification and payload
//! - [`Bus`] thin wrapper over `tokio::sync::broadcast`
//!
//! ## Quick reference
//! - **Publishers**: application code (`_REQUESTED`), `Handler` (lifecycle actions).
//! - **Consumers**: one `Watcher` per registered base, `Supervisor::subscriber_listener()`
//!   (fans out to `SubscriberSet` and updates the phase tracker).

mod action;
mod bus;

pub use action::{Action, ActionType, Phase};
pub use bus::Bus;
