//! # Action subscribers.
//!
//! Subscribers are the consumers of the actions the runtime produces (a state
//! store, a UI bridge, logging). They are fed by the supervisor's listener.
//!
//! ## Architecture
//! ```text
//! Handler ── publish(Action) ──► Bus ──► subscriber_listener ──► SubscriberSet::emit()
//!                                                                    │
//!                                                      ┌─────────────┼──────────┐
//!                                                      ▼             ▼          ▼
//!                                                  LogWriter       Store      Custom
//! ```

#[cfg(feature = "logging")]
mod log;
mod set;
mod subscribe;

#[cfg(feature = "logging")]
pub use log::LogWriter;
pub use set::SubscriberSet;
pub use subscribe::Subscribe;
