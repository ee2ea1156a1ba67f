//! Concurrency policies.
//!
//! ## Contents
//! - [`ConcurrencyMode`] what happens when a request arrives while another one
//!   for the same base is still in flight (latest / every)
//!
//! ## Quick wiring
//! ```text
//! Registration { base, operation, mode: ConcurrencyMode }
//!      └─► core::watcher::Watcher uses:
//!           - Latest → LatestGate::supersede() before each new execution
//!           - Every  → spawn without a gate
//! ```

mod concurrency;

pub use concurrency::ConcurrencyMode;
