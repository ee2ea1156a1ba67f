//! # reqvisor
//!
//! **Reqvisor** turns a single "request requested" action into a supervised
//! asynchronous operation with observable phases.
//!
//! Application code registers one asynchronous operation per *base name*
//! (e.g. `FETCH_FILE`). Dispatching `FETCH_FILE_REQUESTED` then produces
//! `FETCH_FILE_PENDING` followed by exactly one of `FETCH_FILE_SUCCESSFUL`
//! (carrying the result) or `FETCH_FILE_FAILED` (carrying a normalized error
//! record), unless the execution is superseded or shut down.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!     ┌──────────────┐   ┌──────────────┐   ┌───────────────┐
//!     │ START_SCRAPE │   │  FETCH_FILE  │   │ POLL_PROGRESS │
//!     │  (Operation) │   │  (Operation) │   │  (Operation)  │
//!     └──────┬───────┘   └──────┬───────┘   └──────┬────────┘
//!            ▼                  ▼                  ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  Registry (startup phase)                                         │
//! │  - validates base names, rejects duplicates                       │
//! │  - builds one Handler per base                                    │
//! └────────────────────────────┬──────────────────────────────────────┘
//!                              ▼ freeze()
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  Supervisor (runtime)                                             │
//! │  - one Watcher task per base (Latest | Every)                     │
//! │  - PhaseTracker (last phase + in-flight count per base)           │
//! │  - SubscriberSet (fans out to user subscribers)                   │
//! └──────┬──────────────────┬──────────────────┬───────────────┬──────┘
//!        ▼                  ▼                  ▼               │
//!     ┌──────────────┐   ┌──────────────┐   ┌──────────────┐   │
//!     │   Watcher    │   │   Watcher    │   │   Watcher    │   │
//!     │   (Every)    │   │   (Latest)   │   │   (Latest)   │   │
//!     └┬─────────────┘   └┬─────────────┘   └┬─────────────┘   │
//!      │ Handler publishes:                  │                 │
//!      │ - <BASE>_PENDING                    │                 │
//!      │ - <BASE>_SUCCESSFUL | <BASE>_FAILED │                 │
//!      ▼                  ▼                  ▼                 ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │   Bus: per-base request routes + broadcast ring for observers     │
//! │              (ring capacity: SupervisorConfig::bus_capacity)      │
//! └─────────────────────────────────┬─────────────────────────────────┘
//!                                   ▼
//!                       ┌────────────────────────┐
//!                       │  subscriber_listener   │
//!                       └───┬────────────────┬───┘
//!                           ▼                ▼
//!                    PhaseTracker     SubscriberSet
//!                                  ┌─────────┼─────────┐
//!                                  ▼         ▼         ▼
//!                              sub1.on   sub2.on   subN.on
//!                              _action() _action() _action()
//! ```
//!
//! ### Lifecycle of one request
//! ```text
//! dispatch(<BASE>_REQUESTED{payload})
//!   └─► route[base] ─► Watcher(base)
//!         ├─ Latest → cancel previous execution, advance generation
//!         ├─ Every  → no cancellation
//!         └─► Handler::execute(payload)
//!               ├─► publish <BASE>_PENDING
//!               ├─► operation(payload).await          (only suspension point)
//!               │     ├─ Ok(result) → publish <BASE>_SUCCESSFUL(result)
//!               │     └─ Err(error) → publish <BASE>_FAILED(normalize_error(error))
//!               └─ superseded / shutdown → nothing more is published
//! ```
//!
//! ## Features
//! | Area              | Description                                                       | Key types / traits                          |
//! |-------------------|-------------------------------------------------------------------|---------------------------------------------|
//! | **Actions**       | Typed `<BASE>_<PHASE>` actions and their JSON wire form.          | [`Action`], [`ActionType`], [`Phase`]       |
//! | **Operations**    | Async functions from payload to result or failure.                | [`Operation`], [`OperationFn`]              |
//! | **Registration**  | Per-base handlers with a concurrency mode.                        | [`Registry`], [`Handler`], [`ConcurrencyMode`] |
//! | **Supervision**   | Runs all watchers; dispatch, readiness, graceful shutdown.        | [`Supervisor`]                              |
//! | **Failures**      | Failure records merged from body and status.                      | [`normalize_error`], [`merge`]              |
//! | **Subscriber API**| Consume actions (stores, UI bridges, logging).                    | [`Subscribe`]                               |
//! | **Errors**        | Typed errors for registration, runtime and wire parsing.          | [`RegistryError`], [`RuntimeError`]         |
//! | **Configuration** | Centralize runtime settings.                                      | [`SupervisorConfig`]                        |
//!
//! ## Optional features
//! - `logging`: exports a simple built-in [`LogWriter`] writing actions through `tracing`.
//!
//! ## Example
//! ```rust
//! use serde_json::{Value, json};
//! use reqvisor::{Action, OperationError, OperationFn, Outcome, Registry, SupervisorConfig, bases};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let cfg = SupervisorConfig::default();
//!     let mut registry = Registry::new(&cfg);
//!
//!     let fetch_file = registry.register(
//!         OperationFn::arc(|_p: Value| async move {
//!             Ok::<_, OperationError>(json!({ "name": "a.txt" }))
//!         }),
//!         bases::FETCH_FILE,
//!     )?;
//!
//!     let mut rx = registry.bus().subscribe();
//!     let outcome = fetch_file
//!         .handle(&Action::requested(bases::FETCH_FILE, json!({ "id": 7 })))
//!         .await;
//!     assert_eq!(outcome, Outcome::Successful);
//!
//!     assert_eq!(rx.recv().await?.type_name(), "FETCH_FILE_PENDING");
//!     let done = rx.recv().await?;
//!     assert_eq!(done.type_name(), "FETCH_FILE_SUCCESSFUL");
//!     assert_eq!(done.payload, Some(json!({ "name": "a.txt" })));
//!     Ok(())
//! }
//! ```

mod actions;
pub mod bases;
mod core;
mod error;
mod normalize;
mod operations;
mod policies;
mod subscribers;

// ---- Public re-exports ----

pub use actions::{Action, ActionType, Bus, Phase};
pub use crate::core::{
    DirectInvoke, Handler, Invoke, InvokeRef, Outcome, PhaseTracker, Registry, Supervisor,
    SupervisorBuilder, SupervisorConfig, Watchers,
};
pub use error::{ActionError, OperationError, RegistryError, RuntimeError};
pub use normalize::{merge, normalize_error};
pub use operations::{BoxOperationFuture, Operation, OperationFn, OperationRef, Registration};
pub use policies::ConcurrencyMode;
pub use subscribers::{Subscribe, SubscriberSet};

// Optional: expose a simple built-in logger subscriber.
// Enable with: `--features logging`
#[cfg(feature = "logging")]
pub use subscribers::LogWriter;
