//! # Registry - registration context for operations.
//!
//! The registry is the startup phase of the runtime. Every
//! [`register`](Registry::register) call validates the base name, builds the
//! [`Handler`] for it and records the [`Registration`] its watcher will be
//! built from. [`freeze`](Registry::freeze) ends the phase: the resulting
//! [`Watchers`] set is read-only and is handed to the supervisor builder.
//!
//! ## Lifecycle
//! ```text
//! Registry::new(&cfg)
//!   ├─► register(op, "START_SCRAPE")             → Handler   (mode = cfg.default_mode)
//!   ├─► register_with_mode(op, "FETCH_FILE", Every) → Handler
//!   └─► freeze() → Watchers ──► Supervisor::builder(cfg).build(watchers) ──► run()
//! ```
//!
//! ## Rules
//! - Base names are unique; a duplicate is rejected with [`RegistryError::DuplicateBase`].
//! - Base names are upper snake case (`[A-Z0-9_]`, starting with a letter, no
//!   leading/trailing/double underscore).
//! - No registration is possible after `freeze()` (enforced by ownership).

use std::collections::HashSet;
use std::sync::Arc;

use tracing::debug;

use crate::{
    actions::Bus,
    core::{
        config::SupervisorConfig,
        handler::Handler,
        invoke::{DirectInvoke, InvokeRef},
    },
    error::RegistryError,
    operations::{OperationRef, Registration},
    policies::ConcurrencyMode,
};

/// Mutable registration context; see the module docs.
pub struct Registry {
    bus: Bus,
    invoker: InvokeRef,
    default_mode: ConcurrencyMode,
    bases: HashSet<Arc<str>>,
    entries: Vec<(Registration, Handler)>,
}

impl Registry {
    /// Creates a registry with its own bus; operations are called directly.
    pub fn new(cfg: &SupervisorConfig) -> Self {
        Self::with_invoker(cfg, Arc::new(DirectInvoke))
    }

    /// Creates a registry whose handlers call operations through `invoker`.
    pub fn with_invoker(cfg: &SupervisorConfig, invoker: InvokeRef) -> Self {
        Self {
            bus: Bus::new(cfg.bus_capacity_clamped()),
            invoker,
            default_mode: cfg.default_mode,
            bases: HashSet::new(),
            entries: Vec::new(),
        }
    }

    /// Bus the handlers publish on; subscribe here to observe direct handler calls.
    pub fn bus(&self) -> &Bus {
        &self.bus
    }

    /// Registers `operation` under `base` with the configured default mode.
    pub fn register(&mut self, operation: OperationRef, base: &str) -> Result<Handler, RegistryError> {
        let mode = self.default_mode;
        self.register_with_mode(operation, base, mode)
    }

    /// Registers `operation` under `base` with an explicit concurrency mode.
    pub fn register_with_mode(
        &mut self,
        operation: OperationRef,
        base: &str,
        mode: ConcurrencyMode,
    ) -> Result<Handler, RegistryError> {
        validate_base(base)?;
        if self.bases.contains(base) {
            return Err(RegistryError::DuplicateBase {
                base: base.to_string(),
            });
        }

        let base: Arc<str> = Arc::from(base);
        let handler = Handler::new(
            Arc::clone(&base),
            operation,
            self.bus.clone(),
            Arc::clone(&self.invoker),
        );
        let registration = Registration::new(Arc::clone(&base), mode);

        debug!(base = %base, mode = mode.as_label(), "operation registered");
        self.bases.insert(base);
        self.entries.push((registration, handler.clone()));
        Ok(handler)
    }

    /// Number of registrations.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Ends the registration phase.
    pub fn freeze(self) -> Watchers {
        Watchers {
            bus: self.bus,
            entries: self.entries,
        }
    }
}

/// Frozen set of registrations, consumed once by [`Supervisor::run`](crate::Supervisor::run).
pub struct Watchers {
    pub(crate) bus: Bus,
    pub(crate) entries: Vec<(Registration, Handler)>,
}

impl Watchers {
    /// Registrations in registration order.
    pub fn registrations(&self) -> impl Iterator<Item = &Registration> {
        self.entries.iter().map(|(r, _)| r)
    }

    /// Number of watchers.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if there are no watchers.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Checks that `base` is upper snake case.
fn validate_base(base: &str) -> Result<(), RegistryError> {
    let starts_with_letter = base.chars().next().is_some_and(|c| c.is_ascii_uppercase());
    let charset_ok = base
        .chars()
        .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_');
    let underscores_ok = !base.ends_with('_') && !base.contains("__");

    if starts_with_letter && charset_ok && underscores_ok {
        Ok(())
    } else {
        Err(RegistryError::InvalidBase {
            base: base.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::OperationError;
    use crate::operations::OperationFn;
    use serde_json::Value;

    fn noop() -> OperationRef {
        OperationFn::arc(|p: Value| async move { Ok::<_, OperationError>(p) })
    }

    #[test]
    fn duplicate_base_is_rejected() {
        let mut registry = Registry::new(&SupervisorConfig::default());
        registry.register(noop(), "FETCH_FILE").unwrap();

        let err = registry
            .register_with_mode(noop(), "FETCH_FILE", ConcurrencyMode::Every)
            .unwrap_err();
        assert_eq!(
            err,
            RegistryError::DuplicateBase {
                base: "FETCH_FILE".into()
            }
        );
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn invalid_bases_are_rejected() {
        let mut registry = Registry::new(&SupervisorConfig::default());
        for bad in ["", "fetch_file", "_FETCH", "FETCH_", "FETCH__FILE", "1FETCH", "FETCH-FILE"] {
            assert!(
                matches!(
                    registry.register(noop(), bad),
                    Err(RegistryError::InvalidBase { .. })
                ),
                "{bad:?} should be rejected"
            );
        }
        assert!(registry.is_empty());
    }

    #[test]
    fn default_mode_comes_from_config() {
        let cfg = SupervisorConfig {
            default_mode: ConcurrencyMode::Every,
            ..SupervisorConfig::default()
        };
        let mut registry = Registry::new(&cfg);
        registry.register(noop(), "START_SCRAPE").unwrap();
        registry
            .register_with_mode(noop(), "POLL_PROGRESS", ConcurrencyMode::Latest)
            .unwrap();

        let watchers = registry.freeze();
        let modes: Vec<_> = watchers
            .registrations()
            .map(|r| (r.base().to_string(), r.mode()))
            .collect();
        assert_eq!(
            modes,
            vec![
                ("START_SCRAPE".to_string(), ConcurrencyMode::Every),
                ("POLL_PROGRESS".to_string(), ConcurrencyMode::Latest),
            ]
        );
    }

    #[test]
    fn handler_is_bound_to_its_base() {
        let mut registry = Registry::new(&SupervisorConfig::default());
        let handler = registry.register(noop(), "FETCH_FILES_LIST").unwrap();
        assert_eq!(handler.base(), "FETCH_FILES_LIST");
    }
}
