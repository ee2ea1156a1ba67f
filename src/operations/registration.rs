//! # Registered operation.
//!
//! [`Registration`] is the immutable record created for every
//! `Registry::register*` call: base name and concurrency mode. The operation
//! itself lives in the [`Handler`](crate::Handler) paired with it. The frozen
//! set of registrations is what the supervisor turns into watchers.

use std::fmt;
use std::sync::Arc;

use crate::actions::{ActionType, Phase};
use crate::policies::ConcurrencyMode;

/// Base name and concurrency mode of one registered request type.
#[derive(Clone)]
pub struct Registration {
    base: Arc<str>,
    mode: ConcurrencyMode,
}

impl Registration {
    pub(crate) fn new(base: Arc<str>, mode: ConcurrencyMode) -> Self {
        Self { base, mode }
    }

    /// Base name.
    pub fn base(&self) -> &str {
        &self.base
    }

    pub(crate) fn base_arc(&self) -> &Arc<str> {
        &self.base
    }

    /// Concurrency mode applied by the watcher.
    pub fn mode(&self) -> ConcurrencyMode {
        self.mode
    }

    /// Type of the trigger action (`<base>_REQUESTED`).
    pub fn trigger(&self) -> ActionType {
        ActionType::new(Arc::clone(&self.base), Phase::Requested)
    }
}

impl fmt::Debug for Registration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registration")
            .field("base", &self.base)
            .field("mode", &self.mode)
            .finish()
    }
}
