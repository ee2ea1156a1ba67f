use std::sync::Arc;

use crate::subscribers::{Subscribe, SubscriberSet};

use super::{config::SupervisorConfig, registry::Watchers, supervisor::Supervisor};

/// Builder for constructing a [`Supervisor`] from a frozen set of watchers.
pub struct SupervisorBuilder {
    cfg: SupervisorConfig,
    subscribers: Vec<Arc<dyn Subscribe>>,
}

impl SupervisorBuilder {
    /// Creates a new builder with the given configuration.
    pub fn new(cfg: SupervisorConfig) -> Self {
        Self {
            cfg,
            subscribers: Vec::new(),
        }
    }

    /// Sets action subscribers.
    ///
    /// Subscribers receive every action published on the bus (requests and
    /// lifecycle actions) through dedicated workers with bounded queues.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Builds the supervisor around `watchers`.
    ///
    /// The supervisor shares the bus the watchers' handlers publish on.
    /// Must be called inside a tokio runtime (subscriber workers are spawned here).
    pub fn build(self, watchers: Watchers) -> Arc<Supervisor> {
        let subs = Arc::new(SubscriberSet::new(self.subscribers));
        Arc::new(Supervisor::new_internal(self.cfg, subs, watchers))
    }
}
