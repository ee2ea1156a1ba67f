//! # Action bus: request routes plus lifecycle broadcast.
//!
//! Every published [`Action`] goes out on one broadcast ring so that stores,
//! subscribers and tests observe the whole stream. `_REQUESTED` actions are
//! additionally routed to the watcher of their base through an unbounded
//! per-base queue, so a request burst larger than the ring never loses a
//! trigger.
//!
//! ## Architecture
//! ```text
//! publish(action)
//!   ├─ phase == Requested and a route exists for action.base()
//!   │     └──► route[base] (mpsc, unbounded) ──► Watcher(base)
//!   └──► broadcast ring (bounded) ──┬──► subscriber_listener ──► tracker + SubscriberSet
//!                                   └──► custom receivers (bus().subscribe())
//! ```
//!
//! ## Rules
//! - `publish()` never blocks.
//! - Routes are opened by the supervisor when its watchers start and closed when
//!   it stops; a request published while no route exists reaches the ring only.
//! - Ring receivers that fall more than `capacity` actions behind get
//!   `RecvError::Lagged(n)`; only observation is lossy, never request delivery.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::{broadcast, mpsc};
use tracing::debug;

use super::action::{Action, Phase};

type Routes = HashMap<Arc<str>, mpsc::UnboundedSender<Action>>;

/// Action bus shared by application code, handlers and watchers.
///
/// Cheap to clone; clones share the ring and the route table.
#[derive(Clone, Debug)]
pub struct Bus {
    tx: broadcast::Sender<Action>,
    routes: Arc<RwLock<Routes>>,
}

impl Bus {
    /// Creates a new bus whose broadcast ring holds `capacity` actions (minimum 1).
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel::<Action>(capacity.max(1));
        Self {
            tx,
            routes: Arc::default(),
        }
    }

    /// Publishes an action: routed to its watcher if it is a request, then broadcast.
    pub fn publish(&self, action: Action) {
        if action.phase() == Phase::Requested {
            if let Some(route) = self.routes.read().get(action.base()) {
                if route.send(action.clone()).is_err() {
                    debug!(base = action.base(), "request route closed");
                }
            }
        }
        let _ = self.tx.send(action);
    }

    /// Creates a receiver on the broadcast ring.
    ///
    /// A receiver only gets actions **sent after** it subscribes.
    pub fn subscribe(&self) -> broadcast::Receiver<Action> {
        self.tx.subscribe()
    }

    /// Opens the request route for `base`, replacing any previous one.
    pub(crate) fn open_route(&self, base: Arc<str>) -> mpsc::UnboundedReceiver<Action> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.routes.write().insert(base, tx);
        rx
    }

    /// Closes every request route; their watchers see the queue end once drained.
    pub(crate) fn close_routes(&self) {
        self.routes.write().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn requests_are_routed_beyond_ring_capacity() {
        let bus = Bus::new(2);
        let mut route = bus.open_route(Arc::from("FETCH_FILE"));
        let mut ring = bus.subscribe();

        for n in 0..10 {
            bus.publish(Action::requested("FETCH_FILE", json!({ "n": n })));
        }
        bus.publish(Action::requested("STOP_SCRAPE", json!({})));
        bus.publish(Action::pending("FETCH_FILE"));

        let mut routed = Vec::new();
        while let Ok(a) = route.try_recv() {
            routed.push(a.payload.unwrap()["n"].as_u64().unwrap());
        }
        assert_eq!(routed, (0..10).collect::<Vec<_>>());
        assert!(matches!(
            ring.try_recv(),
            Err(broadcast::error::TryRecvError::Lagged(_))
        ));
    }

    #[test]
    fn closed_routes_end_the_queue() {
        let bus = Bus::new(4);
        let mut route = bus.open_route(Arc::from("POLL_PROGRESS"));
        bus.publish(Action::requested("POLL_PROGRESS", json!(1)));
        bus.close_routes();
        bus.publish(Action::requested("POLL_PROGRESS", json!(2)));

        assert_eq!(route.try_recv().unwrap().payload, Some(json!(1)));
        assert!(matches!(
            route.try_recv(),
            Err(mpsc::error::TryRecvError::Disconnected)
        ));
    }
}
