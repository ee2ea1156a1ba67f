//! # Core subscriber trait
//!
//! `Subscribe` is the extension point for consuming actions: a state store, a
//! UI bridge, metrics. Each subscriber is driven by a dedicated worker loop fed
//! by a bounded queue owned by the [`SubscriberSet`](crate::SubscriberSet).
//!
//! ## Contract
//! - Implementations may be slow; they do **not** block handlers nor other subscribers.
//! - Each subscriber **declares** its preferred queue capacity via
//!   [`Subscribe::queue_capacity`]. If a queue overflows, actions for that
//!   subscriber are **dropped** (warn).

use async_trait::async_trait;

use crate::actions::Action;

/// Contract for action subscribers.
///
/// Called from a subscriber-dedicated worker task. Implementations should avoid
/// blocking the async runtime.
///
/// # Example
/// ```rust
/// use async_trait::async_trait;
/// use reqvisor::{Action, Phase, Subscribe};
///
/// struct Loading;
///
/// #[async_trait]
/// impl Subscribe for Loading {
///     async fn on_action(&self, action: &Action) {
///         if action.phase() == Phase::Pending {
///             // show spinner for action.base()
///         }
///     }
///     fn name(&self) -> &'static str { "loading" }
/// }
/// ```
#[async_trait]
pub trait Subscribe: Send + Sync + 'static {
    /// Handle a single action.
    async fn on_action(&self, action: &Action);

    /// Human-readable name (for logs).
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Preferred capacity of this subscriber's queue.
    fn queue_capacity(&self) -> usize {
        1024
    }
}
