//! # Concurrency policy for overlapping requests on one base name.
//!
//! A watcher applies its [`ConcurrencyMode`] each time a `<BASE>_REQUESTED`
//! action arrives while a previous execution may still be in flight.
//!
//! ```text
//! ConcurrencyMode::Latest   → cancel the in-flight execution, start the new one (default)
//! ConcurrencyMode::Every    → start the new execution alongside the running ones
//! ```
//!
//! ## Choosing the right policy
//! - `Latest` when a new request invalidates the previous one
//!   (polling progress, fetching the current file list).
//! - `Every` when the resource legitimately supports overlapping requests
//!   (fetching several distinct files).

/// Policy controlling how a new request is admitted while others are in flight.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ConcurrencyMode {
    /// Cancel the in-flight execution for this base, then start the new one.
    ///
    /// A cancelled execution emits nothing further, not even if its operation
    /// would have resolved.
    #[default]
    Latest,

    /// Start every request concurrently; no cancellation.
    ///
    /// Terminal actions of overlapping executions may interleave in any order.
    Every,
}

impl ConcurrencyMode {
    /// Returns a short stable label for logs.
    pub fn as_label(self) -> &'static str {
        match self {
            ConcurrencyMode::Latest => "latest",
            ConcurrencyMode::Every => "every",
        }
    }

    /// True if new requests supersede in-flight ones.
    #[inline]
    pub fn cancels_previous(self) -> bool {
        matches!(self, ConcurrencyMode::Latest)
    }
}
