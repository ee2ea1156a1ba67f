//! # LogWriter - action logger
//!
//! A minimal subscriber that writes every [`Action`] through `tracing`.
//!
//! ## Example output (fmt subscriber)
//! ```text
//! INFO reqvisor::subscribers::log: requested action="FETCH_FILE_REQUESTED" seq=3
//! INFO reqvisor::subscribers::log: pending action="FETCH_FILE_PENDING" seq=4
//! INFO reqvisor::subscribers::log: successful action="FETCH_FILE_SUCCESSFUL" seq=5
//! WARN reqvisor::subscribers::log: failed action="FETCH_FILE_FAILED" seq=9 payload={"statusCode":404}
//! ```

use async_trait::async_trait;
use tracing::{info, warn};

use crate::actions::{Action, Phase};
use crate::subscribers::Subscribe;

/// Action writer subscriber.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    /// Construct a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_action(&self, a: &Action) {
        let kind = a.kind.to_string();
        match a.phase() {
            Phase::Requested => info!(action = %kind, seq = a.seq, "requested"),
            Phase::Pending => info!(action = %kind, seq = a.seq, "pending"),
            Phase::Successful => info!(action = %kind, seq = a.seq, "successful"),
            Phase::Failed => {
                let payload = a
                    .payload
                    .as_ref()
                    .map(|p| p.to_string())
                    .unwrap_or_default();
                warn!(action = %kind, seq = a.seq, %payload, "failed");
            }
        }
    }

    fn name(&self) -> &'static str {
        "LogWriter"
    }
}
