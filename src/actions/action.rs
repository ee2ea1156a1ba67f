//! # Actions flowing through the bus.
//!
//! An [`Action`] is identified by its [`ActionType`]: a **base name** (the
//! logical request, e.g. `FETCH_FILE`) plus a [`Phase`]. On the wire the type
//! is the upper snake case string `<BASE>_<PHASE>`:
//!
//! ```text
//! FETCH_FILE_REQUESTED   (consumed: trigger, carries the request payload)
//! FETCH_FILE_PENDING     (produced: no payload)
//! FETCH_FILE_SUCCESSFUL  (produced: operation result)
//! FETCH_FILE_FAILED      (produced: normalized error record)
//! ```
//!
//! ## Ordering guarantees
//! Each action has a globally unique sequence number (`seq`) that increases
//! monotonically. Use `seq` to restore the exact order when actions are
//! delivered out of order.
//!
//! ## Example
//! ```rust
//! use serde_json::json;
//! use reqvisor::{Action, Phase};
//!
//! let act = Action::requested("FETCH_FILE", json!({"id": 7}));
//! assert_eq!(act.kind.phase, Phase::Requested);
//! assert_eq!(act.type_name(), "FETCH_FILE_REQUESTED");
//!
//! let wire = act.to_value();
//! let back = Action::from_value(&wire).unwrap();
//! assert_eq!(back.kind, act.kind);
//! ```

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::SystemTime;

use serde_json::{Map, Value};

use crate::error::ActionError;

/// Global sequence counter for action ordering.
static ACTION_SEQ: AtomicU64 = AtomicU64::new(0);

/// Lifecycle phase encoded in the action type suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Trigger dispatched by application code.
    Requested,
    /// Execution started; drives loading indicators.
    Pending,
    /// Operation resolved; payload is the result.
    Successful,
    /// Operation failed; payload is the normalized error record.
    Failed,
}

impl Phase {
    /// All phases in lifecycle order.
    pub const ALL: [Phase; 4] = [
        Phase::Requested,
        Phase::Pending,
        Phase::Successful,
        Phase::Failed,
    ];

    /// Wire suffix without the leading underscore.
    pub fn as_suffix(self) -> &'static str {
        match self {
            Phase::Requested => "REQUESTED",
            Phase::Pending => "PENDING",
            Phase::Successful => "SUCCESSFUL",
            Phase::Failed => "FAILED",
        }
    }

    /// True for `Successful` and `Failed`.
    #[inline]
    pub fn is_terminal(self) -> bool {
        matches!(self, Phase::Successful | Phase::Failed)
    }
}

/// Base name plus phase.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ActionType {
    /// Base name shared by the four derived types.
    pub base: Arc<str>,
    /// Lifecycle phase.
    pub phase: Phase,
}

impl ActionType {
    /// Creates the type `<base>_<phase>`.
    pub fn new(base: impl Into<Arc<str>>, phase: Phase) -> Self {
        Self {
            base: base.into(),
            phase,
        }
    }

    /// Splits a wire type string such as `FETCH_FILES_LIST_PENDING`.
    ///
    /// The phase is the longest known suffix; everything before the joining
    /// underscore is the base name, which must be non-empty.
    pub fn parse(raw: &str) -> Result<Self, ActionError> {
        for phase in Phase::ALL {
            let Some(prefix) = raw.strip_suffix(phase.as_suffix()) else {
                continue;
            };
            let Some(base) = prefix.strip_suffix('_') else {
                continue;
            };
            if base.is_empty() {
                return Err(ActionError::InvalidBase {
                    raw: raw.to_string(),
                });
            }
            return Ok(Self::new(base, phase));
        }
        Err(ActionError::UnknownPhase {
            raw: raw.to_string(),
        })
    }
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.base, self.phase.as_suffix())
    }
}

/// Action with optional payload.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - `payload`: request payload, result or error record depending on the phase
#[derive(Debug, Clone)]
pub struct Action {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Action classification.
    pub kind: ActionType,
    /// Opaque payload; absent on `Pending`.
    pub payload: Option<Value>,
}

impl Action {
    /// Creates a new action of the given type with current timestamp and next sequence number.
    pub fn new(kind: ActionType) -> Self {
        Self {
            seq: ACTION_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            payload: None,
        }
    }

    /// Attaches a payload.
    #[inline]
    pub fn with_payload(mut self, payload: Value) -> Self {
        self.payload = Some(payload);
        self
    }

    /// `<base>_REQUESTED` carrying the request payload.
    pub fn requested(base: impl Into<Arc<str>>, payload: Value) -> Self {
        Action::new(ActionType::new(base, Phase::Requested)).with_payload(payload)
    }

    /// `<base>_PENDING`, never carries a payload.
    pub fn pending(base: impl Into<Arc<str>>) -> Self {
        Action::new(ActionType::new(base, Phase::Pending))
    }

    /// `<base>_SUCCESSFUL` carrying the operation result.
    pub fn successful(base: impl Into<Arc<str>>, result: Value) -> Self {
        Action::new(ActionType::new(base, Phase::Successful)).with_payload(result)
    }

    /// `<base>_FAILED` carrying the normalized error record.
    pub fn failed(base: impl Into<Arc<str>>, record: Value) -> Self {
        Action::new(ActionType::new(base, Phase::Failed)).with_payload(record)
    }

    /// Wire type string, e.g. `FETCH_FILE_PENDING`.
    pub fn type_name(&self) -> String {
        self.kind.to_string()
    }

    /// Base name, e.g. `FETCH_FILE`.
    #[inline]
    pub fn base(&self) -> &str {
        &self.kind.base
    }

    /// Lifecycle phase of this action.
    #[inline]
    pub fn phase(&self) -> Phase {
        self.kind.phase
    }

    /// True if this action has the given base and phase.
    #[inline]
    pub fn is(&self, base: &str, phase: Phase) -> bool {
        self.kind.phase == phase && &*self.kind.base == base
    }

    /// Converts to the wire form `{"type": ..., "payload": ...}`.
    ///
    /// The `payload` key is omitted when there is no payload.
    pub fn to_value(&self) -> Value {
        let mut obj = Map::new();
        obj.insert("type".into(), Value::String(self.type_name()));
        if let Some(payload) = &self.payload {
            obj.insert("payload".into(), payload.clone());
        }
        Value::Object(obj)
    }

    /// Parses the wire form produced by [`Action::to_value`].
    ///
    /// A fresh `seq` and timestamp are assigned.
    pub fn from_value(value: &Value) -> Result<Self, ActionError> {
        let raw = value
            .get("type")
            .and_then(Value::as_str)
            .ok_or(ActionError::MissingType)?;
        let kind = ActionType::parse(raw)?;
        let mut action = Action::new(kind);
        action.payload = value.get("payload").cloned();
        Ok(action)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parse_splits_multi_word_base() {
        let kind = ActionType::parse("FETCH_FILES_LIST_SUCCESSFUL").unwrap();
        assert_eq!(&*kind.base, "FETCH_FILES_LIST");
        assert_eq!(kind.phase, Phase::Successful);
        assert_eq!(kind.to_string(), "FETCH_FILES_LIST_SUCCESSFUL");
    }

    #[test]
    fn parse_rejects_unknown_suffix() {
        let err = ActionType::parse("FETCH_FILE_CANCELLED").unwrap_err();
        assert_eq!(err.as_label(), "action_unknown_phase");
    }

    #[test]
    fn parse_rejects_missing_base() {
        assert!(matches!(
            ActionType::parse("_PENDING"),
            Err(ActionError::InvalidBase { .. })
        ));
        assert!(matches!(
            ActionType::parse("PENDING"),
            Err(ActionError::UnknownPhase { .. })
        ));
    }

    #[test]
    fn pending_wire_form_has_no_payload_key() {
        let v = Action::pending("STOP_SCRAPE").to_value();
        assert_eq!(v, json!({"type": "STOP_SCRAPE_PENDING"}));
    }

    #[test]
    fn from_value_reads_payload() {
        let act = Action::from_value(&json!({
            "type": "FETCH_FILE_REQUESTED",
            "payload": {"id": 7}
        }))
        .unwrap();
        assert!(act.is("FETCH_FILE", Phase::Requested));
        assert_eq!(act.payload, Some(json!({"id": 7})));
    }

    #[test]
    fn from_value_requires_type() {
        let err = Action::from_value(&json!({"payload": 1})).unwrap_err();
        assert!(matches!(err, ActionError::MissingType));
    }

    #[test]
    fn seq_is_monotonic() {
        let a = Action::pending("A");
        let b = Action::pending("A");
        assert!(b.seq > a.seq);
    }
}
