//! Error types used by the reqvisor runtime, registry and operations.
//!
//! - [`OperationError`] - failures thrown by registered operations (recovered by handlers).
//! - [`RegistryError`] - configuration errors detected while registering operations.
//! - [`RuntimeError`] - structural faults surfaced from [`Supervisor::run`](crate::Supervisor::run).
//! - [`ActionError`] - malformed wire actions.
//!
//! All of them provide `as_label` (stable snake_case label for logs/metrics).

use std::time::Duration;

use serde_json::Value;
use thiserror::Error;

/// # Failure returned by an operation.
///
/// Mirrors an HTTP client error: an optional response status and an optional
/// structured response body. Transport failures carry neither.
///
/// Handlers never propagate it; it becomes the payload of a `_FAILED` action
/// via [`normalize_error`](crate::normalize_error).
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{message}")]
pub struct OperationError {
    /// Response status, if a response was received.
    pub status: Option<u16>,
    /// Structured response body, if any.
    pub body: Option<Value>,
    /// Human-readable message (for logs only; not part of the normalized record).
    pub message: String,
}

impl OperationError {
    /// Failure with a response: status plus structured body.
    pub fn response(status: u16, body: Value) -> Self {
        Self {
            status: Some(status),
            body: Some(body),
            message: format!("request failed with status {status}"),
        }
    }

    /// Failure with a response status but no body.
    pub fn status(status: u16) -> Self {
        Self {
            status: Some(status),
            body: None,
            message: format!("request failed with status {status}"),
        }
    }

    /// Failure without any response (connection refused, DNS, ...).
    pub fn transport(message: impl Into<String>) -> Self {
        Self {
            status: None,
            body: None,
            message: message.into(),
        }
    }

    /// Returns a short stable label for logs.
    pub fn as_label(&self) -> &'static str {
        match (self.status, &self.body) {
            (None, None) => "operation_transport",
            (Some(_), None) => "operation_status",
            _ => "operation_response",
        }
    }
}

/// # Errors produced while registering operations.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// The base name is already registered; its action types would collide.
    #[error("base name {base:?} is already registered")]
    DuplicateBase {
        /// The colliding base name.
        base: String,
    },

    /// The base name is empty or not upper snake case.
    #[error("invalid base name {base:?}: expected upper snake case")]
    InvalidBase {
        /// The rejected base name.
        base: String,
    },
}

impl RegistryError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use reqvisor::RegistryError;
    ///
    /// let err = RegistryError::DuplicateBase { base: "FETCH_FILE".into() };
    /// assert_eq!(err.as_label(), "registry_duplicate_base");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            RegistryError::DuplicateBase { .. } => "registry_duplicate_base",
            RegistryError::InvalidBase { .. } => "registry_invalid_base",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            RegistryError::DuplicateBase { base } => format!("duplicate base: {base}"),
            RegistryError::InvalidBase { base } => format!("invalid base: {base:?}"),
        }
    }
}

/// # Errors produced by the supervisor runtime.
///
/// These represent failures in the orchestration system itself, never in
/// registered operations.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// A watcher task panicked.
    #[error("watcher for {base:?} panicked: {reason}")]
    WatcherPanicked {
        /// Base name the watcher served.
        base: String,
        /// Panic message, if recoverable.
        reason: String,
    },

    /// A watcher task returned while the runtime was still live.
    #[error("watcher for {base:?} exited unexpectedly: {reason}")]
    WatcherExited {
        /// Base name the watcher served.
        base: String,
        /// Why the watcher loop ended.
        reason: String,
    },

    /// Shutdown grace period was exceeded; some executions were still in flight.
    #[error("shutdown timeout {grace:?} exceeded; pending: {pending:?}")]
    GraceExceeded {
        /// The configured grace duration.
        grace: Duration,
        /// Bases whose last observed phase was still `Pending`.
        pending: Vec<String>,
    },

    /// [`Supervisor::run`](crate::Supervisor::run) was called more than once.
    #[error("supervisor is already running")]
    AlreadyRunning,
}

impl RuntimeError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use reqvisor::RuntimeError;
    /// use std::time::Duration;
    ///
    /// let err = RuntimeError::GraceExceeded { grace: Duration::from_secs(5), pending: vec![] };
    /// assert_eq!(err.as_label(), "runtime_grace_exceeded");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            RuntimeError::WatcherPanicked { .. } => "runtime_watcher_panicked",
            RuntimeError::WatcherExited { .. } => "runtime_watcher_exited",
            RuntimeError::GraceExceeded { .. } => "runtime_grace_exceeded",
            RuntimeError::AlreadyRunning => "runtime_already_running",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            RuntimeError::WatcherPanicked { base, reason } => format!("{base} panicked: {reason}"),
            RuntimeError::WatcherExited { base, reason } => format!("{base} exited: {reason}"),
            RuntimeError::GraceExceeded { grace, pending } => {
                format!("grace {grace:?} exceeded, pending: {}", pending.join(", "))
            }
            RuntimeError::AlreadyRunning => "already running".to_string(),
        }
    }

    /// True for faults that indicate a defect rather than an operational condition.
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            RuntimeError::WatcherPanicked { .. } | RuntimeError::WatcherExited { .. }
        )
    }
}

/// # Errors produced while parsing wire actions.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ActionError {
    /// The object has no string `type` field.
    #[error("action has no string \"type\" field")]
    MissingType,

    /// The type does not end in a known phase suffix.
    #[error("action type {raw:?} has no known phase suffix")]
    UnknownPhase {
        /// The raw type string.
        raw: String,
    },

    /// The type has a phase suffix but an empty base name.
    #[error("action type {raw:?} has an empty base name")]
    InvalidBase {
        /// The raw type string.
        raw: String,
    },
}

impl ActionError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            ActionError::MissingType => "action_missing_type",
            ActionError::UnknownPhase { .. } => "action_unknown_phase",
            ActionError::InvalidBase { .. } => "action_invalid_base",
        }
    }
}
