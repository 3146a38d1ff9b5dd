//! Event error types.

use thiserror::Error;

/// Errors returned to callers of the registration and removal APIs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EventError {
    /// A phase name outside `before`/`during`/`after`.
    #[error("invalid phase: '{0}'")]
    InvalidPhase(String),

    /// The handle's trigger is not registered (never was, or already removed).
    #[error("trigger not found: {handle}")]
    TriggerNotFound {
        /// String form of the handle that was looked up.
        handle: String,
    },

    /// The value is not a trigger handle at all.
    #[error("malformed trigger handle: '{0}'")]
    MalformedHandle(String),

    /// Removal of a before trigger that already ran in the current cycle,
    /// refused under the `reject` policy.
    #[error("trigger {handle} already fired in the current before phase")]
    AlreadyFired {
        /// String form of the handle.
        handle: String,
    },

    /// A completion was settled more than once.
    #[error("completion already resolved")]
    AlreadyResolved,
}

/// Result type for event operations.
pub type Result<T> = std::result::Result<T, EventError>;

/// Failure reported by a trigger, or by the task settling its completion.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TriggerError {
    /// The trigger body failed.
    #[error("{0}")]
    Failed(String),

    /// The task driving a spawned completion panicked or was cancelled.
    #[error("completion task aborted: {0}")]
    Task(String),
}

impl TriggerError {
    /// Create a `Failed` error from any displayable message.
    #[must_use]
    pub fn failed(message: impl std::fmt::Display) -> Self {
        Self::Failed(message.to_string())
    }
}
