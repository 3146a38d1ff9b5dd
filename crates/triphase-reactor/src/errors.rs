//! Reactor error types.

use thiserror::Error;
use triphase_events::EventError;

/// Errors from reactor lifecycle and trigger operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReactorError {
    /// `start_running` on a reactor that is already started.
    #[error("reactor already running")]
    AlreadyRunning,

    /// `start_running` on a reactor that has been stopped before.
    #[error("reactor cannot be restarted")]
    NotRestartable,

    /// `stop` on a reactor that is not running.
    #[error("can't stop reactor that isn't running")]
    NotRunning,

    /// Trigger registration or removal failed.
    #[error(transparent)]
    Event(#[from] EventError),
}

/// Result type for reactor operations.
pub type Result<T> = std::result::Result<T, ReactorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_errors_pass_through() {
        let err: ReactorError = EventError::InvalidPhase("xxx".into()).into();
        assert_eq!(err.to_string(), "invalid phase: 'xxx'");
        assert!(matches!(err, ReactorError::Event(EventError::InvalidPhase(_))));
    }

    #[test]
    fn lifecycle_messages() {
        assert_eq!(
            ReactorError::NotRunning.to_string(),
            "can't stop reactor that isn't running"
        );
        assert_eq!(
            ReactorError::NotRestartable.to_string(),
            "reactor cannot be restarted"
        );
    }
}
