//! Policy for removing a trigger that already ran in the current cycle.

use serde::{Deserialize, Serialize};

/// What `remove_trigger` does when the handle names a before-phase trigger
/// that has already run in the before phase currently in progress.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FiredRemovalPolicy {
    /// Log a deprecation warning and remove the trigger.
    #[default]
    Warn,
    /// Refuse the removal with an `AlreadyFired` error.
    Reject,
}

impl FiredRemovalPolicy {
    /// Parse from a string (case-insensitive). Returns `None` if unknown.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "warn" | "warning" => Some(Self::Warn),
            "reject" | "error" => Some(Self::Reject),
            _ => None,
        }
    }
}

impl std::fmt::Display for FiredRemovalPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Warn => write!(f, "warn"),
            Self::Reject => write!(f, "reject"),
        }
    }
}
