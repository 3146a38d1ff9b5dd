//! Trigger phases.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::EventError;

/// One of the three phases of an event. Ordered by firing order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    /// Runs first; triggers may suspend the event on a completion.
    Before,
    /// Runs once every before trigger has settled.
    During,
    /// Runs last.
    After,
}

impl Phase {
    /// All phases in firing order.
    pub const ALL: [Phase; 3] = [Self::Before, Self::During, Self::After];

    /// Wire name of the phase.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Before => "before",
            Self::During => "during",
            Self::After => "after",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Phase {
    type Err = EventError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "before" => Ok(Self::Before),
            "during" => Ok(Self::During),
            "after" => Ok(Self::After),
            other => Err(EventError::InvalidPhase(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_valid_names() {
        for phase in Phase::ALL {
            assert_eq!(phase.as_str().parse::<Phase>().unwrap(), phase);
        }
    }

    #[test]
    fn rejects_other_names() {
        assert_eq!(
            "xxx".parse::<Phase>(),
            Err(EventError::InvalidPhase("xxx".to_string()))
        );
        // Names are case-sensitive, like the reactor API they come from.
        assert!("Before".parse::<Phase>().is_err());
        assert!("".parse::<Phase>().is_err());
    }

    #[test]
    fn ordering_is_firing_order() {
        assert!(Phase::Before < Phase::During);
        assert!(Phase::During < Phase::After);
        let mut phases = vec![Phase::After, Phase::Before, Phase::During];
        phases.sort();
        assert_eq!(phases, Phase::ALL);
    }

    #[test]
    fn serde_lowercase() {
        assert_eq!(serde_json::to_string(&Phase::During).unwrap(), "\"during\"");
        let phase: Phase = serde_json::from_str("\"after\"").unwrap();
        assert_eq!(phase, Phase::After);
    }
}
