//! Opaque handles returned by trigger registration.
//!
//! Handles compare by value: `(phase, trigger id)` for [`TriggerHandle`] and
//! `(event type, handle)` for [`SystemEventId`]. Both have a string form so
//! outer layers (RPC, config) can carry them; parsing that form is where the
//! malformed-handle and invalid-phase errors originate.
//!
//! | handle | string form |
//! |---|---|
//! | `TriggerHandle` | `before:<trigger-id>` |
//! | `SystemEventId` | `before:<trigger-id>@shutdown` |

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use triphase_core::TriggerId;

use crate::errors::EventError;
use crate::phase::Phase;

/// Identifies one registered trigger within one event.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TriggerHandle {
    phase: Phase,
    id: TriggerId,
}

impl TriggerHandle {
    /// Build a handle from its parts.
    #[must_use]
    pub fn new(phase: Phase, id: TriggerId) -> Self {
        Self { phase, id }
    }

    /// Phase the trigger was registered for.
    #[must_use]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Identity of the registration.
    #[must_use]
    pub fn id(&self) -> &TriggerId {
        &self.id
    }
}

impl fmt::Display for TriggerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.phase, self.id)
    }
}

impl FromStr for TriggerHandle {
    type Err = EventError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (phase, id) = s
            .split_once(':')
            .ok_or_else(|| EventError::MalformedHandle(s.to_string()))?;
        if id.is_empty() || id.contains([':', '@']) {
            return Err(EventError::MalformedHandle(s.to_string()));
        }
        Ok(Self {
            phase: phase.parse()?,
            id: TriggerId::from(id),
        })
    }
}

impl TryFrom<String> for TriggerHandle {
    type Error = EventError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TriggerHandle> for String {
    fn from(handle: TriggerHandle) -> Self {
        handle.to_string()
    }
}

/// Identifies one registered trigger across all event types.
///
/// Returned by [`SystemEvents`](crate::SystemEvents); carries the event type
/// so removal needs nothing else.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SystemEventId {
    event_type: String,
    handle: TriggerHandle,
}

impl SystemEventId {
    /// Build an id from its parts.
    #[must_use]
    pub fn new(event_type: impl Into<String>, handle: TriggerHandle) -> Self {
        Self {
            event_type: event_type.into(),
            handle,
        }
    }

    /// Event type the trigger belongs to.
    #[must_use]
    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    /// Handle within that event.
    #[must_use]
    pub fn handle(&self) -> &TriggerHandle {
        &self.handle
    }
}

impl fmt::Display for SystemEventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.handle, self.event_type)
    }
}

impl FromStr for SystemEventId {
    type Err = EventError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (handle, event_type) = s
            .split_once('@')
            .ok_or_else(|| EventError::MalformedHandle(s.to_string()))?;
        if event_type.is_empty() {
            return Err(EventError::MalformedHandle(s.to_string()));
        }
        Ok(Self {
            event_type: event_type.to_string(),
            handle: handle.parse()?,
        })
    }
}

impl TryFrom<String> for SystemEventId {
    type Error = EventError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<SystemEventId> for String {
    fn from(id: SystemEventId) -> Self {
        id.to_string()
    }
}
