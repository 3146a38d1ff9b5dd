//! Dispatcher mapping event type names to their [`ThreePhaseEvent`].
//!
//! Events are created lazily on first registration and never share state:
//! firing `"shutdown"` has no effect on `"startup"`.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;
use triphase_core::FiredRemovalPolicy;

use crate::errors::{EventError, Result};
use crate::event::{FireOutcome, ThreePhaseEvent};
use crate::handle::SystemEventId;
use crate::phase::Phase;
use crate::trigger::Trigger;

/// Registry of system events keyed by event type.
///
/// Cloning yields another handle to the same registry.
#[derive(Clone, Default)]
pub struct SystemEvents {
    events: Arc<Mutex<HashMap<String, ThreePhaseEvent>>>,
    policy: FiredRemovalPolicy,
}

impl SystemEvents {
    /// Create an empty registry with the default removal policy.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty registry whose events use `policy`.
    #[must_use]
    pub fn with_policy(policy: FiredRemovalPolicy) -> Self {
        Self {
            events: Arc::default(),
            policy,
        }
    }

    /// Removal policy applied to every event created by this registry.
    #[must_use]
    pub fn policy(&self) -> FiredRemovalPolicy {
        self.policy
    }

    /// Register `trigger` for `phase` of `event_type`.
    ///
    /// The phase is validated before the event is created, so an invalid
    /// phase leaves the registry untouched.
    pub fn add_system_event_trigger<T>(
        &self,
        phase: &str,
        event_type: &str,
        trigger: T,
    ) -> Result<SystemEventId>
    where
        T: Trigger + 'static,
    {
        let phase: Phase = phase.parse()?;
        Ok(self.add(phase, event_type, trigger))
    }

    /// Typed variant of [`add_system_event_trigger`](Self::add_system_event_trigger).
    pub fn add<T>(&self, phase: Phase, event_type: &str, trigger: T) -> SystemEventId
    where
        T: Trigger + 'static,
    {
        let event = self.event_or_insert(event_type);
        SystemEventId::new(event_type, event.add(phase, trigger))
    }

    /// Remove a trigger previously added with
    /// [`add_system_event_trigger`](Self::add_system_event_trigger).
    pub fn remove_system_event_trigger(&self, id: &SystemEventId) -> Result<()> {
        match self.event(id.event_type()) {
            Some(event) => event.remove_trigger(id.handle()),
            None => Err(EventError::TriggerNotFound {
                handle: id.to_string(),
            }),
        }
    }

    /// Remove a trigger by the string form of its [`SystemEventId`].
    pub fn remove_system_event_trigger_token(&self, token: &str) -> Result<()> {
        let id: SystemEventId = token.parse()?;
        self.remove_system_event_trigger(&id)
    }

    /// Fire `event_type`. See [`ThreePhaseEvent::fire_event`].
    pub fn fire_system_event(&self, event_type: &str) -> FireOutcome {
        match self.event(event_type) {
            Some(event) => event.fire_event(),
            None => {
                debug!(event_type, "no triggers registered for system event");
                FireOutcome::NothingRegistered
            }
        }
    }

    /// The event for `event_type`, if any trigger was ever registered for it.
    #[must_use]
    pub fn event(&self, event_type: &str) -> Option<ThreePhaseEvent> {
        self.events.lock().get(event_type).cloned()
    }

    /// Every known event type, sorted.
    #[must_use]
    pub fn event_types(&self) -> Vec<String> {
        let mut types: Vec<String> = self.events.lock().keys().cloned().collect();
        types.sort();
        types
    }

    /// Drop every event and its triggers.
    pub fn reset(&self) {
        self.events.lock().clear();
    }

    fn event_or_insert(&self, event_type: &str) -> ThreePhaseEvent {
        self.events
            .lock()
            .entry(event_type.to_string())
            .or_insert_with(|| ThreePhaseEvent::with_policy(event_type, self.policy))
            .clone()
    }
}

impl std::fmt::Debug for SystemEvents {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SystemEvents")
            .field("event_types", &self.event_types())
            .field("policy", &self.policy)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trigger::TriggerFn;
    use assert_matches::assert_matches;

    fn noop() -> impl Trigger + 'static {
        TriggerFn::simple(|| {})
    }

    #[test]
    fn events_are_created_on_first_add() {
        let events = SystemEvents::new();
        assert!(events.event("test").is_none());
        let _ = events.add_system_event_trigger("before", "test", noop()).unwrap();
        let event = events.event("test").unwrap();
        assert_eq!(event.event_type(), "test");
        assert_eq!(event.len(), 1);
    }

    #[test]
    fn invalid_phase_creates_nothing() {
        let events = SystemEvents::new();
        assert_matches!(
            events.add_system_event_trigger("xxx", "test", noop()),
            Err(EventError::InvalidPhase(_))
        );
        assert!(events.event_types().is_empty());
    }

    #[test]
    fn id_carries_event_type() {
        let events = SystemEvents::new();
        let id = events.add(Phase::After, "shutdown", noop());
        assert_eq!(id.event_type(), "shutdown");
        assert_eq!(id.handle().phase(), Phase::After);
    }

    #[test]
    fn remove_from_unknown_event_is_not_found() {
        let events = SystemEvents::new();
        let id = events.add(Phase::During, "startup", noop());
        events.reset();
        assert_matches!(
            events.remove_system_event_trigger(&id),
            Err(EventError::TriggerNotFound { .. })
        );
    }

    #[test]
    fn fire_unknown_event_reports_nothing_registered() {
        let events = SystemEvents::new();
        assert_eq!(
            events.fire_system_event("never"),
            FireOutcome::NothingRegistered
        );
    }

    #[test]
    fn policy_propagates_to_events() {
        let events = SystemEvents::with_policy(FiredRemovalPolicy::Reject);
        let _ = events.add(Phase::Before, "shutdown", noop());
        assert_eq!(
            events.event("shutdown").unwrap().policy(),
            FiredRemovalPolicy::Reject
        );
    }

    #[test]
    fn event_types_sorted() {
        let events = SystemEvents::new();
        let _ = events.add(Phase::Before, "shutdown", noop());
        let _ = events.add(Phase::Before, "startup", noop());
        let _ = events.add(Phase::After, "reload", noop());
        assert_eq!(events.event_types(), vec!["reload", "shutdown", "startup"]);
    }

    #[test]
    fn clones_share_registry() {
        let events = SystemEvents::new();
        let other = events.clone();
        let _ = other.add(Phase::During, "test", noop());
        assert_eq!(events.event_types(), vec!["test"]);
    }
}
