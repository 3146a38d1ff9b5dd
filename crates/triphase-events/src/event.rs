//! Three-phase event: trigger registry plus firing state machine.
//!
//! A [`ThreePhaseEvent`] tracks the triggers of every phase of one event
//! type. [`fire_event`](ThreePhaseEvent::fire_event) runs one firing cycle:
//!
//! 1. **Before**: every before trigger runs, in registration order. Triggers
//!    returning [`TriggerOutcome::Pending`] are gathered; the cycle suspends
//!    until all of their completions have settled.
//! 2. The state returns to [`FiringState::Base`] and `finished_before` is
//!    emptied, strictly before the first during trigger runs.
//! 3. **During**, then **after**: every trigger runs in registration order.
//!
//! Phase lists are iterated live: a trigger added to a phase that has not
//! finished yet runs in the same cycle, and a trigger removed before its turn
//! never runs. Triggers stay registered across cycles.
//!
//! The internal lock is never held while a trigger or continuation runs, so
//! triggers may freely add and remove triggers of the same event.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;
use tracing::{debug, error, info_span, warn};
use triphase_core::{CycleId, FiredRemovalPolicy, TriggerId};

use crate::completion::Completion;
use crate::errors::{EventError, Result};
use crate::handle::TriggerHandle;
use crate::phase::Phase;
use crate::trigger::{Trigger, TriggerOutcome};

/// Where an event is in its firing cycle, as observable by triggers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FiringState {
    /// Not firing, or past the before phase.
    Base,
    /// Running the before phase, possibly suspended on completions.
    Before,
}

/// What a call to `fire_event` did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FireOutcome {
    /// All three phases ran to the end.
    Completed,
    /// The before phase is waiting on this many completions; the during and
    /// after phases run when the last one settles.
    Suspended {
        /// Completions still unsettled when the before phase finished.
        pending: usize,
    },
    /// A cycle of this event was already in progress; nothing ran.
    AlreadyFiring,
    /// No trigger was ever registered for the event type.
    NothingRegistered,
}

#[derive(Clone)]
struct Entry {
    id: TriggerId,
    trigger: Arc<dyn Trigger>,
}

struct Registry {
    before: Vec<Entry>,
    during: Vec<Entry>,
    after: Vec<Entry>,
    finished_before: Vec<TriggerId>,
    state: FiringState,
    /// Set from the start of `fire_event` until the last after trigger ran.
    cycle: Option<CycleId>,
}

impl Registry {
    fn new() -> Self {
        Self {
            before: Vec::new(),
            during: Vec::new(),
            after: Vec::new(),
            finished_before: Vec::new(),
            state: FiringState::Base,
            cycle: None,
        }
    }

    fn list(&self, phase: Phase) -> &Vec<Entry> {
        match phase {
            Phase::Before => &self.before,
            Phase::During => &self.during,
            Phase::After => &self.after,
        }
    }

    fn list_mut(&mut self, phase: Phase) -> &mut Vec<Entry> {
        match phase {
            Phase::Before => &mut self.before,
            Phase::During => &mut self.during,
            Phase::After => &mut self.after,
        }
    }

    /// Remove the entry with `id` from `phase`, returning whether it existed.
    fn take(&mut self, phase: Phase, id: &TriggerId) -> bool {
        let list = self.list_mut(phase);
        match list.iter().position(|e| &e.id == id) {
            Some(index) => {
                let _ = list.remove(index);
                true
            }
            None => false,
        }
    }
}

struct Inner {
    event_type: String,
    policy: FiredRemovalPolicy,
    registry: Mutex<Registry>,
}

/// The triggers of every phase of one event type, and the machinery that
/// fires them.
///
/// Cloning yields another handle to the same event.
#[derive(Clone)]
pub struct ThreePhaseEvent {
    inner: Arc<Inner>,
}

impl ThreePhaseEvent {
    /// Create an unnamed event with the default removal policy.
    #[must_use]
    pub fn new() -> Self {
        Self::named("")
    }

    /// Create an event whose log records carry `event_type`.
    #[must_use]
    pub fn named(event_type: impl Into<String>) -> Self {
        Self::with_policy(event_type, FiredRemovalPolicy::default())
    }

    /// Create a named event with an explicit already-fired removal policy.
    #[must_use]
    pub fn with_policy(event_type: impl Into<String>, policy: FiredRemovalPolicy) -> Self {
        Self {
            inner: Arc::new(Inner {
                event_type: event_type.into(),
                policy,
                registry: Mutex::new(Registry::new()),
            }),
        }
    }

    /// Event type name used in log records.
    #[must_use]
    pub fn event_type(&self) -> &str {
        &self.inner.event_type
    }

    /// Removal policy for already-fired before triggers.
    #[must_use]
    pub fn policy(&self) -> FiredRemovalPolicy {
        self.inner.policy
    }

    // ── Registration ────────────────────────────────────────────────

    /// Register `trigger` for `phase`.
    pub fn add<T>(&self, phase: Phase, trigger: T) -> TriggerHandle
    where
        T: Trigger + 'static,
    {
        self.add_shared(phase, Arc::new(trigger))
    }

    /// Register an already shared trigger for `phase`.
    ///
    /// The same `Arc` may be registered many times; every registration is a
    /// separate trigger with its own handle.
    pub fn add_shared(&self, phase: Phase, trigger: Arc<dyn Trigger>) -> TriggerHandle {
        let id = TriggerId::new();
        debug!(
            event_type = %self.inner.event_type,
            %phase,
            trigger = trigger.name(),
            trigger_id = %id,
            "adding system event trigger"
        );
        self.inner.registry.lock().list_mut(phase).push(Entry {
            id: id.clone(),
            trigger,
        });
        TriggerHandle::new(phase, id)
    }

    /// Register `trigger` for the phase named `phase`.
    ///
    /// Fails with [`EventError::InvalidPhase`] before touching any state if
    /// the name is not `before`, `during` or `after`.
    pub fn add_trigger<T>(&self, phase: &str, trigger: T) -> Result<TriggerHandle>
    where
        T: Trigger + 'static,
    {
        let phase: Phase = phase.parse()?;
        Ok(self.add(phase, trigger))
    }

    /// Remove the trigger identified by `handle`.
    ///
    /// - Pending (not yet run in this cycle): removed silently.
    /// - A before trigger that already ran in the before phase in progress:
    ///   removed with a deprecation warning under
    ///   [`FiredRemovalPolicy::Warn`], refused with
    ///   [`EventError::AlreadyFired`] under [`FiredRemovalPolicy::Reject`].
    /// - Unknown or already removed: [`EventError::TriggerNotFound`].
    pub fn remove_trigger(&self, handle: &TriggerHandle) -> Result<()> {
        let phase = handle.phase();
        let id = handle.id();
        let mut registry = self.inner.registry.lock();

        let already_fired = registry.state == FiringState::Before
            && phase == Phase::Before
            && registry.finished_before.contains(id);

        if already_fired {
            if self.inner.policy == FiredRemovalPolicy::Reject {
                return Err(EventError::AlreadyFired {
                    handle: handle.to_string(),
                });
            }
            registry.finished_before.retain(|done| done != id);
            let _ = registry.take(phase, id);
            drop(registry);
            warn!(
                event_type = %self.inner.event_type,
                trigger_id = %id,
                "Removing already-fired system event triggers will raise an exception in a future version"
            );
            return Ok(());
        }

        if registry.take(phase, id) {
            drop(registry);
            debug!(event_type = %self.inner.event_type, %phase, trigger_id = %id, "removed system event trigger");
            Ok(())
        } else {
            Err(EventError::TriggerNotFound {
                handle: handle.to_string(),
            })
        }
    }

    /// Remove the trigger whose handle has the given string form.
    ///
    /// Unparseable input is [`EventError::MalformedHandle`]; a well-formed
    /// handle naming an unknown phase is [`EventError::InvalidPhase`].
    pub fn remove_trigger_token(&self, token: &str) -> Result<()> {
        let handle: TriggerHandle = token.parse()?;
        self.remove_trigger(&handle)
    }

    // ── Inspection ──────────────────────────────────────────────────

    /// Current firing state.
    #[must_use]
    pub fn state(&self) -> FiringState {
        self.inner.registry.lock().state
    }

    /// Whether a firing cycle is in progress (including a suspended one).
    #[must_use]
    pub fn is_firing(&self) -> bool {
        self.inner.registry.lock().cycle.is_some()
    }

    /// Handles of the before triggers that already ran in the before phase
    /// in progress. Empty outside the before phase.
    #[must_use]
    pub fn finished_before(&self) -> Vec<TriggerHandle> {
        self.inner
            .registry
            .lock()
            .finished_before
            .iter()
            .map(|id| TriggerHandle::new(Phase::Before, id.clone()))
            .collect()
    }

    /// Handles registered for `phase`, in firing order.
    #[must_use]
    pub fn handles(&self, phase: Phase) -> Vec<TriggerHandle> {
        self.inner
            .registry
            .lock()
            .list(phase)
            .iter()
            .map(|e| TriggerHandle::new(phase, e.id.clone()))
            .collect()
    }

    /// Total number of registered triggers across all phases.
    #[must_use]
    pub fn len(&self) -> usize {
        let registry = self.inner.registry.lock();
        Phase::ALL.iter().map(|p| registry.list(*p).len()).sum()
    }

    /// Whether no trigger is registered in any phase.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // ── Firing ──────────────────────────────────────────────────────

    /// Run one firing cycle.
    ///
    /// Trigger errors and panics are logged and never returned. If a cycle
    /// is already in progress this is a no-op returning
    /// [`FireOutcome::AlreadyFiring`].
    pub fn fire_event(&self) -> FireOutcome {
        let cycle = {
            let mut registry = self.inner.registry.lock();
            if let Some(active) = &registry.cycle {
                debug!(
                    event_type = %self.inner.event_type,
                    cycle_id = %active,
                    "system event already firing, ignoring"
                );
                return FireOutcome::AlreadyFiring;
            }
            let cycle = CycleId::new();
            registry.cycle = Some(cycle.clone());
            registry.state = FiringState::Before;
            registry.finished_before.clear();
            cycle
        };

        let span = info_span!("system_event", event_type = %self.inner.event_type, cycle_id = %cycle);
        let _enter = span.enter();

        let mut pending = Vec::new();
        while let Some(entry) = self.next_before() {
            if let Some(completion) = self.invoke(Phase::Before, &entry) {
                pending.push(completion);
            }
        }

        let unsettled = pending.iter().filter(|c| !c.is_settled()).count();
        if unsettled > 0 {
            debug!(unsettled, "before phase suspended on completions");
        }
        self.gather(pending, cycle);

        if unsettled == 0 {
            FireOutcome::Completed
        } else {
            FireOutcome::Suspended {
                pending: unsettled,
            }
        }
    }

    /// Take the first before trigger not yet run in this cycle, recording
    /// it as finished before it runs.
    fn next_before(&self) -> Option<Entry> {
        let mut registry = self.inner.registry.lock();
        let entry = registry
            .before
            .iter()
            .find(|e| !registry.finished_before.contains(&e.id))
            .cloned()?;
        registry.finished_before.push(entry.id.clone());
        Some(entry)
    }

    /// Take the first trigger of `phase` whose id is not in `ran`.
    fn next_pending(&self, phase: Phase, ran: &[TriggerId]) -> Option<Entry> {
        self.inner
            .registry
            .lock()
            .list(phase)
            .iter()
            .find(|e| !ran.contains(&e.id))
            .cloned()
    }

    /// Continue the cycle once every completion has settled.
    fn gather(&self, pending: Vec<Completion>, cycle: CycleId) {
        if pending.is_empty() {
            self.continue_firing(&cycle);
            return;
        }

        let remaining = Arc::new(AtomicUsize::new(pending.len()));
        for completion in pending {
            let event = self.clone();
            let remaining = Arc::clone(&remaining);
            let cycle = cycle.clone();
            completion.on_settle(move |result| {
                if let Err(err) = result {
                    error!(
                        event_type = %event.inner.event_type,
                        cycle_id = %cycle,
                        error = %err,
                        "before trigger completion failed"
                    );
                }
                if remaining.fetch_sub(1, Ordering::AcqRel) == 1 {
                    event.continue_firing(&cycle);
                }
            });
        }
    }

    /// Run the during and after phases and close the cycle.
    fn continue_firing(&self, cycle: &CycleId) {
        {
            let mut registry = self.inner.registry.lock();
            registry.state = FiringState::Base;
            registry.finished_before.clear();
        }

        let span = info_span!("system_event", event_type = %self.inner.event_type, cycle_id = %cycle);
        let _enter = span.enter();

        for phase in [Phase::During, Phase::After] {
            let mut ran = Vec::new();
            while let Some(entry) = self.next_pending(phase, &ran) {
                ran.push(entry.id.clone());
                if self.invoke(phase, &entry).is_some() {
                    debug!(%phase, trigger = entry.trigger.name(), "ignoring completion outside the before phase");
                }
            }
        }

        self.inner.registry.lock().cycle = None;
        debug!("system event cycle finished");
    }

    /// Run one trigger, logging any failure. Returns the completion of a
    /// trigger that reported `Pending`.
    fn invoke(&self, phase: Phase, entry: &Entry) -> Option<Completion> {
        let trigger = &entry.trigger;
        match panic::catch_unwind(AssertUnwindSafe(|| trigger.fire())) {
            Ok(Ok(TriggerOutcome::Immediate)) => None,
            Ok(Ok(TriggerOutcome::Pending(completion))) => Some(completion),
            Ok(Err(err)) => {
                error!(
                    event_type = %self.inner.event_type,
                    %phase,
                    trigger = trigger.name(),
                    trigger_id = %entry.id,
                    error = %err,
                    "system event trigger failed"
                );
                None
            }
            Err(payload) => {
                error!(
                    event_type = %self.inner.event_type,
                    %phase,
                    trigger = trigger.name(),
                    trigger_id = %entry.id,
                    error = panic_message(payload.as_ref()),
                    "system event trigger panicked"
                );
                None
            }
        }
    }
}

impl Default for ThreePhaseEvent {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ThreePhaseEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let registry = self.inner.registry.lock();
        f.debug_struct("ThreePhaseEvent")
            .field("event_type", &self.inner.event_type)
            .field("before", &registry.before.len())
            .field("during", &registry.during.len())
            .field("after", &registry.after.len())
            .field("state", &registry.state)
            .finish()
    }
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s
    } else {
        "non-string panic payload"
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
