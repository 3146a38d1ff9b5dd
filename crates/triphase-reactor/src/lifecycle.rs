//! Reactor start/stop state machine.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use tracing::{error, info};
use triphase_events::{
    FireOutcome, Phase, SystemEventId, SystemEvents, Trigger, TriggerFn, TriggerOutcome,
    TriggerResult,
};

use crate::errors::{ReactorError, Result};

/// Event type fired by [`ReactorCore::start_running`].
pub const STARTUP: &str = "startup";

/// Event type fired by [`ReactorCore::stop`].
pub const SHUTDOWN: &str = "shutdown";

#[derive(Debug)]
struct Flags {
    started: bool,
    stopped: bool,
    started_before: bool,
    running: bool,
}

impl Flags {
    fn new() -> Self {
        Self {
            started: false,
            stopped: true,
            started_before: false,
            running: false,
        }
    }

    fn crash(&mut self) {
        self.started = false;
        self.running = false;
    }
}

/// Wraps a trigger so it runs in at most one cycle.
struct RunOnce<T> {
    inner: T,
    fired: AtomicBool,
}

impl<T: Trigger> Trigger for RunOnce<T> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn fire(&self) -> TriggerResult {
        if self.fired.swap(true, Ordering::AcqRel) {
            return Ok(TriggerOutcome::Immediate);
        }
        self.inner.fire()
    }
}

/// Startup/shutdown lifecycle driven by system events.
///
/// Construction registers two internal triggers: `during startup` marks the
/// reactor running and `during shutdown` crashes it. Cloning yields another
/// handle to the same reactor.
#[derive(Clone)]
pub struct ReactorCore {
    events: SystemEvents,
    flags: Arc<Mutex<Flags>>,
}

impl ReactorCore {
    /// Build a reactor around `events`.
    pub fn new(events: SystemEvents) -> Self {
        let flags = Arc::new(Mutex::new(Flags::new()));

        let running = Arc::clone(&flags);
        let _ = events.add(
            Phase::During,
            STARTUP,
            TriggerFn::simple_named("reactor-running", move || running.lock().running = true),
        );
        let crashed = Arc::clone(&flags);
        let _ = events.add(
            Phase::During,
            SHUTDOWN,
            TriggerFn::simple_named("reactor-crash", move || crashed.lock().crash()),
        );

        Self { events, flags }
    }

    /// The system events this reactor fires.
    #[must_use]
    pub fn events(&self) -> &SystemEvents {
        &self.events
    }

    /// Whether the `during startup` phase has run and the reactor has not
    /// crashed or shut down since.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.flags.lock().running
    }

    /// Whether `start_running` succeeded and no crash followed.
    #[must_use]
    pub fn is_started(&self) -> bool {
        self.flags.lock().started
    }

    /// Start the reactor by firing `"startup"`.
    ///
    /// Fails with [`ReactorError::AlreadyRunning`] if already started, or if
    /// a previous startup is still suspended in its before phase (for
    /// example after a `crash`), and with [`ReactorError::NotRestartable`]
    /// once the reactor has been stopped.
    pub fn start_running(&self) -> Result<FireOutcome> {
        let startup_in_flight = self
            .events
            .event(STARTUP)
            .is_some_and(|event| event.is_firing());
        {
            let mut flags = self.flags.lock();
            if flags.started || startup_in_flight {
                return Err(ReactorError::AlreadyRunning);
            }
            if flags.started_before {
                return Err(ReactorError::NotRestartable);
            }
            flags.started = true;
            flags.stopped = false;
        }
        info!(event_type = STARTUP, "reactor starting");
        Ok(self.events.fire_system_event(STARTUP))
    }

    /// Stop the reactor by firing `"shutdown"`.
    ///
    /// Fails with [`ReactorError::NotRunning`] unless the reactor was started
    /// and has not been stopped since.
    pub fn stop(&self) -> Result<FireOutcome> {
        {
            let mut flags = self.flags.lock();
            if flags.stopped {
                return Err(ReactorError::NotRunning);
            }
            flags.stopped = true;
            flags.started_before = true;
        }
        info!(event_type = SHUTDOWN, "reactor stopping");
        Ok(self.events.fire_system_event(SHUTDOWN))
    }

    /// Clear the started and running flags without firing any event.
    pub fn crash(&self) {
        self.flags.lock().crash();
    }

    /// Run `trigger` now if the reactor is running, otherwise once after the
    /// next startup.
    ///
    /// Returns the id of the deferred registration, or `None` if the trigger
    /// already ran. An immediate failure is logged, never returned.
    pub fn call_when_running<T>(&self, trigger: T) -> Option<SystemEventId>
    where
        T: Trigger + 'static,
    {
        if !self.is_running() {
            return Some(self.events.add(
                Phase::After,
                STARTUP,
                RunOnce {
                    inner: trigger,
                    fired: AtomicBool::new(false),
                },
            ));
        }
        if let Err(err) = trigger.fire() {
            error!(trigger = trigger.name(), error = %err, "call when running trigger failed");
        }
        None
    }

    /// See [`SystemEvents::add_system_event_trigger`].
    pub fn add_system_event_trigger<T>(
        &self,
        phase: &str,
        event_type: &str,
        trigger: T,
    ) -> Result<SystemEventId>
    where
        T: Trigger + 'static,
    {
        Ok(self
            .events
            .add_system_event_trigger(phase, event_type, trigger)?)
    }

    /// See [`SystemEvents::remove_system_event_trigger`].
    pub fn remove_system_event_trigger(&self, id: &SystemEventId) -> Result<()> {
        Ok(self.events.remove_system_event_trigger(id)?)
    }

    /// See [`SystemEvents::fire_system_event`].
    pub fn fire_system_event(&self, event_type: &str) -> FireOutcome {
        self.events.fire_system_event(event_type)
    }
}

impl Default for ReactorCore {
    fn default() -> Self {
        Self::new(SystemEvents::new())
    }
}

impl std::fmt::Debug for ReactorCore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReactorCore")
            .field("flags", &*self.flags.lock())
            .field("events", &self.events)
            .finish()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
