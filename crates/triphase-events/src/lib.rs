//! # triphase-events
//!
//! Three-phase system event triggers.
//!
//! Callers register [`Trigger`]s for the [`Phase::Before`], [`Phase::During`]
//! and [`Phase::After`] phases of a named event type. Firing the event runs
//! the phases strictly in that order.
//!
//! ## Execution Model
//!
//! - **Before** triggers all run eagerly, in registration order. A trigger may
//!   return [`TriggerOutcome::Pending`] with a [`Completion`]; the event then
//!   waits for every such completion before moving on.
//! - **During** and **after** triggers run once the before phase has settled.
//!   They cannot suspend.
//! - Triggers may add or remove other triggers while the event is firing.
//!   Removing a trigger that has not run yet means it never runs.
//!
//! ## Fail-Open
//!
//! Trigger errors and panics never abort a firing. Each is logged once at
//! `ERROR` and firing continues with the next trigger.
//!
//! ## Example
//!
//! ```rust
//! use triphase_events::{SystemEvents, TriggerFn};
//!
//! let events = SystemEvents::new();
//! let id = events
//!     .add_system_event_trigger("before", "shutdown", TriggerFn::simple(|| println!("flushing")))
//!     .unwrap();
//! let _ = events.fire_system_event("shutdown");
//! events.remove_system_event_trigger(&id).unwrap();
//! ```

#![deny(unsafe_code)]

pub mod completion;
pub mod dispatcher;
pub mod errors;
pub mod event;
pub mod handle;
pub mod phase;
pub mod trigger;

pub use completion::Completion;
pub use dispatcher::SystemEvents;
pub use errors::{EventError, Result, TriggerError};
pub use event::{FireOutcome, FiringState, ThreePhaseEvent};
pub use handle::{SystemEventId, TriggerHandle};
pub use phase::Phase;
pub use trigger::{Trigger, TriggerFn, TriggerOutcome, TriggerResult};
