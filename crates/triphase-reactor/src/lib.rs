//! # triphase-reactor
//!
//! Reactor lifecycle state machine on top of [`triphase_events::SystemEvents`].
//!
//! [`ReactorCore`] owns the `"startup"` and `"shutdown"` system events and
//! the flags that decide whether the reactor may start, stop or restart. It
//! owns no I/O loop: starting fires `"startup"`, stopping fires `"shutdown"`,
//! and everything else is a trigger registered on those events.
//!
//! ## Lifecycle
//!
//! ```text
//! new ──start_running──▶ started ──(during startup)──▶ running
//!                                                          │
//!            NotRestartable ◀──start_running── stopped ◀──stop
//! ```
//!
//! `crash` clears the started and running flags without firing anything, so
//! a crashed reactor that was never stopped may start again.

#![deny(unsafe_code)]

pub mod errors;
pub mod lifecycle;

pub use errors::{ReactorError, Result};
pub use lifecycle::{ReactorCore, SHUTDOWN, STARTUP};
