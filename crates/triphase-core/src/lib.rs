//! # triphase-core
//!
//! Foundation types shared by every triphase crate:
//!
//! - **Branded IDs**: [`TriggerId`] and [`CycleId`] as newtypes for type safety
//! - **Removal policy**: [`FiredRemovalPolicy`], the product decision for
//!   removing a trigger that already ran in the current before phase
//! - **Logging**: [`logging::init_subscriber`] and the tracing capture helpers
//!   used by tests across the workspace

#![deny(unsafe_code)]

pub mod ids;
pub mod logging;
pub mod policy;

pub use ids::{CycleId, TriggerId};
pub use policy::FiredRemovalPolicy;
