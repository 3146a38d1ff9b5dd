//! Trigger trait and closure adapter.
//!
//! A trigger is the unit registered against one phase of one event. Its
//! arguments are whatever the implementation captures; identity comes from
//! the registration, not from the trigger value.

use std::fmt;

use crate::completion::Completion;
use crate::errors::TriggerError;

/// What a trigger reports once its body has returned.
#[derive(Clone, Debug)]
pub enum TriggerOutcome {
    /// The trigger's work is done.
    Immediate,
    /// The trigger's work finishes when the completion settles.
    ///
    /// Only honoured in the before phase; elsewhere it is treated as
    /// `Immediate`.
    Pending(Completion),
}

/// Result type returned by [`Trigger::fire`].
pub type TriggerResult = Result<TriggerOutcome, TriggerError>;

/// A callable registered for one phase of a system event.
///
/// Errors and panics from [`fire`](Trigger::fire) are caught by the event,
/// logged with the trigger's [`name`](Trigger::name), and never propagate to
/// whoever fired the event.
pub trait Trigger: Send + Sync {
    /// Name used to identify the trigger in log records.
    fn name(&self) -> &str {
        "anonymous"
    }

    /// Run the trigger.
    fn fire(&self) -> TriggerResult;
}

/// Adapter turning a closure into a [`Trigger`].
pub struct TriggerFn<F> {
    name: String,
    func: F,
}

impl<F> TriggerFn<F>
where
    F: Fn() -> TriggerResult + Send + Sync,
{
    /// Wrap a closure that reports its own outcome.
    pub fn new(func: F) -> Self {
        Self::named("anonymous", func)
    }

    /// Wrap a closure under a name used in log records.
    pub fn named(name: impl Into<String>, func: F) -> Self {
        Self {
            name: name.into(),
            func,
        }
    }
}

impl TriggerFn<()> {
    /// Wrap a closure that always completes immediately and never fails.
    pub fn simple<G>(func: G) -> TriggerFn<impl Fn() -> TriggerResult + Send + Sync>
    where
        G: Fn() + Send + Sync,
    {
        TriggerFn::new(move || {
            func();
            Ok(TriggerOutcome::Immediate)
        })
    }

    /// Named variant of [`simple`](TriggerFn::simple).
    pub fn simple_named<G>(
        name: impl Into<String>,
        func: G,
    ) -> TriggerFn<impl Fn() -> TriggerResult + Send + Sync>
    where
        G: Fn() + Send + Sync,
    {
        TriggerFn::named(name, move || {
            func();
            Ok(TriggerOutcome::Immediate)
        })
    }
}

impl<F> Trigger for TriggerFn<F>
where
    F: Fn() -> TriggerResult + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn fire(&self) -> TriggerResult {
        (self.func)()
    }
}

impl<F> fmt::Debug for TriggerFn<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TriggerFn").field("name", &self.name).finish()
    }
}
