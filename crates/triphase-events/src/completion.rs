//! One-shot completion tokens.
//!
//! A [`Completion`] is what a before trigger hands back when its work is not
//! finished yet. It is settled exactly once, from any thread, and runs the
//! continuations registered on it at that moment. The event firing machinery
//! registers its continuation here instead of blocking a thread.

use std::fmt;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::oneshot;
use tracing::error;

use crate::errors::{EventError, Result, TriggerError};
use crate::event::panic_message;

/// How a completion was settled.
pub type CompletionResult = std::result::Result<(), TriggerError>;

type Continuation = Box<dyn FnOnce(&CompletionResult) + Send>;

enum State {
    Waiting(Vec<Continuation>),
    Settled(CompletionResult),
}

/// A clonable one-shot token settled with success or failure.
///
/// Clones share state: settling any clone settles them all.
#[derive(Clone)]
pub struct Completion {
    state: Arc<Mutex<State>>,
}

impl Completion {
    /// Create an unsettled completion.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(State::Waiting(Vec::new()))),
        }
    }

    /// Create a completion that is already settled successfully.
    #[must_use]
    pub fn succeeded() -> Self {
        Self {
            state: Arc::new(Mutex::new(State::Settled(Ok(())))),
        }
    }

    /// Settle from a future on the current tokio runtime.
    ///
    /// A panic or cancellation of the future settles the completion with
    /// [`TriggerError::Task`]. Must be called from within a runtime.
    pub fn spawn<F>(future: F) -> Self
    where
        F: Future<Output = CompletionResult> + Send + 'static,
    {
        let completion = Self::new();
        let settle = completion.clone();
        let _ = tokio::spawn(async move {
            let outcome = match tokio::spawn(future).await {
                Ok(result) => result,
                Err(join) => Err(TriggerError::Task(join.to_string())),
            };
            // A manual settle may have won the race.
            let _ = settle.settle(outcome);
        });
        completion
    }

    /// Whether the completion has been settled.
    pub fn is_settled(&self) -> bool {
        matches!(*self.state.lock(), State::Settled(_))
    }

    /// The settled result, if any.
    pub fn result(&self) -> Option<CompletionResult> {
        match &*self.state.lock() {
            State::Settled(result) => Some(result.clone()),
            State::Waiting(_) => None,
        }
    }

    /// Settle successfully.
    pub fn succeed(&self) -> Result<()> {
        self.settle(Ok(()))
    }

    /// Settle with a failure.
    pub fn fail(&self, error: TriggerError) -> Result<()> {
        self.settle(Err(error))
    }

    /// Settle with `result` and run every waiting continuation, in
    /// registration order, on the calling thread.
    ///
    /// A panicking continuation is logged and skipped; the ones after it
    /// still run.
    pub fn settle(&self, result: CompletionResult) -> Result<()> {
        let continuations = {
            let mut state = self.state.lock();
            match std::mem::replace(&mut *state, State::Settled(result.clone())) {
                State::Waiting(continuations) => continuations,
                State::Settled(previous) => {
                    *state = State::Settled(previous);
                    return Err(EventError::AlreadyResolved);
                }
            }
        };
        for continuation in continuations {
            if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| continuation(&result))) {
                error!(
                    error = panic_message(payload.as_ref()),
                    "completion continuation panicked"
                );
            }
        }
        Ok(())
    }

    /// Register a continuation.
    ///
    /// Runs when the completion settles, or right away (on this thread) if
    /// it already has.
    pub fn on_settle<F>(&self, continuation: F)
    where
        F: FnOnce(&CompletionResult) + Send + 'static,
    {
        let settled = {
            let mut state = self.state.lock();
            match &mut *state {
                State::Waiting(waiting) => {
                    waiting.push(Box::new(continuation));
                    return;
                }
                State::Settled(result) => result.clone(),
            }
        };
        continuation(&settled);
    }

    /// Wait for the completion to settle.
    pub async fn wait(&self) -> CompletionResult {
        let (tx, rx) = oneshot::channel();
        self.on_settle(move |result| {
            let _ = tx.send(result.clone());
        });
        rx.await
            .unwrap_or_else(|_| Err(TriggerError::Task("completion dropped unsettled".into())))
    }
}

impl Default for Completion {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Completion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match &*self.state.lock() {
            State::Waiting(waiting) => format!("waiting({})", waiting.len()),
            State::Settled(Ok(())) => "succeeded".to_string(),
            State::Settled(Err(e)) => format!("failed({e})"),
        };
        f.debug_struct("Completion").field("state", &state).finish()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
