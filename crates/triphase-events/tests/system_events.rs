//! Integration tests for `SystemEvents` driven through the public API only.

use std::sync::Arc;
use std::time::Duration;

use assert_matches::assert_matches;
use parking_lot::Mutex;
use tracing::Level;
use triphase_core::logging::capture_logs;
use triphase_events::{
    Completion, EventError, FireOutcome, FiringState, Phase, SystemEvents, Trigger, TriggerError,
    TriggerFn, TriggerOutcome,
};

type Log = Arc<Mutex<Vec<String>>>;

fn record(log: &Log, tag: &str) -> impl Trigger + 'static {
    let log = Arc::clone(log);
    let tag = tag.to_string();
    TriggerFn::simple_named(tag.clone(), move || log.lock().push(tag.clone()))
}

fn waits_on(log: &Log, tag: &str, completion: &Completion) -> impl Trigger + 'static {
    let log = Arc::clone(log);
    let tag = tag.to_string();
    let completion = completion.clone();
    TriggerFn::new(move || {
        log.lock().push(tag.clone());
        Ok(TriggerOutcome::Pending(completion.clone()))
    })
}

fn entries(log: &Log) -> Vec<String> {
    log.lock().clone()
}

#[test]
fn add_and_fire_each_phase() {
    let events = SystemEvents::new();
    let log: Log = Arc::default();
    for phase in ["after", "during", "before"] {
        let _ = events
            .add_system_event_trigger(phase, "test", record(&log, phase))
            .unwrap();
    }
    assert_eq!(events.fire_system_event("test"), FireOutcome::Completed);
    assert_eq!(entries(&log), vec!["before", "during", "after"]);
}

#[test]
fn removed_trigger_does_not_run() {
    let events = SystemEvents::new();
    let log: Log = Arc::default();
    let id = events
        .add_system_event_trigger("before", "test", record(&log, "before"))
        .unwrap();
    events.remove_system_event_trigger(&id).unwrap();
    let _ = events.fire_system_event("test");
    assert!(entries(&log).is_empty());
}

#[test]
fn removal_errors() {
    let events = SystemEvents::new();
    let log: Log = Arc::default();
    let id = events
        .add_system_event_trigger("during", "test", record(&log, "d"))
        .unwrap();

    assert_matches!(
        events.remove_system_event_trigger_token(""),
        Err(EventError::MalformedHandle(_))
    );
    assert_matches!(
        events.remove_system_event_trigger_token("None"),
        Err(EventError::MalformedHandle(_))
    );
    let bad_phase = id.to_string().replacen("during", "xxx", 1);
    assert_matches!(
        events.remove_system_event_trigger_token(&bad_phase),
        Err(EventError::InvalidPhase(p)) if p == "xxx"
    );

    events
        .remove_system_event_trigger_token(&id.to_string())
        .unwrap();
    assert_matches!(
        events.remove_system_event_trigger(&id),
        Err(EventError::TriggerNotFound { .. })
    );
}

#[test]
fn different_events_fire_independently() {
    let events = SystemEvents::new();
    let log: Log = Arc::default();
    let completion = Completion::new();

    let _ = events.add(Phase::Before, "first", waits_on(&log, "first-before", &completion));
    let _ = events.add(Phase::During, "first", record(&log, "first-during"));
    let _ = events.add(Phase::During, "second", record(&log, "second-during"));

    assert_eq!(
        events.fire_system_event("first"),
        FireOutcome::Suspended { pending: 1 }
    );
    assert_eq!(events.fire_system_event("second"), FireOutcome::Completed);
    assert_eq!(entries(&log), vec!["first-before", "second-during"]);
    assert_eq!(
        events.event("second").unwrap().state(),
        FiringState::Base
    );

    completion.succeed().unwrap();
    assert_eq!(
        entries(&log),
        vec!["first-before", "second-during", "first-during"]
    );
}

#[test]
fn multiple_before_completions() {
    let events = SystemEvents::new();
    let log: Log = Arc::default();
    let first = Completion::new();
    let second = Completion::new();

    let _ = events.add(Phase::Before, "test", waits_on(&log, "b1", &first));
    let _ = events.add(Phase::Before, "test", waits_on(&log, "b2", &second));
    let _ = events.add(Phase::During, "test", record(&log, "during"));

    assert_eq!(
        events.fire_system_event("test"),
        FireOutcome::Suspended { pending: 2 }
    );
    first.succeed().unwrap();
    assert!(!entries(&log).contains(&"during".to_string()));
    second.succeed().unwrap();
    assert_eq!(entries(&log), vec!["b1", "b2", "during"]);
}

#[test]
fn subsequent_before_trigger_settles_prior_completion() {
    let events = SystemEvents::new();
    let log: Log = Arc::default();
    let completion = Completion::new();

    let _ = events.add(Phase::Before, "test", waits_on(&log, "first", &completion));
    let settle = completion.clone();
    let settle_log = Arc::clone(&log);
    let _ = events.add(
        Phase::Before,
        "test",
        TriggerFn::simple(move || {
            settle_log.lock().push("second".to_string());
            settle.succeed().unwrap();
        }),
    );
    let _ = events.add(Phase::During, "test", record(&log, "during"));

    assert_eq!(events.fire_system_event("test"), FireOutcome::Completed);
    assert_eq!(entries(&log), vec!["first", "second", "during"]);
}

#[test]
fn failures_are_logged_not_raised() {
    let (logs, _guard) = capture_logs();
    let events = SystemEvents::new();
    let log: Log = Arc::default();

    let _ = events.add(
        Phase::Before,
        "shutdown",
        TriggerFn::named("bad-before", || Err(TriggerError::failed("no"))),
    );
    let _ = events.add(
        Phase::After,
        "shutdown",
        TriggerFn::named("bad-after", || Err(TriggerError::failed("no"))),
    );
    let _ = events.add(Phase::During, "shutdown", record(&log, "during"));

    assert_eq!(events.fire_system_event("shutdown"), FireOutcome::Completed);
    assert_eq!(entries(&log), vec!["during"]);

    let errors = logs.events_at_level(Level::ERROR);
    assert_eq!(errors.len(), 2);
    assert_eq!(errors[0].field("trigger"), Some("bad-before"));
    assert_eq!(errors[1].field("trigger"), Some("bad-after"));
    assert!(errors.iter().all(|e| e.field("event_type") == Some("shutdown")));
}

#[tokio::test(start_paused = true)]
async fn spawned_completion_resumes_event() {
    let events = SystemEvents::new();
    let log: Log = Arc::default();
    let done = Completion::new();

    let flush_log = Arc::clone(&log);
    let _ = events.add(
        Phase::Before,
        "shutdown",
        TriggerFn::named("flush", move || {
            let log = Arc::clone(&flush_log);
            Ok(TriggerOutcome::Pending(Completion::spawn(async move {
                tokio::time::sleep(Duration::from_millis(100)).await;
                log.lock().push("flushed".to_string());
                Ok(())
            })))
        }),
    );
    let signal = done.clone();
    let during_log = Arc::clone(&log);
    let _ = events.add(
        Phase::During,
        "shutdown",
        TriggerFn::simple(move || {
            during_log.lock().push("during".to_string());
            let _ = signal.succeed();
        }),
    );

    assert_eq!(
        events.fire_system_event("shutdown"),
        FireOutcome::Suspended { pending: 1 }
    );
    assert!(entries(&log).is_empty());

    assert_eq!(done.wait().await, Ok(()));
    assert_eq!(entries(&log), vec!["flushed", "during"]);
    assert!(!events.event("shutdown").unwrap().is_firing());
}
