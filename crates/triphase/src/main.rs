//! # triphase
//!
//! Runs one startup/shutdown cycle of a [`ReactorCore`] with asynchronous
//! `before shutdown` triggers and prints the order in which every trigger
//! ran.

#![deny(unsafe_code)]

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::Parser;
use parking_lot::Mutex;
use tracing::info;
use triphase_core::FiredRemovalPolicy;
use triphase_events::{Completion, SystemEvents, TriggerFn, TriggerOutcome};
use triphase_reactor::{ReactorCore, SHUTDOWN, STARTUP};
use triphase_settings::TriphaseSettings;

/// Fire startup and shutdown system events through a reactor.
#[derive(Parser, Debug)]
#[command(name = "triphase", about = "Three-phase system event demo")]
struct Cli {
    /// Settings file (defaults to `~/.triphase/settings.json`).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Log level (overrides settings and `TRIPHASE_LOG_LEVEL`).
    #[arg(long)]
    log_level: Option<String>,

    /// Number of asynchronous `before shutdown` triggers.
    #[arg(long, default_value = "2")]
    flush_triggers: usize,

    /// Delay of the first asynchronous trigger; each next one waits longer.
    #[arg(long, default_value = "100")]
    delay_ms: u64,
}

type RunLog = Arc<Mutex<Vec<String>>>;

fn load(cli: &Cli) -> Result<TriphaseSettings> {
    let mut settings = match &cli.config {
        Some(path) => triphase_settings::load_settings_from_path(path)
            .with_context(|| format!("Failed to load settings from {}", path.display()))?,
        None => triphase_settings::load_settings().context("Failed to load settings")?,
    };
    if let Some(level) = &cli.log_level {
        settings.logging.level.clone_from(level);
    }
    Ok(settings)
}

/// Delay of the `index`th flush trigger, clamped instead of overflowing.
fn flush_delay(base_ms: u64, index: usize) -> Duration {
    let factor = u64::try_from(index).map_or(u64::MAX, |i| i.saturating_add(1));
    Duration::from_millis(base_ms.saturating_mul(factor))
}

fn note(log: &RunLog, entry: impl Into<String>) {
    log.lock().push(entry.into());
}

/// Register the demonstration triggers; returns a completion settled by the
/// last `after shutdown` trigger.
fn register_triggers(reactor: &ReactorCore, cli: &Cli, log: &RunLog) -> Result<Completion> {
    let running = Arc::clone(log);
    let _ = reactor.call_when_running(TriggerFn::simple_named("announce", move || {
        note(&running, "reactor running");
    }));

    for index in 0..cli.flush_triggers {
        let name = format!("flush-{index}");
        let delay = flush_delay(cli.delay_ms, index);
        let flushed = Arc::clone(log);
        let label = name.clone();
        let _ = reactor.add_system_event_trigger(
            "before",
            SHUTDOWN,
            TriggerFn::named(name, move || {
                let flushed = Arc::clone(&flushed);
                let label = label.clone();
                Ok(TriggerOutcome::Pending(Completion::spawn(async move {
                    tokio::time::sleep(delay).await;
                    note(&flushed, format!("{label} finished after {delay:?}"));
                    Ok(())
                })))
            }),
        )?;
    }

    let during = Arc::clone(log);
    let _ = reactor.add_system_event_trigger(
        "during",
        SHUTDOWN,
        TriggerFn::simple_named("close", move || note(&during, "during shutdown")),
    )?;

    let done = Completion::new();
    let signal = done.clone();
    let after = Arc::clone(log);
    let _ = reactor.add_system_event_trigger(
        "after",
        SHUTDOWN,
        TriggerFn::simple_named("report", move || {
            note(&after, "after shutdown");
            let _ = signal.succeed();
        }),
    )?;

    Ok(done)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = load(&cli)?;
    triphase_core::logging::init_subscriber(&settings.logging.level, settings.logging.json);

    let policy: FiredRemovalPolicy = settings.events.fired_removal;
    info!(%policy, level = %settings.logging.level, "settings loaded");

    let reactor = ReactorCore::new(SystemEvents::with_policy(policy));
    let log: RunLog = Arc::default();
    let done = register_triggers(&reactor, &cli, &log)?;

    let started = Instant::now();
    let outcome = reactor.start_running()?;
    info!(event_type = STARTUP, ?outcome, "startup fired");
    let outcome = reactor.stop()?;
    info!(event_type = SHUTDOWN, ?outcome, "shutdown fired");

    done.wait().await.context("shutdown did not complete")?;

    for entry in log.lock().iter() {
        println!("{entry}");
    }
    println!("shutdown complete in {:?}", started.elapsed());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn cli_defaults() {
        let cli = Cli::parse_from(["triphase"]);
        assert!(cli.config.is_none());
        assert_eq!(cli.flush_triggers, 2);
        assert_eq!(cli.delay_ms, 100);
    }

    #[test]
    fn flush_delay_grows_and_saturates() {
        assert_eq!(flush_delay(100, 0), Duration::from_millis(100));
        assert_eq!(flush_delay(100, 2), Duration::from_millis(300));
        assert_eq!(flush_delay(u64::MAX, 1), Duration::from_millis(u64::MAX));
    }

    #[test]
    fn cli_level_overrides_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"logging": {{"level": "info"}}}}"#).unwrap();
        let path = file.path().to_str().unwrap().to_string();

        let from_file = load(&Cli::parse_from(["triphase", "--config", &path])).unwrap();
        assert_eq!(from_file.logging.level, "info");

        let overridden = load(&Cli::parse_from([
            "triphase",
            "--config",
            &path,
            "--log-level",
            "debug",
        ]))
        .unwrap();
        assert_eq!(overridden.logging.level, "debug");
    }

    #[tokio::test(start_paused = true)]
    async fn demo_runs_every_phase_in_order() {
        let cli = Cli::parse_from(["triphase", "--flush-triggers", "2", "--delay-ms", "10"]);
        let reactor = ReactorCore::default();
        let log: RunLog = Arc::default();
        let done = register_triggers(&reactor, &cli, &log).unwrap();

        let _ = reactor.start_running().unwrap();
        let _ = reactor.stop().unwrap();
        done.wait().await.unwrap();

        let entries = log.lock().clone();
        assert_eq!(entries.len(), 5);
        assert_eq!(entries[0], "reactor running");
        assert!(entries[1].starts_with("flush-0"));
        assert!(entries[2].starts_with("flush-1"));
        assert_eq!(entries[3], "during shutdown");
        assert_eq!(entries[4], "after shutdown");
    }
}
