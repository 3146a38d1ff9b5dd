//! Settings loading with deep merge and environment variable overrides.
//!
//! Loading flow:
//! 1. Start with compiled [`TriphaseSettings::default()`]
//! 2. If the settings file exists, deep-merge its values over the defaults
//! 3. Apply environment variable overrides (highest priority)
//!
//! Deep merge rules:
//! - Objects are merged recursively (source overrides target per-key)
//! - Arrays and primitives are replaced entirely by source
//! - Null values in source are skipped (preserving target)

use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::debug;
use triphase_core::FiredRemovalPolicy;

use crate::errors::Result;
use crate::types::TriphaseSettings;

/// Env var overriding [`LoggingSettings::level`](crate::LoggingSettings::level).
pub const ENV_LOG_LEVEL: &str = "TRIPHASE_LOG_LEVEL";
/// Env var overriding [`LoggingSettings::json`](crate::LoggingSettings::json).
pub const ENV_LOG_JSON: &str = "TRIPHASE_LOG_JSON";
/// Env var overriding [`EventSettings::fired_removal`](crate::EventSettings::fired_removal).
pub const ENV_FIRED_REMOVAL: &str = "TRIPHASE_FIRED_REMOVAL";

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Resolve the path to the settings file (`~/.triphase/settings.json`).
pub fn settings_path() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(home).join(".triphase").join("settings.json")
}

/// Load settings from the default path with env var overrides.
pub fn load_settings() -> Result<TriphaseSettings> {
    load_settings_from_path(&settings_path())
}

/// Load settings from a specific path with env var overrides.
///
/// A missing file yields defaults; invalid JSON is an error.
pub fn load_settings_from_path(path: &Path) -> Result<TriphaseSettings> {
    let mut settings = load_file_layer(path)?;
    apply_env_overrides(&mut settings, |name| std::env::var(name).ok());
    Ok(settings)
}

/// Defaults merged with the file at `path`, without env overrides.
fn load_file_layer(path: &Path) -> Result<TriphaseSettings> {
    let defaults = serde_json::to_value(TriphaseSettings::default())?;

    let merged = if path.exists() {
        debug!(?path, "loading settings from file");
        let content = std::fs::read_to_string(path)?;
        let user: Value = serde_json::from_str(&content)?;
        deep_merge(defaults, user)
    } else {
        debug!(?path, "settings file not found, using defaults");
        defaults
    };

    Ok(serde_json::from_value(merged)?)
}

/// Recursive deep merge of two JSON values.
pub fn deep_merge(target: Value, source: Value) -> Value {
    match (target, source) {
        (Value::Object(mut target_map), Value::Object(source_map)) => {
            for (key, source_val) in source_map {
                if source_val.is_null() {
                    continue;
                }
                let merged = match target_map.remove(&key) {
                    Some(target_val) => deep_merge(target_val, source_val),
                    None => source_val,
                };
                let _ = target_map.insert(key, merged);
            }
            Value::Object(target_map)
        }
        (_, source) => source,
    }
}

/// Apply environment overrides read through `lookup`.
///
/// Invalid values are ignored with a warning and the file/default value
/// stays in effect.
pub fn apply_env_overrides<F>(settings: &mut TriphaseSettings, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(v) = lookup(ENV_LOG_LEVEL).filter(|v| !v.is_empty()) {
        match parse_log_level(&v) {
            Some(level) => settings.logging.level = level,
            None => tracing::warn!(key = ENV_LOG_LEVEL, value = %v, "invalid log level env var, ignoring"),
        }
    }
    if let Some(v) = lookup(ENV_LOG_JSON) {
        match parse_bool(&v) {
            Some(json) => settings.logging.json = json,
            None => tracing::warn!(key = ENV_LOG_JSON, value = %v, "invalid boolean env var, ignoring"),
        }
    }
    if let Some(v) = lookup(ENV_FIRED_REMOVAL) {
        match FiredRemovalPolicy::parse(&v) {
            Some(policy) => settings.events.fired_removal = policy,
            None => tracing::warn!(key = ENV_FIRED_REMOVAL, value = %v, "invalid removal policy env var, ignoring"),
        }
    }
}

/// Parse a string as a boolean.
///
/// Accepts (case-insensitive): `true`/`1`/`yes`/`on` or `false`/`0`/`no`/`off`.
pub fn parse_bool(val: &str) -> Option<bool> {
    match val.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Normalize a log level name, rejecting unknown levels.
pub fn parse_log_level(val: &str) -> Option<String> {
    let lower = val.trim().to_lowercase();
    let lower = if lower == "warning" { "warn".to_string() } else { lower };
    LOG_LEVELS.contains(&lower.as_str()).then_some(lower)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
