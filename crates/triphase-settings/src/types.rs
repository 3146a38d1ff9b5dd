//! Settings type definitions.
//!
//! All types use `#[serde(rename_all = "camelCase", default)]`, so a partial
//! JSON file only needs the fields it changes.

use serde::{Deserialize, Serialize};
use triphase_core::FiredRemovalPolicy;

/// Root settings type.
///
/// ```json
/// {
///   "logging": { "level": "debug", "json": true },
///   "events": { "firedRemoval": "reject" }
/// }
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TriphaseSettings {
    /// Logging configuration.
    pub logging: LoggingSettings,
    /// System event trigger behavior.
    pub events: EventSettings,
}

/// Logging configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingSettings {
    /// Minimum level (`trace`, `debug`, `info`, `warn`, `error`).
    pub level: String,
    /// Emit JSON lines instead of the compact human format.
    pub json: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            json: false,
        }
    }
}

/// System event trigger behavior.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EventSettings {
    /// What removing an already-fired before trigger does.
    pub fired_removal: FiredRemovalPolicy,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_camel_case() {
        let json = serde_json::to_value(TriphaseSettings::default()).unwrap();
        assert_eq!(json["logging"]["level"], "warn");
        assert_eq!(json["events"]["firedRemoval"], "warn");
    }

    #[test]
    fn partial_json_fills_defaults() {
        let settings: TriphaseSettings =
            serde_json::from_str(r#"{"logging": {"json": true}}"#).unwrap();
        assert!(settings.logging.json);
        assert_eq!(settings.logging.level, "warn");
        assert_eq!(settings.events, EventSettings::default());
    }

    #[test]
    fn unknown_policy_is_rejected() {
        let result =
            serde_json::from_str::<TriphaseSettings>(r#"{"events": {"firedRemoval": "ignore"}}"#);
        assert!(result.is_err());
    }
}
