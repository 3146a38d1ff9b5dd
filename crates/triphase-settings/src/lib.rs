//! # triphase-settings
//!
//! Layered configuration for triphase.
//!
//! Settings are loaded from three layers (in priority order):
//! 1. **Compiled defaults**: [`TriphaseSettings::default()`]
//! 2. **User file**: `~/.triphase/settings.json` (deep-merged over defaults)
//! 3. **Environment variables**: `TRIPHASE_*` overrides (highest priority)
//!
//! There is no global settings instance: the binary loads settings once and
//! hands the relevant sections to the components it builds.
//!
//! # Usage
//!
//! ```no_run
//! use triphase_settings::load_settings;
//!
//! let settings = load_settings().unwrap_or_default();
//! println!("log level: {}", settings.logging.level);
//! ```

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{deep_merge, load_settings, load_settings_from_path, settings_path};
pub use types::{EventSettings, LoggingSettings, TriphaseSettings};
