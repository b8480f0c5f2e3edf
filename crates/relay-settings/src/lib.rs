//! # relay-settings
//!
//! Configuration management with layered sources for the relay hub.
//!
//! Settings are loaded from three layers (in priority order):
//! 1. **Compiled defaults** — [`RelaySettings::default()`]
//! 2. **Settings file** — JSON, deep-merged over defaults
//! 3. **Environment variables** — `RELAY_*` overrides (highest priority)
//!
//! The file is taken from an explicit path when the caller has one (the
//! `--config` flag), else `$RELAY_CONFIG`, else `~/.relay/settings.json`.

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{deep_merge, load_settings, load_settings_from_path, settings_path};
pub use types::*;
