//! Layered configuration for the outreach pipeline.
//!
//! Settings are loaded from three layers (in priority order):
//! 1. **Compiled defaults** ([`OutreachSettings::default()`])
//! 2. **User file** `~/.outreach/settings.json`, deep-merged over defaults
//! 3. **Environment variables** `OUTREACH_*` (highest priority)

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{
    apply_env_overrides, deep_merge, load_settings, load_settings_from_path, outreach_home,
    settings_path,
};
pub use types::*;
