//! Layered settings for tierkv.
//!
//! [`Settings::load`] merges, later layers winning:
//!
//! 1. built-in defaults,
//! 2. a TOML, YAML or JSON file (picked by extension),
//! 3. `TIERKV_` environment variables, with `__` separating nested keys
//!    (`TIERKV_HYBRID__MAX_MEMORY_ITEMS=500`).
//!
//! Values are kept close to their textual form; the `tierkv` crate turns
//! them into typed store options.

pub mod error;
mod settings;

pub use crate::settings::{CacheSettings, FileKvSettings, HybridSettings, Settings};

/// Prefix of the environment variables read by [`Settings::load`].
pub const ENV_PREFIX: &str = "TIERKV_";
/// Separator between nesting levels in environment variable names.
pub const ENV_SEPARATOR: &str = "__";
