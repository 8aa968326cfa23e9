//! Shared types for the tabscore bootstrap crates.
//!
//! Holds the records that cross crate boundaries (script sources, music-font
//! glyphs) and the configuration consumed by the environment bootstrap.

pub mod config;
pub mod types;

pub use config::{ConfigError, EnvConfig, FontProbeConfig, LocatorConfig};
pub use types::{MusicFontSymbol, ScriptElement};

pub fn crate_info() -> &'static str {
    "tabscore-common v0.1.0"
}
