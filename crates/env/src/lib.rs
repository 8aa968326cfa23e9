//! Environment: the bootstrap context every other subsystem reads from.
//!
//! # Invariants
//! - Built once by [`platform_init`]; the script location is written at most
//!   once, during init, and never afterwards.
//! - Font readiness only moves forward; once ready, always ready.
//! - Registries are last-write-wins and never shrink.

pub mod environment;
pub mod registry;

pub use environment::{EnvEvent, EnvSummary, Environment, platform_init};
pub use registry::Registry;

pub fn crate_info() -> &'static str {
    "tabscore-env v0.1.0"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crate_loads() {
        assert!(crate_info().contains("env"));
    }
}
