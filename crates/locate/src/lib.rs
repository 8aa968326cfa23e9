//! Script Locator: finds the URL of the bundle that is executing right now.
//!
//! # Invariants
//! - Fallbacks run in a fixed order and the first success wins.
//! - Never panics or propagates on malformed input; failure is a value.
//! - Runs synchronously; nothing is scheduled on the host.

mod locator;
mod stack;

pub use locator::{LocateError, LocateSource, ScriptLocation, ScriptLocator, resolve_script_location};
pub use stack::{StackDialect, script_from_stack};

pub fn crate_info() -> &'static str {
    "tabscore-locate v0.1.0"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crate_loads() {
        assert!(crate_info().contains("locate"));
    }
}
