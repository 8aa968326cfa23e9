//! Font Load Detector: tells glyph layout when the music font can be measured.
//!
//! # Invariants
//! - Readiness is monotonic: once `Ready`, always `Ready`.
//! - At most one detection cycle per detector; polling is strictly
//!   sequential and owns a single probe element.
//! - Worker contexts never schedule timers or touch the DOM.

mod detector;
mod readiness;

pub use detector::{FontError, FontLoadDetector, FontStrategy};
pub use readiness::{FontReadiness, FontState};

pub fn crate_info() -> &'static str {
    "tabscore-font v0.1.0"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crate_loads() {
        assert!(crate_info().contains("font"));
    }
}
