//! Rendering surfaces.
//!
//! # Invariants
//! - A surface only accumulates drawing commands between `begin_render`
//!   and `end_render`; it never reads environment state.
//! - Music glyphs are drawn as text in the music font, so their metrics
//!   are only right once that font has loaded.

mod canvas;

pub use canvas::{Canvas, DebugTextCanvas, SvgCanvas};

pub fn crate_info() -> &'static str {
    "tabscore-render v0.1.0"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crate_loads() {
        assert!(crate_info().contains("render"));
    }
}
