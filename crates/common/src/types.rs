use serde::{Deserialize, Serialize};

/// A `<script>` element as reported by the host: only its source URL matters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptElement {
    pub source: String,
}

impl ScriptElement {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
        }
    }

    /// The source URL, or `None` for inline scripts with an empty `src`.
    pub fn resolvable_source(&self) -> Option<&str> {
        let src = self.source.trim();
        (!src.is_empty()).then_some(src)
    }
}

/// Glyphs of the music font, keyed by their SMuFL codepoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum MusicFontSymbol {
    /// Treble clef. Wide enough at 100px to tell the real font from a fallback.
    #[default]
    ClefG,
    ClefC,
    ClefF,
    NoteheadBlack,
}

impl MusicFontSymbol {
    pub fn codepoint(self) -> u32 {
        match self {
            Self::ClefG => 0xE050,
            Self::ClefC => 0xE05C,
            Self::ClefF => 0xE062,
            Self::NoteheadBlack => 0xE0A4,
        }
    }

    /// Numeric HTML entity for the glyph, e.g. `&#57424;`.
    pub fn html_entity(self) -> String {
        format!("&#{};", self.codepoint())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_source_is_not_resolvable() {
        assert_eq!(ScriptElement::new("").resolvable_source(), None);
        assert_eq!(ScriptElement::new("  ").resolvable_source(), None);
        assert_eq!(
            ScriptElement::new("https://cdn/x/lib.js").resolvable_source(),
            Some("https://cdn/x/lib.js")
        );
    }

    #[test]
    fn clef_g_codepoint() {
        assert_eq!(MusicFontSymbol::ClefG.codepoint(), 57424);
        assert_eq!(MusicFontSymbol::ClefG.html_entity(), "&#57424;");
        assert_eq!(MusicFontSymbol::default(), MusicFontSymbol::ClefG);
    }
}
