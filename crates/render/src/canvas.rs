use std::fmt::Write as _;

use tabscore_common::MusicFontSymbol;

/// Drawing surface created by a registered factory.
///
/// All coordinates are in pixels with the origin at the top left.
pub trait Canvas {
    /// Registry-independent name of the implementation.
    fn kind(&self) -> &'static str;

    fn begin_render(&mut self, width: f64, height: f64);

    fn fill_rect(&mut self, x: f64, y: f64, width: f64, height: f64);

    fn fill_text(&mut self, text: &str, x: f64, y: f64);

    /// Draw one music-font glyph at `scale` (1.0 = the default music font size).
    fn fill_music_symbol(&mut self, x: f64, y: f64, scale: f64, symbol: MusicFontSymbol);

    /// Finish the frame and return its serialized output.
    fn end_render(&mut self) -> String;
}

/// SVG markup surface using the music font for glyphs.
#[derive(Debug)]
pub struct SvgCanvas {
    font_family: String,
    /// Music font size in pixels at scale 1.0.
    music_font_size: f64,
    buffer: String,
}

impl Default for SvgCanvas {
    fn default() -> Self {
        Self::new("alphaTab")
    }
}

impl SvgCanvas {
    pub fn new(font_family: impl Into<String>) -> Self {
        Self {
            font_family: font_family.into(),
            music_font_size: 34.0,
            buffer: String::new(),
        }
    }
}

fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

impl Canvas for SvgCanvas {
    fn kind(&self) -> &'static str {
        "svg"
    }

    fn begin_render(&mut self, width: f64, height: f64) {
        self.buffer.clear();
        let _ = write!(
            self.buffer,
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{width}" height="{height}">"#
        );
    }

    fn fill_rect(&mut self, x: f64, y: f64, width: f64, height: f64) {
        let _ = write!(
            self.buffer,
            r#"<rect x="{x}" y="{y}" width="{width}" height="{height}"/>"#
        );
    }

    fn fill_text(&mut self, text: &str, x: f64, y: f64) {
        let _ = write!(
            self.buffer,
            r#"<text x="{x}" y="{y}">{}</text>"#,
            escape_xml(text)
        );
    }

    fn fill_music_symbol(&mut self, x: f64, y: f64, scale: f64, symbol: MusicFontSymbol) {
        let size = self.music_font_size * scale;
        let _ = write!(
            self.buffer,
            r#"<text x="{x}" y="{y}" style="font-family:'{}';font-size:{size}px">{}</text>"#,
            self.font_family,
            symbol.html_entity()
        );
    }

    fn end_render(&mut self) -> String {
        self.buffer.push_str("</svg>");
        tracing::trace!(bytes = self.buffer.len(), "svg frame finished");
        std::mem::take(&mut self.buffer)
    }
}

/// Human-readable command log; handy for the CLI and tests.
#[derive(Debug, Default)]
pub struct DebugTextCanvas {
    lines: Vec<String>,
}

impl DebugTextCanvas {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Canvas for DebugTextCanvas {
    fn kind(&self) -> &'static str {
        "debug"
    }

    fn begin_render(&mut self, width: f64, height: f64) {
        self.lines.clear();
        self.lines
            .push(format!("=== Frame {width:.0}x{height:.0} ==="));
    }

    fn fill_rect(&mut self, x: f64, y: f64, width: f64, height: f64) {
        self.lines.push(format!(
            "  rect ({x:.1}, {y:.1}) {width:.1}x{height:.1}"
        ));
    }

    fn fill_text(&mut self, text: &str, x: f64, y: f64) {
        self.lines
            .push(format!("  text ({x:.1}, {y:.1}) {text:?}"));
    }

    fn fill_music_symbol(&mut self, x: f64, y: f64, scale: f64, symbol: MusicFontSymbol) {
        self.lines.push(format!(
            "  glyph ({x:.1}, {y:.1}) x{scale:.2} {symbol:?} U+{:04X}",
            symbol.codepoint()
        ));
    }

    fn end_render(&mut self) -> String {
        let mut out = std::mem::take(&mut self.lines).join("\n");
        out.push('\n');
        out
    }
}
