use std::time::Duration;

use tabscore_common::{FontProbeConfig, MusicFontSymbol, ScriptElement};

/// A fire-and-forget continuation dispatched on the host's event loop.
pub type Callback = Box<dyn FnOnce()>;

/// Errors a host may report from DOM operations.
#[derive(Debug, thiserror::Error)]
pub enum HostError {
    #[error("no document available")]
    NoDocument,
    #[error("DOM operation failed: {0}")]
    Dom(String),
}

/// Styling for the hidden font probe element.
#[derive(Debug, Clone, PartialEq)]
pub struct ProbeStyle {
    pub element_id: String,
    pub class_name: String,
    pub font_family: String,
    /// Font size in pixels.
    pub font_size: f64,
}

impl ProbeStyle {
    pub fn from_config(config: &FontProbeConfig) -> Self {
        Self {
            element_id: config.probe_element_id.clone(),
            class_name: config.probe_class.clone(),
            font_family: config.family.clone(),
            font_size: config.reference_size,
        }
    }

    /// Inline CSS: invisible, absolutely positioned at the origin.
    pub fn to_css(&self) -> String {
        format!(
            "opacity:0;position:absolute;left:0;top:0;font-size:{}px;font-family:'{}'",
            self.font_size, self.font_family
        )
    }
}

/// Everything the bootstrap needs from the page or worker it runs in.
///
/// Implementations are single-threaded: callbacks handed to
/// [`Host::request_font_load`], [`Host::on_document_ready`] and
/// [`Host::schedule_delayed`] must run later on the same thread, never
/// synchronously inside the registering call.
pub trait Host {
    /// Handle to a probe element created by [`Host::create_probe`].
    type Probe: 'static;

    fn is_worker_context(&self) -> bool;
    fn has_document(&self) -> bool;

    /// The `<script>` element whose code is executing right now, if the host
    /// can tell.
    fn currently_executing_script(&self) -> Option<ScriptElement>;

    /// First `<script>` element matching `selector`.
    fn query_script(&self, selector: &str) -> Option<ScriptElement>;

    /// Stack trace text of a freshly captured error, if the engine provides one.
    fn capture_stack_trace(&self) -> Option<String>;

    fn supports_native_font_load(&self) -> bool;

    /// Ask the host to load `descriptor` (CSS font shorthand) and call
    /// `on_complete` once it has.
    fn request_font_load(&self, descriptor: &str, on_complete: Callback);

    /// Attach a hidden element rendering `glyph` to the document body.
    fn create_probe(
        &self,
        glyph: MusicFontSymbol,
        style: &ProbeStyle,
    ) -> Result<Self::Probe, HostError>;

    /// Rendered width of the probe, in pixels.
    fn measure_width(&self, probe: &Self::Probe) -> f64;

    fn remove_probe(&self, probe: Self::Probe);

    /// Run `callback` once the document structure is ready. If it already
    /// is, the callback is queued rather than lost.
    fn on_document_ready(&self, callback: Callback);

    fn schedule_delayed(&self, callback: Callback, delay: Duration);

    /// User-facing diagnostic channel (the console, in a browser).
    fn warn(&self, message: &str);
}
