//! Deterministic in-process host.
//!
//! Timers run against a virtual clock and only when the owner drives them
//! with [`SimHost::advance`] or [`SimHost::run_until_idle`]. Probe widths are
//! scripted up front; the last scripted width repeats once the script runs
//! out.

use std::cell::RefCell;
use std::collections::{BTreeMap, VecDeque};
use std::time::Duration;

use tabscore_common::{MusicFontSymbol, ScriptElement};

use crate::host::{Callback, Host, HostError, ProbeStyle};

/// Handle to a probe element inside a [`SimHost`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SimProbe(u32);

#[derive(Debug, Clone)]
struct ProbeRecord {
    glyph: MusicFontSymbol,
    style: ProbeStyle,
}

#[derive(Default)]
struct SimState {
    now: Duration,
    next_seq: u64,
    /// Keyed by (due time, insertion order) so equal deadlines fire FIFO.
    timers: BTreeMap<(Duration, u64), Callback>,
    document_ready: bool,
    ready_listeners: Vec<Callback>,
    font_loads: VecDeque<Callback>,
    font_requests: Vec<String>,
    widths: VecDeque<f64>,
    last_width: f64,
    next_probe: u32,
    live_probes: BTreeMap<SimProbe, ProbeRecord>,
    last_probe: Option<ProbeRecord>,
    created_probes: usize,
    removed_probes: usize,
    measurements: Vec<f64>,
    warnings: Vec<String>,
    stack_captures: usize,
    script_queries: Vec<String>,
}

/// Simulated page or worker for tests and the CLI.
pub struct SimHost {
    worker: bool,
    document: bool,
    native_font_api: bool,
    current_script: Option<ScriptElement>,
    marker_scripts: Vec<(String, ScriptElement)>,
    stack: Option<String>,
    state: RefCell<SimState>,
}

impl SimHost {
    fn new(worker: bool, document: bool) -> Self {
        Self {
            worker,
            document,
            native_font_api: false,
            current_script: None,
            marker_scripts: Vec::new(),
            stack: None,
            state: RefCell::new(SimState::default()),
        }
    }

    /// Main thread with a document, no native font API.
    pub fn document() -> Self {
        Self::new(false, true)
    }

    /// Background worker: no document.
    pub fn worker() -> Self {
        Self::new(true, false)
    }

    /// Neither a worker nor a document.
    pub fn headless() -> Self {
        Self::new(false, false)
    }

    pub fn with_native_font_api(mut self) -> Self {
        self.native_font_api = true;
        self
    }

    pub fn with_current_script(mut self, source: impl Into<String>) -> Self {
        self.current_script = Some(ScriptElement::new(source));
        self
    }

    /// Add a `<script>` carrying `attribute`, found by `script[attribute]`.
    pub fn with_marker_script(
        mut self,
        attribute: impl AsRef<str>,
        source: impl Into<String>,
    ) -> Self {
        let selector = format!("script[{}]", attribute.as_ref());
        self.marker_scripts
            .push((selector, ScriptElement::new(source)));
        self
    }

    pub fn with_stack(mut self, stack: impl Into<String>) -> Self {
        self.stack = Some(stack.into());
        self
    }

    /// Widths returned by successive probe measurements.
    pub fn with_widths(self, widths: impl IntoIterator<Item = f64>) -> Self {
        self.state.borrow_mut().widths.extend(widths);
        self
    }

    /// Fire DOMContentLoaded. Returns the number of listeners run.
    pub fn fire_document_ready(&self) -> usize {
        let listeners = {
            let mut state = self.state.borrow_mut();
            if !self.document || state.document_ready {
                return 0;
            }
            state.document_ready = true;
            std::mem::take(&mut state.ready_listeners)
        };
        let count = listeners.len();
        for listener in listeners {
            listener();
        }
        count
    }

    /// Resolve every pending native font load. Returns how many completed.
    pub fn complete_font_loads(&self) -> usize {
        let mut count = 0;
        loop {
            let next = self.state.borrow_mut().font_loads.pop_front();
            match next {
                Some(callback) => {
                    callback();
                    count += 1;
                }
                None => break,
            }
        }
        count
    }

    /// Move the clock forward by `by`, firing every timer that falls due.
    pub fn advance(&self, by: Duration) -> usize {
        let target = self.state.borrow().now + by;
        let mut fired = 0;
        loop {
            let next = {
                let mut state = self.state.borrow_mut();
                let first = state.timers.first_key_value().map(|(key, _)| *key);
                match first {
                    Some(key) if key.0 <= target => {
                        state.now = key.0;
                        state.timers.remove(&key)
                    }
                    _ => None,
                }
            };
            match next {
                Some(callback) => {
                    callback();
                    fired += 1;
                }
                None => break,
            }
        }
        self.state.borrow_mut().now = target;
        fired
    }

    /// Fire timers in due order until none remain or `max_timers` have run.
    pub fn run_until_idle(&self, max_timers: usize) -> usize {
        let mut fired = 0;
        while fired < max_timers {
            let next = {
                let mut state = self.state.borrow_mut();
                state.timers.pop_first().map(|((due, _), callback)| {
                    state.now = due;
                    callback
                })
            };
            match next {
                Some(callback) => {
                    callback();
                    fired += 1;
                }
                None => break,
            }
        }
        fired
    }

    pub fn now(&self) -> Duration {
        self.state.borrow().now
    }

    pub fn pending_timers(&self) -> usize {
        self.state.borrow().timers.len()
    }

    pub fn pending_font_loads(&self) -> usize {
        self.state.borrow().font_loads.len()
    }

    pub fn font_requests(&self) -> Vec<String> {
        self.state.borrow().font_requests.clone()
    }

    pub fn created_probes(&self) -> usize {
        self.state.borrow().created_probes
    }

    pub fn removed_probes(&self) -> usize {
        self.state.borrow().removed_probes
    }

    pub fn live_probes(&self) -> usize {
        self.state.borrow().live_probes.len()
    }

    /// Glyph and style of the most recently created probe.
    pub fn last_probe(&self) -> Option<(MusicFontSymbol, ProbeStyle)> {
        self.state
            .borrow()
            .last_probe
            .as_ref()
            .map(|r| (r.glyph, r.style.clone()))
    }

    pub fn measurements(&self) -> Vec<f64> {
        self.state.borrow().measurements.clone()
    }

    pub fn warnings(&self) -> Vec<String> {
        self.state.borrow().warnings.clone()
    }

    pub fn stack_captures(&self) -> usize {
        self.state.borrow().stack_captures
    }

    pub fn script_queries(&self) -> Vec<String> {
        self.state.borrow().script_queries.clone()
    }
}

impl Host for SimHost {
    type Probe = SimProbe;

    fn is_worker_context(&self) -> bool {
        self.worker
    }

    fn has_document(&self) -> bool {
        self.document
    }

    fn currently_executing_script(&self) -> Option<ScriptElement> {
        self.current_script.clone()
    }

    fn query_script(&self, selector: &str) -> Option<ScriptElement> {
        self.state
            .borrow_mut()
            .script_queries
            .push(selector.to_owned());
        self.marker_scripts
            .iter()
            .find(|(s, _)| s == selector)
            .map(|(_, el)| el.clone())
    }

    fn capture_stack_trace(&self) -> Option<String> {
        self.state.borrow_mut().stack_captures += 1;
        self.stack.clone()
    }

    fn supports_native_font_load(&self) -> bool {
        self.document && self.native_font_api
    }

    fn request_font_load(&self, descriptor: &str, on_complete: Callback) {
        let mut state = self.state.borrow_mut();
        state.font_requests.push(descriptor.to_owned());
        state.font_loads.push_back(on_complete);
    }

    fn create_probe(
        &self,
        glyph: MusicFontSymbol,
        style: &ProbeStyle,
    ) -> Result<SimProbe, HostError> {
        if !self.document {
            return Err(HostError::NoDocument);
        }
        let mut state = self.state.borrow_mut();
        let probe = SimProbe(state.next_probe);
        state.next_probe += 1;
        let record = ProbeRecord {
            glyph,
            style: style.clone(),
        };
        state.live_probes.insert(probe, record.clone());
        state.last_probe = Some(record);
        state.created_probes += 1;
        Ok(probe)
    }

    fn measure_width(&self, _probe: &SimProbe) -> f64 {
        let mut state = self.state.borrow_mut();
        let width = state.widths.pop_front().unwrap_or(state.last_width);
        state.last_width = width;
        state.measurements.push(width);
        width
    }

    fn remove_probe(&self, probe: SimProbe) {
        let mut state = self.state.borrow_mut();
        if state.live_probes.remove(&probe).is_some() {
            state.removed_probes += 1;
        }
    }

    fn on_document_ready(&self, callback: Callback) {
        if !self.document {
            tracing::debug!("document-ready listener dropped: no document");
            return;
        }
        let already_ready = self.state.borrow().document_ready;
        if already_ready {
            self.schedule_delayed(callback, Duration::ZERO);
        } else {
            self.state.borrow_mut().ready_listeners.push(callback);
        }
    }

    fn schedule_delayed(&self, callback: Callback, delay: Duration) {
        let mut state = self.state.borrow_mut();
        let due = state.now + delay;
        let seq = state.next_seq;
        state.next_seq += 1;
        state.timers.insert((due, seq), callback);
    }

    fn warn(&self, message: &str) {
        self.state.borrow_mut().warnings.push(message.to_owned());
    }
}
