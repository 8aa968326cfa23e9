use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Duration;

use tabscore_common::FontProbeConfig;
use tabscore_host::{Host, HostProfile, ProbeStyle};

use crate::readiness::{FontReadiness, FontState};

/// Errors from starting font detection.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FontError {
    #[error("font detection unavailable in a {0} context")]
    Unavailable(HostProfile),
    #[error("font detection already started (state: {0})")]
    AlreadyStarted(FontState),
}

/// How readiness will be established.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FontStrategy {
    /// One completion callback from the host's font-loading API.
    NativeApi,
    /// Measure a hidden probe glyph until its width matches the canary font.
    Polling,
}

/// Starts detection for one canary font and exposes its readiness.
pub struct FontLoadDetector {
    config: Rc<FontProbeConfig>,
    readiness: FontReadiness,
}

impl FontLoadDetector {
    pub fn new(config: FontProbeConfig) -> Self {
        Self {
            config: Rc::new(config),
            readiness: FontReadiness::new(),
        }
    }

    pub fn readiness(&self) -> FontReadiness {
        self.readiness.clone()
    }

    /// Pick a strategy from `profile` and kick it off. Returns without
    /// waiting; progress is driven by host callbacks.
    pub fn start<H: Host + 'static>(
        &self,
        host: Rc<H>,
        profile: HostProfile,
    ) -> Result<FontStrategy, FontError> {
        let _span = tracing::info_span!("font_check", family = %self.config.family).entered();

        let state = self.readiness.state();
        if state != FontState::Unknown {
            return Err(FontError::AlreadyStarted(state));
        }

        match profile {
            HostProfile::Worker | HostProfile::Headless => {
                self.readiness.advance(FontState::Unavailable);
                tracing::debug!(%profile, "no font subsystem");
                Err(FontError::Unavailable(profile))
            }
            HostProfile::NativeFontApi => {
                self.readiness.advance(FontState::Loading);
                let readiness = self.readiness.clone();
                let descriptor = self.config.load_descriptor();
                tracing::debug!(%descriptor, "requesting native font load");
                host.request_font_load(
                    &descriptor,
                    Box::new(move || {
                        if readiness.advance(FontState::Ready) {
                            tracing::info!("font loaded (native API)");
                        }
                    }),
                );
                Ok(FontStrategy::NativeApi)
            }
            HostProfile::Polling => {
                self.readiness.advance(FontState::Loading);
                let poller = Rc::new(Poller {
                    style: ProbeStyle::from_config(&self.config),
                    config: Rc::clone(&self.config),
                    readiness: self.readiness.clone(),
                    probe: RefCell::new(None),
                    attempts: Cell::new(0),
                    host: Rc::clone(&host),
                });
                host.on_document_ready(Box::new(move || poller.check()));
                Ok(FontStrategy::Polling)
            }
        }
    }
}

/// One polling cycle's state. Each check schedules the next only after it
/// has measured, so checks never overlap.
struct Poller<H: Host> {
    host: Rc<H>,
    config: Rc<FontProbeConfig>,
    style: ProbeStyle,
    readiness: FontReadiness,
    probe: RefCell<Option<H::Probe>>,
    attempts: Cell<u32>,
}

impl<H: Host + 'static> Poller<H> {
    fn check(self: Rc<Self>) {
        if self.readiness.state().is_terminal() {
            self.release_probe();
            return;
        }

        let width = match self.measure() {
            Ok(width) => Some(width),
            Err(err) => {
                tracing::debug!(%err, "font probe unavailable");
                None
            }
        };
        let attempt = self.attempts.get() + 1;
        self.attempts.set(attempt);
        tracing::trace!(attempt, ?width, "font probe measured");

        if width.is_some_and(|w| self.config.width_indicates_loaded(w)) {
            self.readiness.advance(FontState::Ready);
            self.release_probe();
            tracing::info!(attempt, "font loaded (probe width)");
            return;
        }

        if let Some(max) = self.config.max_attempts {
            if attempt >= max {
                self.readiness.advance(FontState::GaveUp);
                self.release_probe();
                let message = format!(
                    "Font '{}' did not load after {attempt} checks; glyph metrics may be wrong.",
                    self.config.family
                );
                tracing::warn!("{message}");
                self.host.warn(&message);
                return;
            }
        }

        let delay = Duration::from_millis(self.config.poll_interval_ms);
        let next = Rc::clone(&self);
        self.host
            .schedule_delayed(Box::new(move || next.check()), delay);
    }

    fn measure(&self) -> Result<f64, tabscore_host::HostError> {
        let mut slot = self.probe.borrow_mut();
        let probe = match slot.take() {
            Some(probe) => probe,
            None => self.host.create_probe(self.config.glyph, &self.style)?,
        };
        let width = self.host.measure_width(&probe);
        *slot = Some(probe);
        Ok(width)
    }

    fn release_probe(&self) {
        if let Some(probe) = self.probe.borrow_mut().take() {
            self.host.remove_probe(probe);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tabscore_common::MusicFontSymbol;
    use tabscore_host::SimHost;

    fn polling(host: SimHost, config: FontProbeConfig) -> (Rc<SimHost>, FontReadiness) {
        let host = Rc::new(host);
        let detector = FontLoadDetector::new(config);
        let strategy = detector
            .start(Rc::clone(&host), HostProfile::detect(&*host))
            .unwrap();
        assert_eq!(strategy, FontStrategy::Polling);
        (host, detector.readiness())
    }

    #[test]
    fn width_boundaries() {
        for (width, ready) in [
            (20.0, false),
            (30.0, false),
            (50.0, true),
            (99.9, true),
            (100.0, false),
        ] {
            let (host, readiness) =
                polling(SimHost::document().with_widths([width]), FontProbeConfig::default());
            host.fire_document_ready();

            assert_eq!(readiness.is_ready(), ready, "width {width}");
            if ready {
                assert_eq!(host.pending_timers(), 0, "width {width}");
                assert_eq!(host.live_probes(), 0, "width {width}");
            } else {
                assert_eq!(host.pending_timers(), 1, "width {width}");
                assert_eq!(host.live_probes(), 1, "width {width}");
                assert_eq!(readiness.state(), FontState::Loading);
            }
        }
    }

    #[test]
    fn polling_waits_for_document_ready() {
        let (host, readiness) =
            polling(SimHost::document().with_widths([50.0]), FontProbeConfig::default());
        assert_eq!(readiness.state(), FontState::Loading);
        assert_eq!(host.created_probes(), 0);
        assert!(host.measurements().is_empty());

        host.fire_document_ready();
        assert!(readiness.is_ready());
    }

    #[test]
    fn polling_retries_every_second_until_loaded() {
        let (host, readiness) = polling(
            SimHost::document().with_widths([12.0, 12.0, 12.0, 64.0]),
            FontProbeConfig::default(),
        );
        host.fire_document_ready();
        assert!(!readiness.is_ready());

        assert_eq!(host.advance(Duration::from_millis(999)), 0);
        assert_eq!(host.advance(Duration::from_millis(1)), 1);
        assert!(!readiness.is_ready());

        host.advance(Duration::from_millis(2000));
        assert!(readiness.is_ready());
        assert_eq!(host.measurements(), vec![12.0, 12.0, 12.0, 64.0]);
        assert_eq!(host.now(), Duration::from_millis(3000));
        assert_eq!(host.created_probes(), 1);
        assert_eq!(host.removed_probes(), 1);
        assert_eq!(host.pending_timers(), 0);
    }

    #[test]
    fn probe_is_singleton_and_styled() {
        let (host, _) = polling(SimHost::document().with_widths([0.0]), FontProbeConfig::default());
        host.fire_document_ready();
        host.run_until_idle(10);

        assert_eq!(host.created_probes(), 1);
        assert_eq!(host.measurements().len(), 11);
        let (glyph, style) = host.last_probe().unwrap();
        assert_eq!(glyph, MusicFontSymbol::ClefG);
        assert_eq!(style.font_size, 100.0);
        assert_eq!(style.font_family, "alphaTab");
        assert_eq!(style.element_id, "alphaTabFontChecker");
    }

    #[test]
    fn unbounded_by_default() {
        let (host, readiness) =
            polling(SimHost::document().with_widths([0.0]), FontProbeConfig::default());
        host.fire_document_ready();
        assert_eq!(host.run_until_idle(500), 500);
        assert_eq!(readiness.state(), FontState::Loading);
        assert_eq!(host.pending_timers(), 1);
        assert!(host.warnings().is_empty());
    }

    #[test]
    fn bounded_polling_gives_up() {
        let config = FontProbeConfig {
            max_attempts: Some(3),
            ..FontProbeConfig::default()
        };
        let (host, readiness) = polling(SimHost::document().with_widths([0.0]), config);
        host.fire_document_ready();
        host.run_until_idle(100);

        assert_eq!(readiness.state(), FontState::GaveUp);
        assert_eq!(host.measurements().len(), 3);
        assert_eq!(host.pending_timers(), 0);
        assert_eq!(host.live_probes(), 0);
        assert_eq!(host.warnings().len(), 1);
    }

    #[test]
    fn custom_poll_interval() {
        let config = FontProbeConfig {
            poll_interval_ms: 250,
            ..FontProbeConfig::default()
        };
        let (host, readiness) = polling(SimHost::document().with_widths([0.0, 40.0]), config);
        host.fire_document_ready();
        host.advance(Duration::from_millis(250));
        assert!(readiness.is_ready());
    }

    #[test]
    fn native_api_single_callback() {
        let host = Rc::new(SimHost::document().with_native_font_api());
        let detector = FontLoadDetector::new(FontProbeConfig::default());
        let strategy = detector
            .start(Rc::clone(&host), HostProfile::detect(&*host))
            .unwrap();
        assert_eq!(strategy, FontStrategy::NativeApi);
        assert_eq!(host.font_requests(), vec!["1em alphaTab"]);
        assert_eq!(host.pending_font_loads(), 1);
        assert_eq!(detector.readiness().state(), FontState::Loading);

        assert_eq!(host.complete_font_loads(), 1);
        assert_eq!(host.pending_font_loads(), 0);
        assert!(detector.readiness().is_ready());
        assert_eq!(host.created_probes(), 0);
        assert_eq!(host.pending_timers(), 0);
    }

    #[test]
    fn worker_is_unavailable_without_side_effects() {
        let host = Rc::new(SimHost::worker().with_widths([50.0]));
        let detector = FontLoadDetector::new(FontProbeConfig::default());
        let err = detector
            .start(Rc::clone(&host), HostProfile::detect(&*host))
            .unwrap_err();

        assert_eq!(err, FontError::Unavailable(HostProfile::Worker));
        assert_eq!(detector.readiness().state(), FontState::Unavailable);
        assert!(!detector.readiness().is_ready());
        host.fire_document_ready();
        host.run_until_idle(10);
        assert_eq!(host.pending_timers(), 0);
        assert_eq!(host.created_probes(), 0);
        assert!(host.font_requests().is_empty());
    }

    #[test]
    fn second_start_is_rejected() {
        let host = Rc::new(SimHost::document().with_native_font_api());
        let detector = FontLoadDetector::new(FontProbeConfig::default());
        detector.start(Rc::clone(&host), HostProfile::NativeFontApi).unwrap();
        assert_eq!(
            detector.start(Rc::clone(&host), HostProfile::NativeFontApi),
            Err(FontError::AlreadyStarted(FontState::Loading))
        );
        assert_eq!(host.font_requests().len(), 1);
    }

    #[test]
    fn ready_survives_later_events() {
        let (host, readiness) = polling(
            SimHost::document().with_widths([50.0, 0.0]),
            FontProbeConfig::default(),
        );
        host.fire_document_ready();
        assert!(readiness.is_ready());

        host.fire_document_ready();
        host.run_until_idle(10);
        assert!(readiness.is_ready());
        assert_eq!(host.measurements(), vec![50.0]);
    }
}
