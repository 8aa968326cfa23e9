use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use tabscore_common::EnvConfig;
use tabscore_font::{FontLoadDetector, FontReadiness, FontState, FontStrategy};
use tabscore_host::{Host, HostProfile};
use tabscore_io::{FileLoader, FsFileLoader};
use tabscore_locate::{LocateSource, ScriptLocation, resolve_script_location};
use tabscore_render::{Canvas, DebugTextCanvas, SvgCanvas};

use crate::registry::Registry;

/// A record of what bootstrap established, in the order it happened.
#[derive(Debug, Clone, PartialEq)]
pub enum EnvEvent {
    ScriptLocated { url: String, source: LocateSource },
    /// A document was present but no fallback found the bundle.
    ScriptUnresolved,
    /// Font detection started with this host profile.
    FontDetection(HostProfile),
    FontReady,
}

/// Process-wide bootstrap state, owned by whoever ran [`platform_init`] and
/// passed by reference to everything that needs it.
pub struct Environment {
    profile: HostProfile,
    script_location: Option<ScriptLocation>,
    font: FontReadiness,
    font_strategy: Option<FontStrategy>,
    render_engines: Registry<Box<dyn Canvas>>,
    file_loaders: Registry<Box<dyn FileLoader>>,
    /// Shared with the font-ready observer, which fires after init returns.
    events: Rc<RefCell<Vec<EnvEvent>>>,
}

impl Environment {
    fn new(profile: HostProfile) -> Self {
        Self {
            profile,
            script_location: None,
            font: FontReadiness::new(),
            font_strategy: None,
            render_engines: Registry::new(),
            file_loaders: Registry::new(),
            events: Rc::new(RefCell::new(Vec::new())),
        }
    }

    pub fn profile(&self) -> HostProfile {
        self.profile
    }

    /// URL of the executing bundle, for starting workers with the same code.
    pub fn script_location(&self) -> Option<&str> {
        self.script_location.as_ref().map(|l| l.url.as_str())
    }

    pub fn script_location_source(&self) -> Option<LocateSource> {
        self.script_location.as_ref().map(|l| l.source)
    }

    pub fn font_ready(&self) -> bool {
        self.font.is_ready()
    }

    pub fn font_state(&self) -> FontState {
        self.font.state()
    }

    pub fn font_strategy(&self) -> Option<FontStrategy> {
        self.font_strategy
    }

    /// Handle for observing readiness, e.g. to re-layout once the font arrives.
    pub fn font_readiness(&self) -> FontReadiness {
        self.font.clone()
    }

    pub fn render_engines(&self) -> &Registry<Box<dyn Canvas>> {
        &self.render_engines
    }

    pub fn file_loaders(&self) -> &Registry<Box<dyn FileLoader>> {
        &self.file_loaders
    }

    pub fn register_render_engine(
        &mut self,
        name: impl Into<String>,
        factory: impl Fn() -> Box<dyn Canvas> + 'static,
    ) -> bool {
        self.render_engines.register(name, factory)
    }

    pub fn register_file_loader(
        &mut self,
        name: impl Into<String>,
        factory: impl Fn() -> Box<dyn FileLoader> + 'static,
    ) -> bool {
        self.file_loaders.register(name, factory)
    }

    pub fn create_render_engine(&self, name: &str) -> Option<Box<dyn Canvas>> {
        self.render_engines.create(name)
    }

    pub fn create_file_loader(&self, name: &str) -> Option<Box<dyn FileLoader>> {
        self.file_loaders.create(name)
    }

    /// Read-only access to the event log.
    pub fn events(&self) -> Vec<EnvEvent> {
        self.events.borrow().clone()
    }

    /// Drain and return the event log.
    pub fn drain_events(&mut self) -> Vec<EnvEvent> {
        std::mem::take(&mut *self.events.borrow_mut())
    }

    pub fn summary(&self) -> EnvSummary {
        EnvSummary {
            profile: self.profile,
            script_location: self.script_location().map(str::to_owned),
            script_source: self.script_location_source(),
            font_state: self.font_state(),
            render_engines: self.render_engines.names().map(str::to_owned).collect(),
            file_loaders: self.file_loaders.names().map(str::to_owned).collect(),
        }
    }

    fn record(&self, event: EnvEvent) {
        tracing::debug!(?event, "environment event");
        self.events.borrow_mut().push(event);
    }

    fn register_defaults(&mut self, config: &EnvConfig) {
        for name in ["svg", "default"] {
            let family = config.font.family.clone();
            self.register_render_engine(name, move || {
                Box::new(SvgCanvas::new(family.clone())) as Box<dyn Canvas>
            });
        }
        self.register_render_engine("debug", || Box::new(DebugTextCanvas::new()));
        self.register_file_loader("default", || Box::new(FsFileLoader::new()));
    }
}

impl fmt::Debug for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Environment")
            .field("profile", &self.profile)
            .field("script_location", &self.script_location)
            .field("font", &self.font)
            .field("render_engines", &self.render_engines)
            .field("file_loaders", &self.file_loaders)
            .finish()
    }
}

/// Snapshot of the environment for display.
#[derive(Debug, Clone)]
pub struct EnvSummary {
    pub profile: HostProfile,
    pub script_location: Option<String>,
    pub script_source: Option<LocateSource>,
    pub font_state: FontState,
    pub render_engines: Vec<String>,
    pub file_loaders: Vec<String>,
}

impl fmt::Display for EnvSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let script = match (&self.script_location, self.script_source) {
            (Some(url), Some(source)) => format!("{url} ({source})"),
            (Some(url), None) => url.clone(),
            _ => "<unresolved>".into(),
        };
        write!(
            f,
            "Environment: profile={} script={} font={} render_engines=[{}] file_loaders=[{}]",
            self.profile,
            script,
            self.font_state,
            self.render_engines.join(", "),
            self.file_loaders.join(", ")
        )
    }
}

/// Bootstrap the environment: register default factories, start font
/// detection and resolve the script location.
///
/// Never fails. An unresolved script location leaves
/// [`Environment::script_location`] empty after a host warning; a worker or
/// document-less host leaves the font permanently not ready.
pub fn platform_init<H: Host + 'static>(host: Rc<H>, config: &EnvConfig) -> Environment {
    let _span = tracing::info_span!("platform_init").entered();

    let profile = HostProfile::detect(&*host);
    let mut env = Environment::new(profile);
    env.register_defaults(config);

    let detector = FontLoadDetector::new(config.font.clone());
    env.font = detector.readiness();
    let events = Rc::clone(&env.events);
    env.font.on_ready(move || events.borrow_mut().push(EnvEvent::FontReady));
    match detector.start(Rc::clone(&host), profile) {
        Ok(strategy) => {
            env.font_strategy = Some(strategy);
            env.record(EnvEvent::FontDetection(profile));
        }
        Err(err) => tracing::debug!(%err, "font detection skipped"),
    }

    env.script_location = match &config.script_file {
        Some(url) => Some(ScriptLocation::new(url.clone(), LocateSource::Configured)),
        None => resolve_script_location(&*host, &config.locator),
    };
    match &env.script_location {
        Some(location) => env.record(EnvEvent::ScriptLocated {
            url: location.url.clone(),
            source: location.source,
        }),
        None if profile.has_document() => env.record(EnvEvent::ScriptUnresolved),
        None => {}
    }

    tracing::info!(
        %profile,
        script = env.script_location().unwrap_or("<none>"),
        font = %env.font_state(),
        "environment initialized"
    );
    env
}
