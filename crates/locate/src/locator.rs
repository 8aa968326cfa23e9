use std::fmt;

use tabscore_common::LocatorConfig;
use tabscore_host::Host;

use crate::stack::{StackDialect, script_from_stack};

/// Why the script location could not be determined.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LocateError {
    #[error("already running inside a worker")]
    InWorker,
    #[error("no document to inspect")]
    NoDocument,
    #[error("script location could not be resolved")]
    Unresolved,
}

/// Which fallback produced the location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LocateSource {
    /// Supplied explicitly in configuration; the locator never ran.
    Configured,
    CurrentScript,
    StackTrace(StackDialect),
    MarkerAttribute,
}

impl fmt::Display for LocateSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Configured => f.write_str("configured"),
            Self::CurrentScript => f.write_str("current-script"),
            Self::StackTrace(dialect) => write!(f, "stack-trace({dialect})"),
            Self::MarkerAttribute => f.write_str("marker-attribute"),
        }
    }
}

/// A resolved bundle URL and how it was found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptLocation {
    pub url: String,
    pub source: LocateSource,
}

impl ScriptLocation {
    pub fn new(url: impl Into<String>, source: LocateSource) -> Self {
        Self {
            url: url.into(),
            source,
        }
    }
}

/// Ordered fallback search for the executing bundle's URL.
///
/// 1. The host's currently executing `<script>`.
/// 2. The first URL in a captured stack trace, by [`StackDialect::ORDER`].
/// 3. A `<script>` carrying the configured marker attribute.
#[derive(Debug, Clone)]
pub struct ScriptLocator {
    marker_selector: String,
}

impl ScriptLocator {
    pub fn new(config: &LocatorConfig) -> Self {
        Self {
            marker_selector: config.marker_selector(),
        }
    }

    pub fn locate<H: Host + ?Sized>(&self, host: &H) -> Result<ScriptLocation, LocateError> {
        if host.is_worker_context() {
            return Err(LocateError::InWorker);
        }
        if !host.has_document() {
            return Err(LocateError::NoDocument);
        }

        if let Some(script) = host.currently_executing_script() {
            if let Some(url) = script.resolvable_source() {
                return Ok(ScriptLocation::new(url, LocateSource::CurrentScript));
            }
        }

        match host.capture_stack_trace() {
            Some(stack) => {
                if let Some((dialect, url)) = script_from_stack(&stack) {
                    return Ok(ScriptLocation::new(url, LocateSource::StackTrace(dialect)));
                }
                tracing::debug!(len = stack.len(), "no stack dialect matched");
            }
            None => tracing::debug!("host produced no stack trace"),
        }

        if let Some(script) = host.query_script(&self.marker_selector) {
            if let Some(url) = script.resolvable_source() {
                return Ok(ScriptLocation::new(url, LocateSource::MarkerAttribute));
            }
        }

        Err(LocateError::Unresolved)
    }
}

/// Run the locator, reporting an unresolved location through the host's
/// diagnostic channel. Worker and document-less hosts are skipped silently.
pub fn resolve_script_location<H: Host + ?Sized>(
    host: &H,
    config: &LocatorConfig,
) -> Option<ScriptLocation> {
    let _span = tracing::info_span!("script_locate").entered();
    match ScriptLocator::new(config).locate(host) {
        Ok(location) => {
            tracing::info!(url = %location.url, source = %location.source, "script location resolved");
            Some(location)
        }
        Err(LocateError::Unresolved) => {
            let message = format!(
                "Could not automatically find the script file for the worker. Add the {} \
                 attribute to the script tag that includes the bundle, or set script_file \
                 in the configuration.",
                config.marker_attribute
            );
            tracing::warn!("{message}");
            host.warn(&message);
            None
        }
        Err(err) => {
            tracing::debug!(%err, "script location not needed");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tabscore_host::SimHost;

    const ALPHATAB_URL: &str = "https://example.com/app/alphaTab.js";

    fn locate(host: &SimHost) -> Result<ScriptLocation, LocateError> {
        ScriptLocator::new(&LocatorConfig::default()).locate(host)
    }

    #[test]
    fn current_script_short_circuits() {
        let host = SimHost::document()
            .with_current_script("https://cdn/x/lib.js")
            .with_stack("at https://other.example/other.js:1:1");

        let location = locate(&host).unwrap();
        assert_eq!(location.url, "https://cdn/x/lib.js");
        assert_eq!(location.source, LocateSource::CurrentScript);
        assert_eq!(host.stack_captures(), 0);
        assert!(host.script_queries().is_empty());
    }

    #[test]
    fn empty_current_script_falls_through_to_stack() {
        let host = SimHost::document()
            .with_current_script("")
            .with_stack(format!("@{ALPHATAB_URL}:42:7"));

        let location = locate(&host).unwrap();
        assert_eq!(location.url, ALPHATAB_URL);
        assert!(matches!(location.source, LocateSource::StackTrace(_)));
        assert_eq!(host.stack_captures(), 1);
    }

    #[test]
    fn stack_trace_wins_over_marker() {
        let host = SimHost::document()
            .with_stack(format!("    at {ALPHATAB_URL}:10:2"))
            .with_marker_script("data-alphatab", "https://cdn/marked.js");

        let location = locate(&host).unwrap();
        assert_eq!(
            location.source,
            LocateSource::StackTrace(StackDialect::AtUrl)
        );
        assert!(host.script_queries().is_empty());
    }

    #[test]
    fn unmatched_stack_falls_through_to_marker() {
        let host = SimHost::document()
            .with_stack("Error: boom\n    at <anonymous>")
            .with_marker_script("data-alphatab", "https://cdn/marked.js");

        let location = locate(&host).unwrap();
        assert_eq!(location.url, "https://cdn/marked.js");
        assert_eq!(location.source, LocateSource::MarkerAttribute);
    }

    #[test]
    fn missing_stack_falls_through_to_marker() {
        let host = SimHost::document().with_marker_script("data-alphatab", "https://cdn/marked.js");

        let location = locate(&host).unwrap();
        assert_eq!(location.source, LocateSource::MarkerAttribute);
        assert_eq!(host.stack_captures(), 1);
        assert_eq!(host.script_queries(), vec!["script[data-alphatab]"]);
    }

    #[test]
    fn custom_marker_attribute() {
        let config = LocatorConfig {
            marker_attribute: "data-score".into(),
        };
        let host = SimHost::document().with_marker_script("data-score", "https://cdn/score.js");

        let location = ScriptLocator::new(&config).locate(&host).unwrap();
        assert_eq!(location.url, "https://cdn/score.js");
    }

    #[test]
    fn nothing_found_is_unresolved() {
        let host = SimHost::document().with_stack("garbage");
        assert_eq!(locate(&host), Err(LocateError::Unresolved));
    }

    #[test]
    fn worker_and_headless_are_skipped() {
        assert_eq!(locate(&SimHost::worker()), Err(LocateError::InWorker));
        assert_eq!(locate(&SimHost::headless()), Err(LocateError::NoDocument));
    }

    #[test]
    fn unresolved_emits_one_warning() {
        let host = SimHost::document();
        let location = resolve_script_location(&host, &LocatorConfig::default());
        assert_eq!(location, None);

        let warnings = host.warnings();
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("data-alphatab"));
    }

    #[test]
    fn worker_does_not_warn() {
        let host = SimHost::worker();
        assert_eq!(resolve_script_location(&host, &LocatorConfig::default()), None);
        assert!(host.warnings().is_empty());
    }

    #[test]
    fn resolved_does_not_warn() {
        let host = SimHost::document().with_current_script(ALPHATAB_URL);
        let location = resolve_script_location(&host, &LocatorConfig::default()).unwrap();
        assert_eq!(location.url, ALPHATAB_URL);
        assert!(host.warnings().is_empty());
    }
}
