use std::fmt;

use crate::host::Host;

/// What kind of execution context the host is, probed once at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HostProfile {
    /// Background worker: no document, no font subsystem.
    Worker,
    /// Document with a native font-loading completion API.
    NativeFontApi,
    /// Document without the API; fonts are detected by measuring.
    Polling,
    /// Neither a worker nor a document.
    Headless,
}

impl HostProfile {
    pub fn detect<H: Host + ?Sized>(host: &H) -> Self {
        let profile = if host.is_worker_context() {
            Self::Worker
        } else if !host.has_document() {
            Self::Headless
        } else if host.supports_native_font_load() {
            Self::NativeFontApi
        } else {
            Self::Polling
        };
        tracing::debug!(%profile, "host profile detected");
        profile
    }

    pub fn has_document(self) -> bool {
        matches!(self, Self::NativeFontApi | Self::Polling)
    }
}

impl fmt::Display for HostProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Worker => "worker",
            Self::NativeFontApi => "native-font-api",
            Self::Polling => "polling",
            Self::Headless => "headless",
        })
    }
}
