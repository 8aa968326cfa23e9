//! Host context: the boundary between the bootstrap logic and the page or
//! worker it runs in.
//!
//! # Invariants
//! - Core logic only sees plain values (strings, widths, handles); every
//!   browser quirk stays behind [`Host`].
//! - Capabilities are probed once, into a [`HostProfile`].
//! - Callbacks run on the host's single logical thread, never re-entrantly
//!   from inside the call that scheduled them.

mod host;
mod profile;
mod sim;
#[cfg(target_arch = "wasm32")]
mod web;

pub use host::{Callback, Host, HostError, ProbeStyle};
pub use profile::HostProfile;
pub use sim::{SimHost, SimProbe};
#[cfg(target_arch = "wasm32")]
pub use web::BrowserHost;

pub fn crate_info() -> &'static str {
    "tabscore-host v0.1.0"
}
