//! Bootstrap configuration.
//!
//! Every field has a default matching the stock bundle, so an empty file (or
//! no file at all) yields a working configuration.

use std::cmp::Ordering;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::types::MusicFontSymbol;

/// Errors from loading or validating configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unknown config format for {0:?} (expected .yaml, .yml or .json)")]
    UnknownFormat(String),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Top-level environment configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvConfig {
    /// Explicit bundle URL. Skips automatic script location when set.
    pub script_file: Option<String>,
    pub locator: LocatorConfig,
    pub font: FontProbeConfig,
}

/// Script Locator settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocatorConfig {
    /// Attribute marking the bundle's `<script>` tag.
    pub marker_attribute: String,
}

impl Default for LocatorConfig {
    fn default() -> Self {
        Self {
            marker_attribute: "data-alphatab".into(),
        }
    }
}

impl LocatorConfig {
    /// CSS selector for the marked script element.
    pub fn marker_selector(&self) -> String {
        format!("script[{}]", self.marker_attribute)
    }
}

/// Font Load Detector settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FontProbeConfig {
    /// Canary font family.
    pub family: String,
    /// Size prefix of the native font-load request.
    pub load_descriptor_size: String,
    pub probe_element_id: String,
    pub probe_class: String,
    pub glyph: MusicFontSymbol,
    /// Probe font size in pixels.
    pub reference_size: f64,
    /// Exclusive lower bound of the "loaded" width interval.
    pub min_width: f64,
    /// Exclusive upper bound of the "loaded" width interval.
    pub max_width: f64,
    pub poll_interval_ms: u64,
    /// Give up after this many failed measurements. `None` polls forever.
    pub max_attempts: Option<u32>,
}

impl Default for FontProbeConfig {
    fn default() -> Self {
        Self {
            family: "alphaTab".into(),
            load_descriptor_size: "1em".into(),
            probe_element_id: "alphaTabFontChecker".into(),
            probe_class: "at".into(),
            glyph: MusicFontSymbol::ClefG,
            reference_size: 100.0,
            min_width: 30.0,
            max_width: 100.0,
            poll_interval_ms: 1000,
            max_attempts: None,
        }
    }
}

impl FontProbeConfig {
    /// CSS font shorthand passed to the native font-loading API.
    pub fn load_descriptor(&self) -> String {
        format!("{} {}", self.load_descriptor_size, self.family)
    }

    /// Whether a measured probe width means the canary font is in use.
    pub fn width_indicates_loaded(&self, width: f64) -> bool {
        width > self.min_width && width < self.max_width
    }
}

impl EnvConfig {
    /// Load configuration from a `.yaml`, `.yml` or `.json` file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let data = std::fs::read_to_string(path)?;
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        let config: Self = match ext.as_deref() {
            Some("yaml") | Some("yml") => serde_yaml::from_str(&data)?,
            Some("json") => serde_json::from_str(&data)?,
            _ => return Err(ConfigError::UnknownFormat(path.display().to_string())),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let font = &self.font;
        if font.family.trim().is_empty() {
            return Err(ConfigError::Invalid("font.family must not be empty".into()));
        }
        if font.reference_size.is_nan() || font.reference_size <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "font.reference_size must be positive, got {}",
                font.reference_size
            )));
        }
        if font.min_width.partial_cmp(&font.max_width) != Some(Ordering::Less) {
            return Err(ConfigError::Invalid(format!(
                "font width interval ({}, {}) is empty",
                font.min_width, font.max_width
            )));
        }
        if font.poll_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "font.poll_interval_ms must be non-zero".into(),
            ));
        }
        if font.max_attempts == Some(0) {
            return Err(ConfigError::Invalid(
                "font.max_attempts must be at least 1 when set".into(),
            ));
        }
        if self.locator.marker_attribute.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "locator.marker_attribute must not be empty".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_match_stock_bundle() {
        let config = EnvConfig::default();
        assert_eq!(config.script_file, None);
        assert_eq!(config.locator.marker_selector(), "script[data-alphatab]");
        assert_eq!(config.font.load_descriptor(), "1em alphaTab");
        assert_eq!(config.font.poll_interval_ms, 1000);
        assert_eq!(config.font.max_attempts, None);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn width_interval_is_exclusive() {
        let font = FontProbeConfig::default();
        assert!(!font.width_indicates_loaded(20.0));
        assert!(!font.width_indicates_loaded(30.0));
        assert!(font.width_indicates_loaded(50.0));
        assert!(font.width_indicates_loaded(99.9));
        assert!(!font.width_indicates_loaded(100.0));
    }

    #[test]
    fn load_yaml_with_partial_fields() {
        let mut tmp = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(tmp, "script_file: https://cdn/x/lib.js").unwrap();
        writeln!(tmp, "font:").unwrap();
        writeln!(tmp, "  max_attempts: 5").unwrap();
        writeln!(tmp, "  poll_interval_ms: 250").unwrap();

        let config = EnvConfig::load(tmp.path()).unwrap();
        assert_eq!(config.script_file.as_deref(), Some("https://cdn/x/lib.js"));
        assert_eq!(config.font.max_attempts, Some(5));
        assert_eq!(config.font.poll_interval_ms, 250);
        assert_eq!(config.font.family, "alphaTab");
    }

    #[test]
    fn load_json() {
        let mut tmp = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(tmp, r#"{{"locator": {{"marker_attribute": "data-score"}}}}"#).unwrap();

        let config = EnvConfig::load(tmp.path()).unwrap();
        assert_eq!(config.locator.marker_selector(), "script[data-score]");
    }

    #[test]
    fn unknown_extension_rejected() {
        let tmp = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        let err = EnvConfig::load(tmp.path()).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownFormat(_)));
    }

    #[test]
    fn empty_interval_rejected() {
        let mut config = EnvConfig::default();
        config.font.min_width = 100.0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn zero_poll_interval_rejected() {
        let mut config = EnvConfig::default();
        config.font.poll_interval_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_max_attempts_rejected() {
        let mut config = EnvConfig::default();
        config.font.max_attempts = Some(0);
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        config.font.max_attempts = Some(1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn blank_family_rejected() {
        let mut config = EnvConfig::default();
        config.font.family = "  ".into();
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn non_positive_reference_size_rejected() {
        for size in [0.0, -12.0, f64::NAN] {
            let mut config = EnvConfig::default();
            config.font.reference_size = size;
            assert!(
                matches!(config.validate(), Err(ConfigError::Invalid(_))),
                "reference_size {size} accepted"
            );
        }
    }

    #[test]
    fn blank_marker_attribute_rejected() {
        let mut config = EnvConfig::default();
        config.locator.marker_attribute = String::new();
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn zero_max_attempts_in_file_rejected() {
        let mut tmp = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(tmp, "font:").unwrap();
        writeln!(tmp, "  max_attempts: 0").unwrap();
        assert!(matches!(
            EnvConfig::load(tmp.path()),
            Err(ConfigError::Invalid(_))
        ));
    }
}
