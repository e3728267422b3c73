//! Strongly typed daemon configuration.
//!
//! The configuration document is TOML: a top-level default duration plus one
//! ordered app list per quadrant. The whole document is validated at load
//! time; the first structural error aborts startup before any device I/O.
//!
//! ```toml
//! default-duration = 5.0
//!
//! [[top-left]]
//! app = "cpu"
//! scope = "panel"
//!
//! [[bottom-left]]
//! app = "memory-battery"
//! duration = 10.0
//! animate = true
//! ```

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::frame::Quadrant;

/// Process-wide default slot duration when a slot gives none.
pub const DEFAULT_DURATION_SECS: f64 = 5.0;

/// Configuration load or validation failure. Fatal at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("cannot parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Whether an app paints one quadrant or the whole panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Scope {
    #[default]
    Quadrant,
    Panel,
}

/// Free-form per-slot arguments forwarded to the app's draw function.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct AppArgs(toml::Table);

impl AppArgs {
    #[must_use]
    pub fn get_f64(&self, key: &str) -> Option<f64> {
        match self.0.get(key) {
            Some(toml::Value::Float(v)) => Some(*v),
            Some(toml::Value::Integer(v)) => Some(*v as f64),
            _ => None,
        }
    }

    #[must_use]
    pub fn get_bool(&self, key: &str) -> Option<bool> {
        match self.0.get(key) {
            Some(toml::Value::Boolean(v)) => Some(*v),
            _ => None,
        }
    }

    #[must_use]
    pub fn get_str(&self, key: &str) -> Option<&str> {
        match self.0.get(key) {
            Some(toml::Value::String(v)) => Some(v),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// One configured app entry in a quadrant's rotation.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SlotConfig {
    pub app: String,
    #[serde(default)]
    pub args: AppArgs,
    /// Seconds this slot stays active; `default-duration` if absent.
    pub duration: Option<f64>,
    #[serde(default)]
    pub animate: bool,
    #[serde(default)]
    pub scope: Scope,
}

impl SlotConfig {
    /// Effective duration given the document default.
    #[must_use]
    pub fn effective_duration(&self, default: Duration) -> Duration {
        self.duration.map_or(default, Duration::from_secs_f64)
    }
}

/// The full configuration document.
///
/// A missing quadrant key leaves that quadrant dark; a present but empty
/// list is rejected.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(rename = "default-duration", default = "default_duration")]
    pub default_duration: f64,
    #[serde(rename = "top-left", default)]
    top_left: Option<Vec<SlotConfig>>,
    #[serde(rename = "bottom-left", default)]
    bottom_left: Option<Vec<SlotConfig>>,
    #[serde(rename = "top-right", default)]
    top_right: Option<Vec<SlotConfig>>,
    #[serde(rename = "bottom-right", default)]
    bottom_right: Option<Vec<SlotConfig>>,
}

const fn default_duration() -> f64 {
    DEFAULT_DURATION_SECS
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_duration: DEFAULT_DURATION_SECS,
            top_left: None,
            bottom_left: None,
            top_right: None,
            bottom_right: None,
        }
    }
}

impl Config {
    /// Parse and fully validate a TOML document.
    ///
    /// # Errors
    /// Any structural or semantic problem is reported immediately.
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate the document at `path`.
    ///
    /// # Errors
    /// See [`Config::from_toml`]; I/O failures are also fatal.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml(&text)
    }

    /// The configured slot list for `quadrant` (empty if absent).
    #[must_use]
    pub fn slots(&self, quadrant: Quadrant) -> &[SlotConfig] {
        let list = match quadrant {
            Quadrant::TopLeft => &self.top_left,
            Quadrant::BottomLeft => &self.bottom_left,
            Quadrant::TopRight => &self.top_right,
            Quadrant::BottomRight => &self.bottom_right,
        };
        list.as_deref().unwrap_or(&[])
    }

    /// Document default duration.
    #[must_use]
    pub fn default_slot_duration(&self) -> Duration {
        Duration::from_secs_f64(self.default_duration)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if !(self.default_duration.is_finite() && self.default_duration > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "default-duration must be a positive number of seconds, got {}",
                self.default_duration
            )));
        }
        for quadrant in Quadrant::ALL {
            if self.is_present_but_empty(quadrant) {
                return Err(ConfigError::Invalid(format!(
                    "quadrant '{quadrant}' has an empty app list"
                )));
            }
            for slot in self.slots(quadrant) {
                if slot.app.is_empty() {
                    return Err(ConfigError::Invalid(format!(
                        "quadrant '{quadrant}' has a slot with an empty app name"
                    )));
                }
                if let Some(duration) = slot.duration {
                    if !(duration.is_finite() && duration > 0.0) {
                        return Err(ConfigError::Invalid(format!(
                            "app '{}' in quadrant '{quadrant}' has non-positive duration {duration}",
                            slot.app
                        )));
                    }
                }
            }
        }
        Ok(())
    }

    fn is_present_but_empty(&self, quadrant: Quadrant) -> bool {
        let list = match quadrant {
            Quadrant::TopLeft => &self.top_left,
            Quadrant::BottomLeft => &self.bottom_left,
            Quadrant::TopRight => &self.top_right,
            Quadrant::BottomRight => &self.bottom_right,
        };
        matches!(list, Some(slots) if slots.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
        default-duration = 3.0

        [[top-left]]
        app = "cpu"
        scope = "panel"

        [[bottom-left]]
        app = "memory-battery"
        animate = true

        [[top-right]]
        app = "disk"
        duration = 10.0

        [[top-right]]
        app = "temperature"

        [[bottom-right]]
        app = "network"
        [bottom-right.args]
        smoothing = 0.5
    "#;

    #[test]
    fn parses_full_document() {
        let config = Config::from_toml(SAMPLE).unwrap();
        assert_eq!(config.default_duration, 3.0);
        let top_left = config.slots(Quadrant::TopLeft);
        assert_eq!(top_left.len(), 1);
        assert_eq!(top_left[0].scope, Scope::Panel);
        assert!(config.slots(Quadrant::BottomLeft)[0].animate);
        let top_right = config.slots(Quadrant::TopRight);
        assert_eq!(top_right.len(), 2);
        assert_eq!(
            top_right[0].effective_duration(config.default_slot_duration()),
            Duration::from_secs(10)
        );
        assert_eq!(
            top_right[1].effective_duration(config.default_slot_duration()),
            Duration::from_secs(3)
        );
        let args = &config.slots(Quadrant::BottomRight)[0].args;
        assert_eq!(args.get_f64("smoothing"), Some(0.5));
    }

    #[test]
    fn rejects_present_but_empty_quadrant() {
        let err = Config::from_toml("top-left = []").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)), "{err}");
    }

    #[test]
    fn missing_quadrants_stay_dark() {
        let config = Config::from_toml("default-duration = 2.0").unwrap();
        for quadrant in Quadrant::ALL {
            assert!(config.slots(quadrant).is_empty());
        }
    }

    #[test]
    fn rejects_unknown_keys() {
        let err = Config::from_toml("default-duratoin = 2.0").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn rejects_non_positive_duration() {
        let doc = r#"
            [[top-left]]
            app = "cpu"
            duration = 0.0
        "#;
        let err = Config::from_toml(doc).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)), "{err}");
    }

    #[test]
    fn rejects_negative_default_duration() {
        let err = Config::from_toml("default-duration = -1.0").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn rejects_empty_app_name() {
        let doc = r#"
            [[bottom-right]]
            app = ""
        "#;
        let err = Config::from_toml(doc).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn rejects_bad_scope() {
        let doc = r#"
            [[top-left]]
            app = "cpu"
            scope = "global"
        "#;
        assert!(Config::from_toml(doc).is_err());
    }

    #[test]
    fn args_typed_accessors() {
        let doc = r#"
            [[top-left]]
            app = "fan"
            [top-left.args]
            max-rpm = 6000
            flip = true
            label = "intake"
        "#;
        let config = Config::from_toml(doc).unwrap();
        let args = &config.slots(Quadrant::TopLeft)[0].args;
        assert_eq!(args.get_f64("max-rpm"), Some(6000.0));
        assert_eq!(args.get_bool("flip"), Some(true));
        assert_eq!(args.get_str("label"), Some("intake"));
        assert_eq!(args.get_f64("missing"), None);
    }
}
