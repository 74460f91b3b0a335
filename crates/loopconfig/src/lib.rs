//! TOML configuration for the shadeloop sandbox.
//!
//! ```toml
//! version = 1
//!
//! [window]
//! width = 1280
//! height = 720
//! title = "shadeloop"
//!
//! [gpu]
//! power = "high"
//! vsync = true
//!
//! [shader]
//! path = "shaders/sphere.frag"
//! watch = true
//! watch_interval = "250ms"
//! dump_wrapped = "/tmp/wrapped.frag"
//! ```
//!
//! Every table and field is optional; missing values fall back to defaults.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};

/// Largest accepted window edge in pixels.
pub const MAX_WINDOW_EDGE: u32 = 16_384;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SandboxConfig {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub window: WindowSection,
    #[serde(default)]
    pub gpu: GpuSection,
    #[serde(default)]
    pub shader: ShaderSection,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct WindowSection {
    pub width: u32,
    pub height: u32,
    pub title: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PowerSetting {
    #[default]
    Low,
    High,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct GpuSection {
    pub power: PowerSetting,
    pub vsync: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct ShaderSection {
    /// Fragment shader to edit. The CLI argument wins over this value.
    pub path: Option<PathBuf>,
    pub watch: bool,
    #[serde(
        deserialize_with = "deserialize_duration",
        serialize_with = "serialize_duration"
    )]
    pub watch_interval: Duration,
    pub dump_wrapped: Option<PathBuf>,
}

fn default_version() -> u32 {
    1
}

fn default_watch_interval() -> Duration {
    Duration::from_millis(250)
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            version: default_version(),
            window: WindowSection::default(),
            gpu: GpuSection::default(),
            shader: ShaderSection::default(),
        }
    }
}

impl Default for WindowSection {
    fn default() -> Self {
        Self {
            width: 800,
            height: 600,
            title: "shadeloop".to_string(),
        }
    }
}

impl Default for GpuSection {
    fn default() -> Self {
        Self {
            power: PowerSetting::Low,
            vsync: true,
        }
    }
}

impl Default for ShaderSection {
    fn default() -> Self {
        Self {
            path: None,
            watch: false,
            watch_interval: default_watch_interval(),
            dump_wrapped: None,
        }
    }
}

/// Parses a duration the same way config files do: humantime text such as
/// `"250ms"`, or a bare number of seconds.
pub fn parse_duration(value: &str) -> Result<Duration, String> {
    let trimmed = value.trim();
    if let Ok(seconds) = trimmed.parse::<f64>() {
        if seconds.is_nan() || seconds.is_sign_negative() {
            return Err("duration must be non-negative".into());
        }
        return Ok(Duration::from_secs_f64(seconds));
    }
    humantime::parse_duration(trimmed).map_err(|err| format!("invalid duration '{trimmed}': {err}"))
}

fn serialize_duration<S>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_str(&humantime::format_duration(*value).to_string())
}

fn deserialize_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    struct Visitor;
    impl<'de> de::Visitor<'de> for Visitor {
        type Value = Duration;

        fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
            formatter.write_str("a duration as number of seconds or human-readable string")
        }

        fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            humantime::parse_duration(v)
                .map_err(|err| E::custom(format!("invalid duration '{v}': {err}")))
        }

        fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            if v < 0 {
                return Err(E::custom("duration must be non-negative"));
            }
            Ok(Duration::from_secs(v as u64))
        }

        fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(Duration::from_secs(v))
        }

        fn visit_f64<E>(self, v: f64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            if v.is_nan() || v.is_sign_negative() {
                return Err(E::custom("duration must be non-negative"));
            }
            Ok(Duration::from_secs_f64(v))
        }
    }

    deserializer.deserialize_any(Visitor)
}

impl SandboxConfig {
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let raw: SandboxConfig = toml::from_str(input)?;
        raw.validate()?;
        Ok(raw)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.version != 1 {
            return Err(ConfigError::Invalid(format!(
                "unsupported config version {}; expected 1",
                self.version
            )));
        }

        let WindowSection {
            width,
            height,
            title,
        } = &self.window;
        if *width == 0 || *height == 0 {
            return Err(ConfigError::Invalid(format!(
                "window size must be non-zero, got {width}x{height}"
            )));
        }
        if *width > MAX_WINDOW_EDGE || *height > MAX_WINDOW_EDGE {
            return Err(ConfigError::Invalid(format!(
                "window size {width}x{height} exceeds {MAX_WINDOW_EDGE} pixels per edge"
            )));
        }
        if title.trim().is_empty() {
            return Err(ConfigError::Invalid("window.title may not be empty".into()));
        }

        if self.shader.watch_interval.is_zero() {
            return Err(ConfigError::Invalid(
                "shader.watch_interval must be greater than zero".into(),
            ));
        }

        if let Some(path) = &self.shader.path {
            if path.as_os_str().is_empty() {
                return Err(ConfigError::Invalid("shader.path may not be empty".into()));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
version = 1

[window]
width = 1280
height = 720
title = "sphere"

[gpu]
power = "high"
vsync = false

[shader]
path = "shaders/sphere.frag"
watch = true
watch_interval = "500ms"
dump_wrapped = "/tmp/wrapped.frag"
"#;

    #[test]
    fn parses_sample_config() {
        let config = SandboxConfig::from_toml_str(SAMPLE).expect("parse config");
        assert_eq!(config.window.width, 1280);
        assert_eq!(config.window.height, 720);
        assert_eq!(config.window.title, "sphere");
        assert_eq!(config.gpu.power, PowerSetting::High);
        assert!(!config.gpu.vsync);
        assert_eq!(
            config.shader.path.as_deref(),
            Some(std::path::Path::new("shaders/sphere.frag"))
        );
        assert!(config.shader.watch);
        assert_eq!(config.shader.watch_interval, Duration::from_millis(500));
        assert!(config.shader.dump_wrapped.is_some());
    }

    #[test]
    fn empty_document_yields_defaults() {
        let config = SandboxConfig::from_toml_str("").expect("parse config");
        assert_eq!(config, SandboxConfig::default());
        assert_eq!(config.shader.watch_interval, Duration::from_millis(250));
        assert!(config.gpu.vsync);
    }

    #[test]
    fn numeric_interval_is_seconds() {
        let config = SandboxConfig::from_toml_str("[shader]\nwatch_interval = 2\n")
            .expect("parse config");
        assert_eq!(config.shader.watch_interval, Duration::from_secs(2));
    }

    #[test]
    fn parse_duration_accepts_text_and_seconds() {
        assert_eq!(parse_duration("250ms"), Ok(Duration::from_millis(250)));
        assert_eq!(parse_duration("1.5"), Ok(Duration::from_millis(1500)));
        assert!(parse_duration("-1").is_err());
        assert!(parse_duration("later").is_err());
    }

    #[test]
    fn rejects_unknown_version() {
        let err = SandboxConfig::from_toml_str("version = 2").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn rejects_zero_window() {
        let err = SandboxConfig::from_toml_str("[window]\nwidth = 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn rejects_zero_interval() {
        let err = SandboxConfig::from_toml_str("[shader]\nwatch_interval = \"0s\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn rejects_bad_duration_and_unknown_keys() {
        let err = SandboxConfig::from_toml_str("[shader]\nwatch_interval = \"soon\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
        let err = SandboxConfig::from_toml_str("[gpu]\nmsaa = 4\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
