use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use directories_next::ProjectDirs;
use loopconfig::SandboxConfig;

pub const ENV_CONFIG_DIR: &str = "SHADELOOP_CONFIG_DIR";

const QUALIFIER: &str = "org";
const ORGANISATION: &str = "shadeloop";
const APPLICATION: &str = "shadeloop";
const CONFIG_FILE: &str = "shadeloop.toml";

/// Directory holding `shadeloop.toml`. `$SHADELOOP_CONFIG_DIR` wins over the
/// platform config directory.
pub fn config_dir() -> Option<PathBuf> {
    if let Some(dir) = env_override(ENV_CONFIG_DIR) {
        return Some(dir);
    }
    ProjectDirs::from(QUALIFIER, ORGANISATION, APPLICATION)
        .map(|dirs| dirs.config_dir().to_path_buf())
}

/// Loads the configuration. An explicit path must exist; the default file is
/// optional and its absence yields the built-in defaults.
pub fn load_config(explicit: Option<&Path>) -> Result<SandboxConfig> {
    if let Some(path) = explicit {
        return read_config(path);
    }

    let Some(dir) = config_dir() else {
        tracing::warn!("failed to determine user config directory; using defaults");
        return Ok(SandboxConfig::default());
    };
    let path = dir.join(CONFIG_FILE);
    if !path.exists() {
        tracing::debug!(path = %path.display(), "no config file; using defaults");
        return Ok(SandboxConfig::default());
    }
    read_config(&path)
}

fn read_config(path: &Path) -> Result<SandboxConfig> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    let config = SandboxConfig::from_toml_str(&text)
        .with_context(|| format!("failed to load config {}", path.display()))?;
    tracing::debug!(path = %path.display(), "loaded config");
    Ok(config)
}

fn env_override(name: &str) -> Option<PathBuf> {
    env::var_os(name).and_then(|value| {
        if value.is_empty() {
            None
        } else {
            Some(PathBuf::from(value))
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_config_is_parsed() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("custom.toml");
        fs::write(&path, "[window]\ntitle = \"custom\"\n").expect("write");
        let config = load_config(Some(&path)).expect("load");
        assert_eq!(config.window.title, "custom");
    }

    #[test]
    fn missing_explicit_config_is_an_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let err = load_config(Some(&dir.path().join("absent.toml"))).unwrap_err();
        assert!(format!("{err:#}").contains("absent.toml"));
    }

    #[test]
    fn invalid_config_reports_path() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("bad.toml");
        fs::write(&path, "version = 7\n").expect("write");
        let err = load_config(Some(&path)).unwrap_err();
        let message = format!("{err:#}");
        assert!(message.contains("bad.toml"));
        assert!(message.contains("unsupported config version"));
    }
}
