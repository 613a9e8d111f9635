//! Optional user config at `$ENVSWITCH_HOME/config.toml`.
//!
//! Values here fill in defaults for settings not provided via environment
//! variables; env always wins.

use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Default, Deserialize)]
pub struct UserConfig {
    pub logging: Option<LoggingCfg>,
    pub environments: Option<EnvironmentsCfg>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LoggingCfg {
    pub to_file: Option<bool>,
    pub dir: Option<String>,
    pub json: Option<bool>,
    pub compact: Option<bool>,
    pub pretty: Option<bool>,
    pub level: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct EnvironmentsCfg {
    /// Path to the structured multi-environment YAML file.
    pub yaml_file: Option<String>,
    /// Path to the legacy flat `.env` file.
    pub env_file: Option<String>,
    /// Watch the source files and hot-reload on change.
    pub watch: Option<bool>,
    pub watch_interval_ms: Option<u64>,
}

pub fn load_user_config(home: &Path) -> anyhow::Result<Option<UserConfig>> {
    let path = home.join("config.toml");
    if !path.exists() {
        return Ok(None);
    }
    let s = std::fs::read_to_string(&path)?;
    let cfg: UserConfig = toml::from_str(&s)?;
    Ok(Some(cfg))
}

pub fn expand_home(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/")
        && let Ok(home) = std::env::var("HOME")
    {
        return PathBuf::from(home).join(stripped);
    }
    PathBuf::from(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_config_is_none() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_user_config(dir.path()).unwrap().is_none());
    }

    #[test]
    fn parses_environment_settings() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("config.toml"),
            "[environments]\nyaml_file = \"~/envs.yaml\"\nwatch = false\nwatch_interval_ms = 500\n",
        )
        .unwrap();
        let cfg = load_user_config(dir.path()).unwrap().expect("config");
        let envs = cfg.environments.expect("environments section");
        assert_eq!(envs.yaml_file.as_deref(), Some("~/envs.yaml"));
        assert_eq!(envs.watch, Some(false));
        assert_eq!(envs.watch_interval_ms, Some(500));
    }
}
