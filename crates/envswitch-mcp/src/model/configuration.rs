//! The validated aggregate of all configured environments.

use std::collections::BTreeMap;

use crate::error::ConfigError;
use crate::model::EnvironmentConfig;

/// Container for all environments plus the default selection.
///
/// Invariants enforced at construction: the map is non-empty, every key
/// equals its entry's name, and `default` is a key of the map. A value that
/// violates any of these never exists.
#[derive(Debug, Clone)]
pub struct EnvironmentsConfiguration {
    default: String,
    environments: BTreeMap<String, EnvironmentConfig>,
}

impl EnvironmentsConfiguration {
    pub fn new(
        default: impl Into<String>,
        environments: BTreeMap<String, EnvironmentConfig>,
    ) -> Result<Self, ConfigError> {
        let default = default.into();
        if environments.is_empty() {
            return Err(ConfigError::validation(
                "configuration must define at least one environment",
            ));
        }
        for (key, env) in &environments {
            if env.name() != key {
                return Err(ConfigError::validation(format!(
                    "environment key \"{key}\" does not match environment name \"{}\"",
                    env.name()
                )));
            }
        }
        if !environments.contains_key(&default) {
            let available = environments.keys().cloned().collect::<Vec<_>>().join(", ");
            return Err(ConfigError::validation(format!(
                "default environment \"{default}\" not found; available environments: {available}"
            )));
        }
        Ok(Self {
            default,
            environments,
        })
    }

    pub fn default_name(&self) -> &str {
        &self.default
    }

    pub fn get(&self, name: &str) -> Option<&EnvironmentConfig> {
        self.environments.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.environments.contains_key(name)
    }

    pub fn names(&self) -> Vec<String> {
        self.environments.keys().cloned().collect()
    }

    pub fn environments(&self) -> &BTreeMap<String, EnvironmentConfig> {
        &self.environments
    }

    pub fn len(&self) -> usize {
        self.environments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.environments.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(name: &str) -> EnvironmentConfig {
        EnvironmentConfig::new(
            name,
            format!("{name}.cloud.example.com"),
            Some("dapi0123456789".to_string()),
            None,
            "/sql/1.0/warehouses/abc123",
            None,
            Vec::new(),
        )
        .expect("valid env")
    }

    #[test]
    fn accepts_matching_keys_and_default() {
        let mut map = BTreeMap::new();
        map.insert("dev".to_string(), env("dev"));
        map.insert("prod".to_string(), env("prod"));
        let cfg = EnvironmentsConfiguration::new("dev", map).expect("valid config");
        assert_eq!(cfg.default_name(), "dev");
        assert_eq!(cfg.names(), vec!["dev".to_string(), "prod".to_string()]);
        assert!(cfg.contains("prod"));
        assert_eq!(cfg.len(), 2);
        assert!(!cfg.is_empty());
    }

    #[test]
    fn rejects_empty_map() {
        let err = EnvironmentsConfiguration::new("dev", BTreeMap::new()).unwrap_err();
        assert!(err.to_string().contains("at least one"));
    }

    #[test]
    fn rejects_key_name_mismatch() {
        let mut map = BTreeMap::new();
        map.insert("development".to_string(), env("dev"));
        let err = EnvironmentsConfiguration::new("development", map).unwrap_err();
        assert!(err.to_string().contains("does not match"));
    }

    #[test]
    fn rejects_missing_default() {
        let mut map = BTreeMap::new();
        map.insert("dev".to_string(), env("dev"));
        map.insert("prod".to_string(), env("prod"));
        let err = EnvironmentsConfiguration::new("staging", map).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("staging"));
        assert!(msg.contains("dev, prod"));
    }
}
