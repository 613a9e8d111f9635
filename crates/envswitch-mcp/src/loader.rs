//! Configuration source resolution.
//!
//! Decides where configuration comes from and parses it into a validated
//! [`EnvironmentsConfiguration`]:
//! - a structured multi-environment YAML file (preferred), or
//! - a legacy flat `.env` file, synthesized into a single environment named
//!   `default` for backward compatibility.
//!
//! The structured source always wins when both exist; the legacy parse reads
//! the file into a local key/value map and never touches the process
//! environment.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use serde::Deserialize;

use crate::error::ConfigError;
use crate::model::{EnvironmentConfig, EnvironmentsConfiguration};

pub const LEGACY_HOST: &str = "DATABRICKS_HOST";
pub const LEGACY_TOKEN: &str = "DATABRICKS_TOKEN";
pub const LEGACY_HTTP_PATH: &str = "DATABRICKS_HTTP_PATH";

/// Raw YAML shape prior to model validation. Field presence is checked by
/// the model constructors so that missing values surface as validation
/// errors with the environment name attached, not as parse errors.
#[derive(Debug, Deserialize)]
struct RawConfiguration {
    default: Option<String>,
    #[serde(default)]
    environments: BTreeMap<String, RawEnvironment>,
}

#[derive(Debug, Deserialize)]
struct RawEnvironment {
    #[serde(default)]
    host: Option<String>,
    #[serde(default)]
    token: Option<String>,
    #[serde(default)]
    profile: Option<String>,
    #[serde(default)]
    http_path: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    tags: Vec<String>,
}

/// Resolve configuration from the structured source, falling back to the
/// legacy source, with structured-wins precedence.
pub fn resolve(yaml_path: &Path, env_path: &Path) -> Result<EnvironmentsConfiguration, ConfigError> {
    if yaml_path.exists() {
        if env_path.exists() {
            tracing::warn!(
                "both {} and {} exist; using {} (preferred), consider removing {}",
                yaml_path.display(),
                env_path.display(),
                yaml_path.display(),
                env_path.display()
            );
        }
        return load_structured(yaml_path);
    }
    if env_path.exists() {
        return load_legacy(env_path);
    }
    Err(ConfigError::NotFound {
        yaml_path: yaml_path.to_path_buf(),
        env_path: env_path.to_path_buf(),
    })
}

fn read_source(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Load and validate the structured multi-environment YAML file.
///
/// The map key is injected as each entry's `name` before construction, so
/// the source never has to repeat the name and the key/name invariant holds
/// by construction for this path.
fn load_structured(path: &Path) -> Result<EnvironmentsConfiguration, ConfigError> {
    tracing::info!("loading configuration from {}", path.display());
    let text = read_source(path)?;

    let raw: Option<RawConfiguration> =
        serde_yaml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
    let Some(raw) = raw else {
        return Err(ConfigError::validation(format!(
            "configuration file is empty: {}",
            path.display()
        )));
    };

    let mut environments = BTreeMap::new();
    for (name, entry) in raw.environments {
        let env = EnvironmentConfig::new(
            name.clone(),
            entry.host.unwrap_or_default(),
            entry.token,
            entry.profile,
            entry.http_path.unwrap_or_default(),
            entry.description,
            entry.tags,
        )?;
        environments.insert(name, env);
    }

    let default = raw
        .default
        .filter(|d| !d.is_empty())
        .ok_or_else(|| {
            ConfigError::validation(format!(
                "configuration must specify a 'default' environment: {}",
                path.display()
            ))
        })?;

    let config = EnvironmentsConfiguration::new(default, environments)?;
    tracing::info!(
        "configuration loaded: {} ({} environment(s))",
        path.display(),
        config.len()
    );
    Ok(config)
}

/// Load the legacy flat `.env` file and synthesize a single-environment
/// configuration named `default`.
fn load_legacy(path: &Path) -> Result<EnvironmentsConfiguration, ConfigError> {
    tracing::warn!(
        "structured configuration not found, using legacy configuration from {}",
        path.display()
    );
    let text = read_source(path)?;
    let vars = parse_env_file(&text);

    let required = [LEGACY_HOST, LEGACY_TOKEN, LEGACY_HTTP_PATH];
    let missing: Vec<&str> = required
        .into_iter()
        .filter(|key| vars.get(*key).is_none_or(|v| v.is_empty()))
        .collect();
    if !missing.is_empty() {
        return Err(ConfigError::validation(format!(
            "missing required environment variables in {}: {}",
            path.display(),
            missing.join(", ")
        )));
    }

    let env = EnvironmentConfig::new(
        "default",
        vars[LEGACY_HOST].clone(),
        Some(vars[LEGACY_TOKEN].clone()),
        None,
        vars[LEGACY_HTTP_PATH].clone(),
        Some(format!("Migrated from {}", path.display())),
        Vec::new(),
    )?;

    let mut environments = BTreeMap::new();
    environments.insert("default".to_string(), env);
    let config = EnvironmentsConfiguration::new("default", environments)?;
    tracing::info!(
        "configuration loaded: {} (1 environment, backward compatibility mode)",
        path.display()
    );
    Ok(config)
}

/// Parse `KEY=VALUE` lines into a local map. Comments and blank lines are
/// ignored; an optional `export ` prefix and surrounding quotes are
/// tolerated. The process environment is never consulted or mutated.
fn parse_env_file(text: &str) -> HashMap<String, String> {
    let mut vars = HashMap::new();
    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let line = line.strip_prefix("export ").unwrap_or(line);
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        let key = key.trim();
        let mut value = value.trim();
        if value.len() >= 2
            && ((value.starts_with('"') && value.ends_with('"'))
                || (value.starts_with('\'') && value.ends_with('\'')))
        {
            value = &value[1..value.len() - 1];
        }
        if !key.is_empty() {
            vars.insert(key.to_string(), value.to_string());
        }
    }
    vars
}
