//! Typed errors for the configuration and environment-switching core.
//!
//! Variants map one-to-one onto the failure classes callers must tell apart:
//! missing sources are fatal at startup, read/parse/validation failures are
//! fatal at startup but absorbed during reload, unknown-environment and
//! precondition failures are always recoverable by the caller.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    /// Neither the structured nor the legacy source exists.
    #[error(
        "no configuration file found; create either {} (multi-environment, recommended) or {} (legacy single environment)",
        yaml_path.display(),
        env_path.display()
    )]
    NotFound {
        yaml_path: PathBuf,
        env_path: PathBuf,
    },

    /// A source file exists but could not be read.
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The structured source exists but is not well-formed YAML.
    #[error("failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// Parsed data violates a model invariant.
    #[error("invalid configuration: {0}")]
    Validation(String),

    /// Switch target is not a configured environment name.
    #[error("environment '{name}' not found; available environments: {}", available.join(", "))]
    UnknownEnvironment {
        name: String,
        available: Vec<String>,
    },

    /// Operation requires a loaded configuration.
    #[error("configuration not loaded; call load() first")]
    NotLoaded,

    /// Operation requires an active environment.
    #[error("no active environment; call activate_default() or switch_to() first")]
    NotActive,
}

impl ConfigError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }
}
