//! Process-wide environment state: load, switch, reload, and query.
//!
//! One `EnvironmentManager` exists per process; it is constructed in `main`
//! and shared as `Arc<EnvironmentManager>` with the request handler and the
//! file watcher. The `(configuration, active)` pair lives behind a single
//! exclusive lock held for the full validate-then-commit sequence, so a
//! reload interleaved with a switch can never observe or produce a torn
//! state. Reload is atomic-or-abandoned: any resolver failure leaves the
//! prior state completely untouched.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard};

use crate::error::ConfigError;
use crate::loader;
use crate::model::{ActiveEnvironment, CredentialSet, EnvironmentConfig, EnvironmentsConfiguration};

/// The two candidate source paths, fixed at construction and reused for
/// every reload.
#[derive(Debug, Clone)]
pub struct ConfigPaths {
    pub yaml_path: PathBuf,
    pub env_path: PathBuf,
}

#[derive(Default)]
struct State {
    configuration: Option<EnvironmentsConfiguration>,
    active: Option<ActiveEnvironment>,
}

/// What a successful reload did to the active environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReloadOutcome {
    /// The active environment is still configured; it was re-pointed at the
    /// new configuration (credentials may have changed).
    ActiveRetained(String),
    /// The active environment vanished from the new configuration; the
    /// manager fell back to the new default. Callers relying on a specific
    /// environment must detect this via `active_name`.
    FellBackToDefault { previous: String, current: String },
    /// Nothing was active before the reload.
    NoActive,
}

pub struct EnvironmentManager {
    paths: ConfigPaths,
    state: Mutex<State>,
}

impl EnvironmentManager {
    pub fn new(yaml_path: impl Into<PathBuf>, env_path: impl Into<PathBuf>) -> Self {
        Self {
            paths: ConfigPaths {
                yaml_path: yaml_path.into(),
                env_path: env_path.into(),
            },
            state: Mutex::new(State::default()),
        }
    }

    pub fn paths(&self) -> &ConfigPaths {
        &self.paths
    }

    fn state(&self) -> MutexGuard<'_, State> {
        // A poisoned lock means a panic mid-read; the pair itself is only
        // replaced wholesale, so recovering the inner state is sound.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Initial load. On failure the manager stays uninitialized and the
    /// error propagates to the caller; the process must not serve without a
    /// valid configuration.
    pub fn load(&self) -> Result<usize, ConfigError> {
        let mut state = self.state();
        let config = loader::resolve(&self.paths.yaml_path, &self.paths.env_path)?;
        let count = config.len();
        state.configuration = Some(config);
        tracing::info!("loaded {} environment(s)", count);
        Ok(count)
    }

    /// Activate the configured default environment.
    pub fn activate_default(&self) -> Result<(), ConfigError> {
        let mut state = self.state();
        let config = state.configuration.as_ref().ok_or(ConfigError::NotLoaded)?;
        let default = Self::lookup(config, config.default_name())?;
        tracing::info!(
            "active environment set to default: {} (host: {})",
            default.name(),
            default.host()
        );
        state.active = Some(ActiveEnvironment::new(default));
        Ok(())
    }

    /// Switch to a named environment, returning a human-readable
    /// confirmation. Unknown names fail with the list of configured names;
    /// the prior active environment is left unchanged on any failure.
    pub fn switch_to(&self, name: &str) -> Result<String, ConfigError> {
        let mut state = self.state();
        let config = state.configuration.as_ref().ok_or(ConfigError::NotLoaded)?;
        let target = Self::lookup(config, name)?;

        let old_name = state.active.as_ref().map(|a| a.name().to_string());
        match old_name.as_deref() {
            Some(old) if old != name => tracing::info!("environment switched: {} -> {}", old, name),
            _ => tracing::info!("environment set to: {}", name),
        }

        let confirmation = format!(
            "Switched to environment: {}\nHost: {}\nDescription: {}\nTags: {}",
            target.name(),
            target.host(),
            target.description().unwrap_or("N/A"),
            if target.tags().is_empty() {
                "N/A".to_string()
            } else {
                target.tags().join(", ")
            }
        );
        state.active = Some(ActiveEnvironment::new(target));
        Ok(confirmation)
    }

    /// Hot-reload from the same paths used at initial load.
    ///
    /// On resolver failure the prior configuration and active environment
    /// are left untouched and the error is returned for the caller to log;
    /// the manager keeps serving the last-known-good state. On success the
    /// active environment is re-pointed by name, falling back to the new
    /// default when its name vanished from the configuration.
    pub fn reload(&self) -> Result<ReloadOutcome, ConfigError> {
        let mut state = self.state();
        let config = loader::resolve(&self.paths.yaml_path, &self.paths.env_path)?;

        let outcome = match state.active.as_ref().map(|a| a.name().to_string()) {
            Some(previous) => {
                if let Some(updated) = config.get(&previous) {
                    state.active = Some(ActiveEnvironment::new(updated.clone()));
                    tracing::info!(
                        "active environment '{}' re-pointed at reloaded configuration",
                        previous
                    );
                    ReloadOutcome::ActiveRetained(previous)
                } else {
                    // Implicit switch: security-relevant, so this is always
                    // surfaced at warn level.
                    let current = config.default_name().to_string();
                    tracing::warn!(
                        "active environment '{}' no longer exists after reload; falling back to default '{}'",
                        previous,
                        current
                    );
                    let default = Self::lookup(&config, &current)?;
                    state.active = Some(ActiveEnvironment::new(default));
                    ReloadOutcome::FellBackToDefault { previous, current }
                }
            }
            None => ReloadOutcome::NoActive,
        };

        tracing::info!(
            "configuration reloaded: {} environment(s)",
            config.len()
        );
        state.configuration = Some(config);
        Ok(outcome)
    }

    /// Name of the active environment, if any.
    pub fn active_name(&self) -> Option<String> {
        self.state().active.as_ref().map(|a| a.name().to_string())
    }

    /// Credential set of the active environment for outbound clients.
    pub fn active_credentials(&self) -> Result<CredentialSet, ConfigError> {
        self.state()
            .active
            .as_ref()
            .map(ActiveEnvironment::credentials)
            .ok_or(ConfigError::NotActive)
    }

    /// Human-readable details of the active environment.
    pub fn active_summary(&self) -> Result<String, ConfigError> {
        self.state()
            .active
            .as_ref()
            .map(ActiveEnvironment::summary)
            .ok_or(ConfigError::NotActive)
    }

    /// Snapshot of all configured environments.
    pub fn list_all(&self) -> Result<BTreeMap<String, EnvironmentConfig>, ConfigError> {
        self.state()
            .configuration
            .as_ref()
            .map(|c| c.environments().clone())
            .ok_or(ConfigError::NotLoaded)
    }

    fn lookup(
        config: &EnvironmentsConfiguration,
        name: &str,
    ) -> Result<EnvironmentConfig, ConfigError> {
        config
            .get(name)
            .cloned()
            .ok_or_else(|| ConfigError::UnknownEnvironment {
                name: name.to_string(),
                available: config.names(),
            })
    }
}
