//! Polling watcher that hot-reloads configuration when a source file
//! changes.
//!
//! Reload failures are logged and absorbed; the manager keeps serving the
//! last-known-good configuration until the file is fixed.

use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use crate::manager::{EnvironmentManager, ReloadOutcome};

/// Modification-time snapshot of both candidate source files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceStamp {
    yaml: Option<SystemTime>,
    env: Option<SystemTime>,
}

impl SourceStamp {
    pub fn current(yaml_path: &Path, env_path: &Path) -> Self {
        Self {
            yaml: mtime(yaml_path),
            env: mtime(env_path),
        }
    }
}

fn mtime(path: &Path) -> Option<SystemTime> {
    std::fs::metadata(path).ok().and_then(|m| m.modified().ok())
}

/// Spawn the polling loop. The returned handle runs for the life of the
/// process; dropping it does not stop the task.
pub fn spawn_config_watcher(
    manager: Arc<EnvironmentManager>,
    interval: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let paths = manager.paths().clone();
        let mut last = SourceStamp::current(&paths.yaml_path, &paths.env_path);
        tracing::info!(
            "watching {} and {} (interval={:?})",
            paths.yaml_path.display(),
            paths.env_path.display(),
            interval
        );
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        // First tick completes immediately.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let stamp = SourceStamp::current(&paths.yaml_path, &paths.env_path);
            if stamp == last {
                continue;
            }
            // Remember the new stamp even if the reload fails, so a broken
            // file is not re-parsed on every tick until it changes again.
            last = stamp;
            tracing::info!("configuration file change detected, reloading");
            match manager.reload() {
                Ok(ReloadOutcome::ActiveRetained(name)) => {
                    tracing::info!("reload complete, active environment still '{}'", name);
                }
                Ok(ReloadOutcome::FellBackToDefault { previous, current }) => {
                    tracing::warn!(
                        "reload complete, active environment changed implicitly: '{}' -> '{}'",
                        previous,
                        current
                    );
                }
                Ok(ReloadOutcome::NoActive) => {
                    tracing::info!("reload complete, no active environment");
                }
                Err(e) => {
                    tracing::warn!("reload failed: {}; keeping current configuration", e);
                }
            }
        }
    })
}
