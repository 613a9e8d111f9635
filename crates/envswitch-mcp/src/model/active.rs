//! The currently selected environment.

use chrono::{DateTime, Utc};

use crate::model::{CredentialSet, EnvironmentConfig};

/// The environment currently selected for outbound calls.
///
/// Derived from the held configuration at activation time and replaced, not
/// mutated, on every switch or reload re-point.
#[derive(Debug, Clone)]
pub struct ActiveEnvironment {
    name: String,
    config: EnvironmentConfig,
    activated_at: DateTime<Utc>,
}

impl ActiveEnvironment {
    pub fn new(config: EnvironmentConfig) -> Self {
        Self {
            name: config.name().to_string(),
            config,
            activated_at: Utc::now(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &EnvironmentConfig {
        &self.config
    }

    pub fn activated_at(&self) -> DateTime<Utc> {
        self.activated_at
    }

    pub fn credentials(&self) -> CredentialSet {
        self.config.credentials()
    }

    /// Human-readable description of the selection; never includes secrets.
    pub fn summary(&self) -> String {
        let tags = if self.config.tags().is_empty() {
            "N/A".to_string()
        } else {
            self.config.tags().join(", ")
        };
        format!(
            "Current environment: {}\nHost: {}\nAuth: {}\nDescription: {}\nTags: {}\nActivated at: {}",
            self.name,
            self.config.host(),
            self.config.auth().masked(),
            self.config.description().unwrap_or("N/A"),
            tags,
            self.activated_at.to_rfc3339(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::AuthMethod;

    fn sample() -> EnvironmentConfig {
        EnvironmentConfig::new(
            "dev",
            "dev.cloud.example.com",
            Some("dapi0123456789".to_string()),
            None,
            "/sql/1.0/warehouses/abc123",
            Some("Development".to_string()),
            vec!["development".to_string()],
        )
        .expect("valid env")
    }

    #[test]
    fn derives_name_from_config() {
        let active = ActiveEnvironment::new(sample());
        assert_eq!(active.name(), "dev");
        assert_eq!(active.config().name(), "dev");
    }

    #[test]
    fn summary_masks_token() {
        let active = ActiveEnvironment::new(sample());
        let summary = active.summary();
        assert!(summary.contains("Current environment: dev"));
        assert!(summary.contains("dapi0123..."));
        assert!(!summary.contains("dapi0123456789"));
        assert!(summary.contains("Tags: development"));
    }

    #[test]
    fn credentials_pass_through() {
        let active = ActiveEnvironment::new(sample());
        let creds = active.credentials();
        assert_eq!(creds.host, "dev.cloud.example.com");
        assert!(matches!(creds.auth, AuthMethod::Token(_)));
    }
}
