//! A single named warehouse environment and its credential shape.
//!
//! `EnvironmentConfig` is constructed once from parsed source data and never
//! mutated; every field invariant is checked in the constructor so an invalid
//! instance cannot exist. The credential broker is the pure
//! [`EnvironmentConfig::credentials`] mapping consumed by outbound clients.

use crate::error::ConfigError;

/// Required prefix for personal access tokens.
const TOKEN_PREFIX: &str = "dapi";
/// Required prefix for SQL warehouse HTTP paths.
const HTTP_PATH_PREFIX: &str = "/sql/1.0/warehouses/";

const NAME_MAX: usize = 50;
const PROFILE_MAX: usize = 100;
const DESCRIPTION_MAX: usize = 200;
const TAG_MAX: usize = 30;

/// Exactly one authentication method per environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthMethod {
    /// Personal access token (starts with `dapi`).
    Token(String),
    /// Named CLI/SDK profile resolved by the outbound client.
    Profile(String),
}

impl AuthMethod {
    pub fn kind(&self) -> &'static str {
        match self {
            AuthMethod::Token(_) => "token",
            AuthMethod::Profile(_) => "profile",
        }
    }

    /// Render the method for logs without exposing the secret.
    pub fn masked(&self) -> String {
        match self {
            AuthMethod::Token(t) => format!("token {}", mask_token(t)),
            AuthMethod::Profile(p) => format!("profile {p}"),
        }
    }
}

/// Mask a credential so logs show only enough to identify it. Counts
/// characters, not bytes; tokens are only constrained to a `dapi` prefix and
/// may contain multi-byte characters.
pub fn mask_token(token: &str) -> String {
    if token.chars().count() <= 8 {
        "***".to_string()
    } else {
        let prefix: String = token.chars().take(8).collect();
        format!("{prefix}...")
    }
}

/// The minimal field bundle handed to an outbound client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialSet {
    pub host: String,
    pub http_path: String,
    pub auth: AuthMethod,
}

/// Validated configuration for one named environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvironmentConfig {
    name: String,
    host: String,
    auth: AuthMethod,
    http_path: String,
    description: Option<String>,
    tags: Vec<String>,
}

impl EnvironmentConfig {
    /// Construct a validated environment. `token` and `profile` are mutually
    /// exclusive and exactly one must be present.
    pub fn new(
        name: impl Into<String>,
        host: impl Into<String>,
        token: Option<String>,
        profile: Option<String>,
        http_path: impl Into<String>,
        description: Option<String>,
        tags: Vec<String>,
    ) -> Result<Self, ConfigError> {
        let name = name.into();
        let host = host.into();
        let http_path = http_path.into();

        if name.is_empty() || name.len() > NAME_MAX || !is_safe_ident(&name) {
            return Err(ConfigError::validation(format!(
                "environment name '{name}' must be 1-{NAME_MAX} characters of [A-Za-z0-9_-]"
            )));
        }
        if host.is_empty() {
            return Err(ConfigError::validation(format!(
                "environment '{name}': host must not be empty"
            )));
        }
        if host.starts_with("http://") || host.starts_with("https://") {
            return Err(ConfigError::validation(format!(
                "environment '{name}': host must not include a protocol prefix (http:// or https://)"
            )));
        }

        let auth = match (token, profile) {
            (Some(t), None) => {
                if !t.starts_with(TOKEN_PREFIX) {
                    return Err(ConfigError::validation(format!(
                        "environment '{name}': token must start with \"{TOKEN_PREFIX}\""
                    )));
                }
                AuthMethod::Token(t)
            }
            (None, Some(p)) => {
                if p.is_empty() || p.len() > PROFILE_MAX || !is_safe_ident(&p) {
                    return Err(ConfigError::validation(format!(
                        "environment '{name}': profile must be 1-{PROFILE_MAX} characters of [A-Za-z0-9_-]"
                    )));
                }
                AuthMethod::Profile(p)
            }
            (Some(_), Some(_)) => {
                return Err(ConfigError::validation(format!(
                    "environment '{name}': cannot specify both 'token' and 'profile'; choose one authentication method"
                )));
            }
            (None, None) => {
                return Err(ConfigError::validation(format!(
                    "environment '{name}': either 'token' or 'profile' must be specified"
                )));
            }
        };

        if !http_path.starts_with(HTTP_PATH_PREFIX) || http_path.len() == HTTP_PATH_PREFIX.len() {
            return Err(ConfigError::validation(format!(
                "environment '{name}': http_path must match {HTTP_PATH_PREFIX}<warehouse-id>"
            )));
        }

        // Character count, not bytes; descriptions are free text.
        if let Some(desc) = description.as_ref()
            && desc.chars().count() > DESCRIPTION_MAX
        {
            return Err(ConfigError::validation(format!(
                "environment '{name}': description exceeds {DESCRIPTION_MAX} characters"
            )));
        }
        for tag in &tags {
            if tag.is_empty() || tag.len() > TAG_MAX || !is_safe_ident(tag) {
                return Err(ConfigError::validation(format!(
                    "environment '{name}': tag \"{tag}\" must be 1-{TAG_MAX} characters of [A-Za-z0-9_-]"
                )));
            }
        }

        Ok(Self {
            name,
            host,
            auth,
            http_path,
            description,
            tags,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn http_path(&self) -> &str {
        &self.http_path
    }

    pub fn auth(&self) -> &AuthMethod {
        &self.auth
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    /// Credential broker: pure mapping into the shape outbound clients
    /// consume. No I/O, no caching.
    pub fn credentials(&self) -> CredentialSet {
        CredentialSet {
            host: self.host.clone(),
            http_path: self.http_path.clone(),
            auth: self.auth.clone(),
        }
    }
}

fn is_safe_ident(s: &str) -> bool {
    s.chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Result<EnvironmentConfig, ConfigError> {
        EnvironmentConfig::new(
            "dev",
            "dev.cloud.example.com",
            Some("dapi0123456789".to_string()),
            None,
            "/sql/1.0/warehouses/abc123",
            Some("Development".to_string()),
            vec!["development".to_string()],
        )
    }

    #[test]
    fn valid_token_environment() {
        let env = base().expect("valid env");
        assert_eq!(env.name(), "dev");
        assert_eq!(env.auth().kind(), "token");
    }

    #[test]
    fn valid_profile_environment() {
        let env = EnvironmentConfig::new(
            "dev",
            "dev.cloud.example.com",
            None,
            Some("dev-profile".to_string()),
            "/sql/1.0/warehouses/abc123",
            None,
            Vec::new(),
        )
        .expect("valid env");
        assert_eq!(env.auth(), &AuthMethod::Profile("dev-profile".to_string()));
    }

    #[test]
    fn rejects_both_auth_methods() {
        let err = EnvironmentConfig::new(
            "dev",
            "h",
            Some("dapi123".to_string()),
            Some("p".to_string()),
            "/sql/1.0/warehouses/x",
            None,
            Vec::new(),
        )
        .unwrap_err();
        assert!(err.to_string().contains("both"));
    }

    #[test]
    fn rejects_neither_auth_method() {
        let err = EnvironmentConfig::new(
            "dev",
            "h",
            None,
            None,
            "/sql/1.0/warehouses/x",
            None,
            Vec::new(),
        )
        .unwrap_err();
        assert!(err.to_string().contains("either 'token' or 'profile'"));
    }

    #[test]
    fn rejects_host_with_scheme() {
        let err = EnvironmentConfig::new(
            "dev",
            "https://dev.cloud.example.com",
            Some("dapi123".to_string()),
            None,
            "/sql/1.0/warehouses/x",
            None,
            Vec::new(),
        )
        .unwrap_err();
        assert!(err.to_string().contains("protocol prefix"));
    }

    #[test]
    fn rejects_bad_token_prefix() {
        let err = EnvironmentConfig::new(
            "dev",
            "h",
            Some("tok123".to_string()),
            None,
            "/sql/1.0/warehouses/x",
            None,
            Vec::new(),
        )
        .unwrap_err();
        assert!(err.to_string().contains("dapi"));
    }

    #[test]
    fn rejects_bad_http_path() {
        for path in ["/sql/1.0/warehouses/", "/sql/2.0/warehouses/x", "warehouses/x"] {
            let err = EnvironmentConfig::new(
                "dev",
                "h",
                Some("dapi123".to_string()),
                None,
                path,
                None,
                Vec::new(),
            )
            .unwrap_err();
            assert!(matches!(err, ConfigError::Validation(_)), "path: {path}");
        }
    }

    #[test]
    fn rejects_invalid_name_and_tags() {
        let err = EnvironmentConfig::new(
            "bad name",
            "h",
            Some("dapi123".to_string()),
            None,
            "/sql/1.0/warehouses/x",
            None,
            Vec::new(),
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));

        let err = EnvironmentConfig::new(
            "dev",
            "h",
            Some("dapi123".to_string()),
            None,
            "/sql/1.0/warehouses/x",
            None,
            vec!["bad tag!".to_string()],
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn credentials_carry_exactly_one_auth_field() {
        let creds = base().unwrap().credentials();
        assert_eq!(creds.host, "dev.cloud.example.com");
        assert_eq!(creds.http_path, "/sql/1.0/warehouses/abc123");
        assert!(matches!(creds.auth, AuthMethod::Token(ref t) if t.starts_with("dapi")));
    }

    #[test]
    fn mask_token_hides_tail() {
        assert_eq!(mask_token("dapi0123456789"), "dapi0123...");
        assert_eq!(mask_token("short"), "***");
    }

    #[test]
    fn mask_token_counts_characters_not_bytes() {
        // '€' is three bytes and straddles byte index 8 here; masking must
        // not panic and must keep whole characters.
        let env = EnvironmentConfig::new(
            "dev",
            "h",
            Some("dapiab€cdefgh".to_string()),
            None,
            "/sql/1.0/warehouses/x",
            None,
            Vec::new(),
        )
        .expect("valid env");
        assert_eq!(mask_token("dapiab€cdefgh"), "dapiab€c...");
        assert_eq!(env.auth().masked(), "token dapiab€c...");
    }

    #[test]
    fn description_limit_counts_characters_not_bytes() {
        let mk = |desc: String| {
            EnvironmentConfig::new(
                "dev",
                "h",
                Some("dapi0123456789".to_string()),
                None,
                "/sql/1.0/warehouses/x",
                Some(desc),
                Vec::new(),
            )
        };
        // 150 two-byte characters: 300 bytes but within the 200-char limit.
        assert!(mk("é".repeat(150)).is_ok());
        assert!(mk("é".repeat(201)).is_err());
    }
}
