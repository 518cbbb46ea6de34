//! CLI settings: an optional TOML profile overridden by flags and env.

use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use serde::Deserialize;

use hedgeline_client::ClientConfig;
use hedgeline_client::config::DEFAULT_ENDPOINT;
use hedgeline_core::{Locale, Role};
use hedgeline_timeline::DEFAULT_PAGE_SIZE;

/// Contents of a profile file.
///
/// ```toml
/// endpoint = "https://hedge.example.com"
/// api_key = "..."
/// timeout_secs = 10
/// role = "trader"
/// locale = "es"
/// page_size = 100
/// ```
#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Profile {
    pub endpoint: Option<String>,
    pub api_key: Option<String>,
    pub timeout_secs: Option<u64>,
    pub role: Option<Role>,
    pub locale: Option<Locale>,
    pub page_size: Option<u32>,
}

impl Profile {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read profile {}", path.display()))?;
        toml::from_str(&text).with_context(|| format!("invalid profile {}", path.display()))
    }
}

/// Values given on the command line or through `HEDGELINE_*` variables.
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub endpoint: Option<String>,
    pub api_key: Option<String>,
    pub timeout_secs: Option<u64>,
    pub role: Option<Role>,
    pub locale: Option<Locale>,
}

/// Effective settings for one invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub client: ClientConfig,
    pub role: Role,
    pub locale: Locale,
    pub page_size: u32,
}

impl Settings {
    /// Overrides win over the profile. Without either, the role is
    /// `viewer`, which can only read.
    pub fn resolve(profile: Profile, overrides: Overrides) -> Self {
        let endpoint = overrides
            .endpoint
            .or(profile.endpoint)
            .unwrap_or_else(|| DEFAULT_ENDPOINT.to_owned());

        let mut client = ClientConfig::new(endpoint);
        if let Some(key) = overrides.api_key.or(profile.api_key).filter(|k| !k.is_empty()) {
            client = client.with_api_key(key);
        }
        if let Some(secs) = overrides.timeout_secs.or(profile.timeout_secs) {
            client = client.with_timeout(Duration::from_secs(secs));
        }

        Self {
            client,
            role: overrides.role.or(profile.role).unwrap_or(Role::Viewer),
            locale: overrides.locale.or(profile.locale).unwrap_or_default(),
            page_size: profile.page_size.unwrap_or(DEFAULT_PAGE_SIZE),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_profile_uses_defaults() {
        let settings = Settings::resolve(Profile::default(), Overrides::default());
        assert_eq!(settings.client, ClientConfig::new(DEFAULT_ENDPOINT));
        assert_eq!(settings.role, Role::Viewer);
        assert_eq!(settings.locale, Locale::En);
        assert_eq!(settings.page_size, DEFAULT_PAGE_SIZE);
    }

    #[test]
    fn parses_full_profile() {
        let profile: Profile = toml::from_str(
            r#"
            endpoint = "https://hedge.example.com"
            api_key = "secret"
            timeout_secs = 10
            role = "finance"
            locale = "es"
            page_size = 100
            "#,
        )
        .unwrap();

        let settings = Settings::resolve(profile, Overrides::default());
        assert_eq!(settings.client.endpoint, "https://hedge.example.com");
        assert_eq!(settings.client.api_key.as_deref(), Some("secret"));
        assert_eq!(settings.client.timeout, Some(Duration::from_secs(10)));
        assert_eq!(settings.role, Role::Finance);
        assert_eq!(settings.locale, Locale::Es);
        assert_eq!(settings.page_size, 100);
    }

    #[test]
    fn overrides_win() {
        let profile = Profile {
            endpoint: Some("https://profile.example.com".into()),
            api_key: Some("profile-key".into()),
            timeout_secs: Some(10),
            role: Some(Role::Viewer),
            locale: Some(Locale::Es),
            page_size: None,
        };
        let overrides = Overrides {
            endpoint: Some("http://localhost:9000".into()),
            api_key: None,
            timeout_secs: Some(3),
            role: Some(Role::Trader),
            locale: None,
        };

        let settings = Settings::resolve(profile, overrides);
        assert_eq!(settings.client.endpoint, "http://localhost:9000");
        assert_eq!(settings.client.api_key.as_deref(), Some("profile-key"));
        assert_eq!(settings.client.timeout, Some(Duration::from_secs(3)));
        assert_eq!(settings.role, Role::Trader);
        assert_eq!(settings.locale, Locale::Es);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = toml::from_str::<Profile>("endpont = \"typo\"").unwrap_err();
        assert!(err.to_string().contains("endpont"));
    }

    #[test]
    fn load_reports_missing_file() {
        let err = Profile::load(Path::new("/nonexistent/hedgeline.toml")).unwrap_err();
        assert!(err.to_string().contains("failed to read profile"));
    }
}
