//! `[service]` configuration section.

use reqwest::Url;
use serde::{Deserialize, Serialize};

use crate::auth::AuthScheme;
use crate::error::TrackerError;

fn default_api_version() -> String {
    "7.1".to_string()
}

fn default_token_env() -> String {
    "BACKLOG_SYNC_TOKEN".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

/// Where the tracking service lives and how to authenticate against it.
///
/// The token itself is never part of the configuration; only the name of the
/// environment variable that holds it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackerConfig {
    /// Organisation or collection URL, e.g. `https://dev.azure.com/fabrikam`.
    pub base_url: String,
    /// Project every query and batch fetch is scoped to.
    pub project: String,
    #[serde(default = "default_api_version")]
    pub api_version: String,
    /// Environment variable holding the access token.
    #[serde(default = "default_token_env")]
    pub token_env: String,
    #[serde(default)]
    pub auth: AuthScheme,
    /// Per-call timeout applied by the HTTP client.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl TrackerConfig {
    pub fn new(base_url: impl Into<String>, project: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            project: project.into(),
            api_version: default_api_version(),
            token_env: default_token_env(),
            auth: AuthScheme::default(),
            timeout_secs: default_timeout_secs(),
        }
    }

    pub fn validate(&self) -> Result<(), TrackerError> {
        self.parsed_base_url()?;
        if self.project.trim().is_empty() {
            return Err(TrackerError::MissingProject);
        }
        Ok(())
    }

    /// Parses `base_url`, accepting only http(s) URLs that can carry a path.
    pub(crate) fn parsed_base_url(&self) -> Result<Url, TrackerError> {
        let invalid = |message: String| TrackerError::InvalidBaseUrl {
            url: self.base_url.clone(),
            message,
        };
        let url = Url::parse(&self.base_url).map_err(|e| invalid(e.to_string()))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(invalid(format!("unsupported scheme '{}'", url.scheme())));
        }
        if url.cannot_be_a_base() {
            return Err(invalid("URL cannot carry a path".to_string()));
        }
        Ok(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_fill_optional_keys() {
        let config: TrackerConfig = serde_json::from_str(
            r#"{"base_url": "https://dev.azure.com/fabrikam", "project": "Fabrikam"}"#,
        )
        .unwrap();
        assert_eq!(config.api_version, "7.1");
        assert_eq!(config.token_env, "BACKLOG_SYNC_TOKEN");
        assert_eq!(config.auth, AuthScheme::Basic);
        assert_eq!(config.timeout_secs, 30);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_missing_base_url_is_rejected_by_deserialisation() {
        let result: Result<TrackerConfig, _> = serde_json::from_str(r#"{"project": "Fabrikam"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_non_http_url_is_invalid() {
        let config = TrackerConfig::new("ftp://example.com", "Fabrikam");
        assert!(matches!(
            config.validate(),
            Err(TrackerError::InvalidBaseUrl { .. })
        ));
    }

    #[test]
    fn test_blank_project_is_invalid() {
        let config = TrackerConfig::new("https://dev.azure.com/fabrikam", "  ");
        assert!(matches!(config.validate(), Err(TrackerError::MissingProject)));
    }

    #[test]
    fn test_base_url_keeps_collection_path() {
        let config = TrackerConfig::new("https://dev.azure.com/fabrikam/", "Fabrikam");
        let url = config.parsed_base_url().unwrap();
        assert_eq!(url.path(), "/fabrikam/");
    }
}
