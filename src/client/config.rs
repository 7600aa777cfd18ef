//! Client configuration.
//!
//! # Examples
//!
//! ```
//! use entity_graph_client::client::ClientConfig;
//!
//! let config = ClientConfig {
//!     application_name: Some("tagger".into()),
//!     application_version: Some("1.2".into()),
//!     contact: Some("me@example.org".into()),
//!     min_request_interval_ms: 0,
//!     ..Default::default()
//! };
//! assert!(config.validate().is_ok());
//! ```

use crate::error::{QueryError, Result};
use crate::protocol::{self, DEFAULT_PAGE_SIZE};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

/// Default service root.
pub const DEFAULT_BASE_URL: &str = "https://musicbrainz.org/ws/2/";

/// Prefix of the environment variables read by [`ClientConfig::from_env`].
pub const ENV_PREFIX: &str = "ENTITY_GRAPH_";

/// Configuration for a [`RequestDispatcher`](crate::client::RequestDispatcher).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Service root every resource path is resolved against.
    pub base_url: String,
    /// Application product token for the user agent.
    pub application_name: Option<String>,
    /// Application version for the user agent.
    pub application_version: Option<String>,
    /// Contact (URL or e-mail) for the user agent.
    pub contact: Option<String>,
    /// Sent as `Authorization: Bearer <token>` when set.
    pub bearer_token: Option<String>,
    /// Per-request timeout in milliseconds.
    pub request_timeout_ms: u64,
    /// Minimum spacing between request starts; 0 disables throttling.
    pub min_request_interval_ms: u64,
    /// Page size used by browse and stream operations.
    pub default_page_size: u32,
    /// Proxy for all requests; empty for none.
    pub proxy_url: String,
    /// Emit per-request log events.
    pub enable_logging: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            base_url: DEFAULT_BASE_URL.to_string(),
            application_name: None,
            application_version: None,
            contact: None,
            bearer_token: None,
            request_timeout_ms: 30_000,
            min_request_interval_ms: 1_000,
            default_page_size: DEFAULT_PAGE_SIZE,
            proxy_url: String::new(),
            enable_logging: true,
        }
    }
}

impl ClientConfig {
    /// Defaults overlaid with `ENTITY_GRAPH_*` environment variables.
    ///
    /// Recognized: `BASE_URL`, `APP_NAME`, `APP_VERSION`, `CONTACT`,
    /// `BEARER_TOKEN`, `TIMEOUT_MS`, `MIN_INTERVAL_MS`, `PAGE_SIZE`, `PROXY`,
    /// `LOGGING`.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(format!("{}{}", ENV_PREFIX, key)).ok())
    }

    pub(crate) fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = ClientConfig::default();

        if let Some(v) = lookup("BASE_URL") {
            config.base_url = v;
        }
        if let Some(v) = lookup("APP_NAME") {
            config.application_name = Some(v);
        }
        if let Some(v) = lookup("APP_VERSION") {
            config.application_version = Some(v);
        }
        if let Some(v) = lookup("CONTACT") {
            config.contact = Some(v);
        }
        if let Some(v) = lookup("BEARER_TOKEN") {
            config.bearer_token = Some(v);
        }
        if let Some(v) = lookup("TIMEOUT_MS") {
            config.request_timeout_ms = parse_number("TIMEOUT_MS", &v)?;
        }
        if let Some(v) = lookup("MIN_INTERVAL_MS") {
            config.min_request_interval_ms = parse_number("MIN_INTERVAL_MS", &v)?;
        }
        if let Some(v) = lookup("PAGE_SIZE") {
            config.default_page_size = parse_number("PAGE_SIZE", &v)?;
        }
        if let Some(v) = lookup("PROXY") {
            config.proxy_url = v;
        }
        if let Some(v) = lookup("LOGGING") {
            config.enable_logging = matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on");
        }

        config.validate()?;
        Ok(config)
    }

    /// Check the configuration for values the service would reject.
    pub fn validate(&self) -> Result<()> {
        self.parsed_base_url()?;
        protocol::validate_page_size(self.default_page_size)?;
        if self.request_timeout_ms == 0 {
            return Err(QueryError::Config("request timeout must be positive".into()));
        }
        Ok(())
    }

    /// The base URL, forced to end in `/` so relative paths extend it.
    pub fn parsed_base_url(&self) -> Result<Url> {
        let mut base = self.base_url.trim().to_string();
        if !base.ends_with('/') {
            base.push('/');
        }
        let url = Url::parse(&base)?;
        if url.cannot_be_a_base() {
            return Err(QueryError::Config(format!("'{}' cannot be a base url", self.base_url)));
        }
        Ok(url)
    }

    /// The `User-Agent` header value for this configuration.
    pub fn user_agent(&self) -> String {
        protocol::user_agent(
            self.application_name.as_deref(),
            self.application_version.as_deref(),
            self.contact.as_deref(),
        )
    }

    /// Request timeout as a duration.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Minimum request spacing as a duration.
    pub fn min_request_interval(&self) -> Duration {
        Duration::from_millis(self.min_request_interval_ms)
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| QueryError::Config(format!("{}{} must be a number, got '{}'", ENV_PREFIX, key, value)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.default_page_size, 25);
        assert_eq!(config.min_request_interval(), Duration::from_secs(1));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_base_url_gets_trailing_slash() {
        let config = ClientConfig {
            base_url: "http://localhost:5000/ws/2".into(),
            ..Default::default()
        };
        let url = config.parsed_base_url().unwrap();
        assert_eq!(url.join("release").unwrap().as_str(), "http://localhost:5000/ws/2/release");
    }

    #[test]
    fn test_from_lookup_overrides() {
        let vars: HashMap<&str, &str> = [
            ("BASE_URL", "http://localhost:5000/ws/2/"),
            ("MIN_INTERVAL_MS", "0"),
            ("PAGE_SIZE", "100"),
            ("BEARER_TOKEN", "secret"),
            ("LOGGING", "off"),
        ]
        .into_iter()
        .collect();

        let config = ClientConfig::from_lookup(|k| vars.get(k).map(|v| v.to_string())).unwrap();
        assert_eq!(config.min_request_interval_ms, 0);
        assert_eq!(config.default_page_size, 100);
        assert_eq!(config.bearer_token.as_deref(), Some("secret"));
        assert!(!config.enable_logging);
    }

    #[test]
    fn test_from_lookup_rejects_bad_values() {
        let bad_size = ClientConfig::from_lookup(|k| (k == "PAGE_SIZE").then(|| "500".to_string()));
        assert!(matches!(bad_size, Err(QueryError::InvalidPageSize(500))));

        let not_a_number = ClientConfig::from_lookup(|k| (k == "TIMEOUT_MS").then(|| "soon".to_string()));
        assert!(matches!(not_a_number, Err(QueryError::Config(_))));
    }

    #[test]
    fn test_deserialize_partial_json() {
        let config: ClientConfig =
            serde_json::from_str(r#"{"application_name":"tagger","min_request_interval_ms":0}"#).unwrap();
        assert_eq!(config.application_name.as_deref(), Some("tagger"));
        assert_eq!(config.default_page_size, 25);
        assert!(config.user_agent().starts_with("tagger "));
    }
}
