//! Scrape target configuration.

use std::time::Duration;

use reqwest::Url;
use serde::{Deserialize, Serialize};

use super::validation::{ConfigError, expand_env_vars, parse_duration};
use crate::collector::MIN_INTERVAL;

/// Default scrape interval string.
pub const DEFAULT_SCRAPE_INTERVAL: &str = "60s";

/// One `flussonics` entry as written in the config file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct TargetConfig {
    /// Base address of the Flussonic instance.
    pub url: String,
    /// API user (supports `${VAR}` expansion).
    #[serde(default)]
    pub user: String,
    /// API password (supports `${VAR}` expansion).
    #[serde(default)]
    pub password: String,
    /// Scrape interval (default: "60s").
    #[serde(default)]
    pub scrape_interval: Option<String>,
    /// Instance name used as the `server` label (default: URL host).
    #[serde(default)]
    pub instance_name: Option<String>,
    /// Per-request timeout overriding the global `request-timeout`.
    #[serde(default, with = "humantime_serde")]
    pub timeout: Option<Duration>,
}

impl TargetConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            user: String::new(),
            password: String::new(),
            scrape_interval: None,
            instance_name: None,
            timeout: None,
        }
    }

    pub fn with_credentials(mut self, user: impl Into<String>, password: impl Into<String>) -> Self {
        self.user = user.into();
        self.password = password.into();
        self
    }

    pub fn with_scrape_interval(mut self, interval: impl Into<String>) -> Self {
        self.scrape_interval = Some(interval.into());
        self
    }

    pub fn with_instance_name(mut self, name: impl Into<String>) -> Self {
        self.instance_name = Some(name.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Resolve defaults and validate into an immutable [`Target`].
    ///
    /// # Errors
    /// Returns `ConfigError::ValidationError` for a malformed address or interval.
    pub fn into_target(self, default_timeout: Duration) -> Result<Target, ConfigError> {
        let url = Url::parse(self.url.trim()).map_err(|e| {
            ConfigError::ValidationError(format!("invalid flussonic url '{}': {}", self.url, e))
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::ValidationError(format!(
                "flussonic url '{}' must use http or https",
                self.url
            )));
        }
        let host = match url.host_str() {
            Some(host) if !host.is_empty() => host.to_owned(),
            _ => {
                return Err(ConfigError::ValidationError(format!(
                    "flussonic url '{}' has no host",
                    self.url
                )));
            }
        };

        let interval_str = self
            .scrape_interval
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or(DEFAULT_SCRAPE_INTERVAL);
        let mut scrape_interval = parse_duration(interval_str).map_err(|e| {
            ConfigError::ValidationError(format!(
                "flussonic '{}' scrape-interval: {}",
                self.url, e
            ))
        })?;
        if scrape_interval < MIN_INTERVAL {
            tracing::warn!(url = %self.url, min_interval = ?MIN_INTERVAL,
                "Scrape interval is less than minimum allowed. Using minimum duration."
            );
            scrape_interval = MIN_INTERVAL;
        }

        let timeout = self.timeout.unwrap_or(default_timeout);
        if timeout.is_zero() {
            return Err(ConfigError::ValidationError(format!(
                "flussonic '{}' timeout must be positive",
                self.url
            )));
        }

        let instance_name = match self.instance_name.filter(|n| !n.trim().is_empty()) {
            Some(name) => name,
            None => match written_authority(self.url.trim()) {
                Some(authority) => authority.to_owned(),
                None => match url.port() {
                    Some(port) => format!("{host}:{port}"),
                    None => host,
                },
            },
        };

        Ok(Target {
            url,
            user: expand_env_vars(&self.user),
            password: expand_env_vars(&self.password),
            instance_name,
            scrape_interval,
            timeout,
        })
    }
}

/// Host and port of `raw` exactly as written, without user info.
///
/// `Url` drops a port equal to the scheme default, so `http://host:80` would
/// otherwise be named `host`.
fn written_authority(raw: &str) -> Option<&str> {
    let (_, rest) = raw.split_once("://")?;
    let end = rest.find(['/', '?', '#']).unwrap_or(rest.len());
    let authority = &rest[..end];
    let authority = authority.rsplit_once('@').map_or(authority, |(_, a)| a);
    (!authority.is_empty()).then_some(authority)
}

/// A validated scrape target. Immutable after configuration load.
#[derive(Clone, PartialEq, Eq)]
pub struct Target {
    pub url: Url,
    pub user: String,
    pub password: String,
    /// Value of the `server` label on every sample of this target.
    pub instance_name: String,
    pub scrape_interval: Duration,
    /// Bound on each API request.
    pub timeout: Duration,
}

impl Target {
    /// Cache key: the normalized address.
    pub fn key(&self) -> &str {
        self.url.as_str()
    }
}

impl std::fmt::Debug for Target {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Target")
            .field("url", &self.url.as_str())
            .field("user", &self.user)
            .field("instance_name", &self.instance_name)
            .field("scrape_interval", &self.scrape_interval)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TIMEOUT: Duration = Duration::from_secs(10);

    #[test]
    fn test_defaults() {
        let target = TargetConfig::new("http://flussonic.local:8080")
            .into_target(TIMEOUT)
            .unwrap();

        assert_eq!(target.instance_name, "flussonic.local:8080");
        assert_eq!(target.scrape_interval, Duration::from_secs(60));
        assert_eq!(target.timeout, TIMEOUT);
        assert_eq!(target.key(), "http://flussonic.local:8080/");
    }

    #[test]
    fn test_instance_name_without_port() {
        let target = TargetConfig::new("https://media.example.com/")
            .into_target(TIMEOUT)
            .unwrap();
        assert_eq!(target.instance_name, "media.example.com");
    }

    #[test]
    fn test_instance_name_keeps_default_port() {
        let target = TargetConfig::new("http://admin:pw@media.local:80/")
            .into_target(TIMEOUT)
            .unwrap();
        assert_eq!(target.instance_name, "media.local:80");

        let target = TargetConfig::new("https://[::1]:443")
            .into_target(TIMEOUT)
            .unwrap();
        assert_eq!(target.instance_name, "[::1]:443");
    }

    #[test]
    fn test_explicit_values() {
        let target = TargetConfig::new("http://10.0.0.5")
            .with_credentials("admin", "pw")
            .with_scrape_interval("15s")
            .with_instance_name("edge-1")
            .with_timeout(Duration::from_secs(3))
            .into_target(TIMEOUT)
            .unwrap();

        assert_eq!(target.instance_name, "edge-1");
        assert_eq!(target.scrape_interval, Duration::from_secs(15));
        assert_eq!(target.timeout, Duration::from_secs(3));
        assert_eq!(target.user, "admin");
        assert_eq!(target.password, "pw");
    }

    #[test]
    fn test_interval_clamped_to_minimum() {
        let target = TargetConfig::new("http://a")
            .with_scrape_interval("100ms")
            .into_target(TIMEOUT)
            .unwrap();
        assert_eq!(target.scrape_interval, MIN_INTERVAL);
    }

    #[test]
    fn test_malformed_addresses_rejected() {
        for url in ["not a url", "ftp://host", "flussonic.local:8080", "http://"] {
            let result = TargetConfig::new(url).into_target(TIMEOUT);
            assert!(result.is_err(), "{url} should be rejected");
        }
    }

    #[test]
    fn test_invalid_interval_rejected() {
        let err = TargetConfig::new("http://a")
            .with_scrape_interval("soon")
            .into_target(TIMEOUT)
            .unwrap_err();
        assert!(err.to_string().contains("scrape-interval"));
    }

    #[test]
    fn test_debug_hides_password() {
        let target = TargetConfig::new("http://a")
            .with_credentials("admin", "hunter2")
            .into_target(TIMEOUT)
            .unwrap();
        assert!(!format!("{target:?}").contains("hunter2"));
    }
}
