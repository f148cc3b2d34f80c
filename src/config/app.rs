//! Application configuration structures.

use std::collections::HashSet;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::target::{Target, TargetConfig};
use super::validation::ConfigError;

// =============================================================================
// Constants
// =============================================================================

/// Default listen address.
pub const DEFAULT_LISTEN_ADDRESS: &str = ":9113";

/// Default metrics path.
pub const DEFAULT_METRICS_PATH: &str = "/metrics";

/// Default per-request timeout for upstream API calls (10 seconds).
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Locations searched when no config path is given, in order.
pub const DEFAULT_CONFIG_PATHS: &[&str] = &[
    "/etc/flussonic_exporter/settings.yaml",
    "./conf/settings.yaml",
    "./settings.yaml",
];

fn default_log_level() -> String {
    "info".to_string()
}

fn default_listen_address() -> String {
    DEFAULT_LISTEN_ADDRESS.to_string()
}

fn default_metrics_path() -> String {
    DEFAULT_METRICS_PATH.to_string()
}

fn default_exporter_metrics() -> bool {
    true
}

fn default_request_timeout() -> Duration {
    DEFAULT_REQUEST_TIMEOUT
}

// =============================================================================
// Application Configuration
// =============================================================================

/// Top-level application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct AppConfig {
    /// Directory for `info.log` / `error.log`; console only when unset.
    #[serde(default)]
    pub log_path: Option<PathBuf>,

    /// Log level (default: "info").
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// HTTP listen address, `host:port` or `:port` (default: ":9113").
    #[serde(default = "default_listen_address")]
    pub listen_address: String,

    /// Path serving the exposition (default: "/metrics").
    #[serde(default = "default_metrics_path")]
    pub metrics_path: String,

    /// Include the exporter's own process metrics (default: true).
    #[serde(default = "default_exporter_metrics")]
    pub exporter_metrics: bool,

    /// Default upstream request timeout (default: 10s).
    #[serde(default = "default_request_timeout", with = "humantime_serde")]
    pub request_timeout: Duration,

    /// Flussonic instances to scrape.
    #[serde(default)]
    pub flussonics: Vec<TargetConfig>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            log_path: None,
            log_level: default_log_level(),
            listen_address: default_listen_address(),
            metrics_path: default_metrics_path(),
            exporter_metrics: default_exporter_metrics(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            flussonics: Vec::new(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a YAML file.
    ///
    /// # Errors
    /// Returns `ConfigError` if the file cannot be read, parsed, or validated.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_yaml(&content)
    }

    /// Parse and validate configuration from YAML text.
    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from the first existing file in [`DEFAULT_CONFIG_PATHS`].
    pub fn discover() -> Result<(PathBuf, Self), ConfigError> {
        Self::discover_in(DEFAULT_CONFIG_PATHS)
    }

    fn discover_in(candidates: &[&str]) -> Result<(PathBuf, Self), ConfigError> {
        let path = candidates
            .iter()
            .map(PathBuf::from)
            .find(|p| p.is_file())
            .ok_or_else(|| ConfigError::NotFound(candidates.join(", ")))?;
        let config = Self::load(&path)?;
        Ok((path, config))
    }

    /// Validate configuration values.
    ///
    /// # Errors
    /// Returns `ConfigError::ValidationError` if any field is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.socket_addr()?;

        if !self.metrics_path.starts_with('/') || self.metrics_path == "/" {
            return Err(ConfigError::ValidationError(format!(
                "metrics-path must be an absolute, non-root path: '{}'",
                self.metrics_path
            )));
        }

        if self.request_timeout.is_zero() {
            return Err(ConfigError::ValidationError(
                "request-timeout must be positive".to_string(),
            ));
        }

        if self.flussonics.is_empty() {
            return Err(ConfigError::ValidationError(
                "flussonic configuration not found".to_string(),
            ));
        }

        let mut urls = HashSet::new();
        let mut names = HashSet::new();
        for target in self.targets()? {
            if !urls.insert(target.key().to_owned()) {
                return Err(ConfigError::ValidationError(format!(
                    "duplicate flussonic url: '{}'",
                    target.url
                )));
            }
            // The instance name is the `server` label of every series.
            if !names.insert(target.instance_name.clone()) {
                return Err(ConfigError::ValidationError(format!(
                    "duplicate flussonic instance-name: '{}'",
                    target.instance_name
                )));
            }
        }

        Ok(())
    }

    /// Resolve every configured target.
    pub fn targets(&self) -> Result<Vec<Target>, ConfigError> {
        self.flussonics
            .iter()
            .cloned()
            .map(|t| t.into_target(self.request_timeout))
            .collect()
    }

    /// Parse the listen address; a bare `:port` binds all interfaces.
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        let addr = self.listen_address.trim();
        let addr = if addr.starts_with(':') {
            format!("0.0.0.0{addr}")
        } else {
            addr.to_string()
        };
        addr.parse().map_err(|_| {
            ConfigError::ValidationError(format!(
                "invalid listen-address: '{}'",
                self.listen_address
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const MINIMAL: &str = r#"
flussonics:
  - url: http://flussonic.local:8080
    user: admin
    password: secret
"#;

    #[test]
    fn test_minimal_config_defaults() {
        let config = AppConfig::from_yaml(MINIMAL).unwrap();

        assert_eq!(config.listen_address, ":9113");
        assert_eq!(config.metrics_path, "/metrics");
        assert!(config.exporter_metrics);
        assert_eq!(config.log_level, "info");
        assert!(config.log_path.is_none());
        assert_eq!(config.request_timeout, DEFAULT_REQUEST_TIMEOUT);
        assert_eq!(
            config.socket_addr().unwrap(),
            "0.0.0.0:9113".parse::<SocketAddr>().unwrap()
        );

        let targets = config.targets().unwrap();
        assert_eq!(targets.len(), 1);
        assert_eq!(targets[0].instance_name, "flussonic.local:8080");
        assert_eq!(targets[0].scrape_interval, Duration::from_secs(60));
    }

    #[test]
    fn test_full_config() {
        let yaml = r#"
log-path: /tmp/flussonic_exporter
log-level: debug
listen-address: 127.0.0.1:9200
metrics-path: /probe
exporter-metrics: false
request-timeout: 3s
flussonics:
  - url: http://a.local
    scrape-interval: 30s
    instance-name: edge-a
  - url: https://b.local:8443
    timeout: 1s
"#;
        let config = AppConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.log_path, Some(PathBuf::from("/tmp/flussonic_exporter")));
        assert_eq!(config.metrics_path, "/probe");
        assert!(!config.exporter_metrics);

        let targets = config.targets().unwrap();
        assert_eq!(targets[0].instance_name, "edge-a");
        assert_eq!(targets[0].scrape_interval, Duration::from_secs(30));
        assert_eq!(targets[0].timeout, Duration::from_secs(3));
        assert_eq!(targets[1].instance_name, "b.local:8443");
        assert_eq!(targets[1].timeout, Duration::from_secs(1));
    }

    #[test]
    fn test_empty_target_list_is_fatal() {
        let err = AppConfig::from_yaml("listen-address: \":9113\"\n").unwrap_err();
        assert!(err.to_string().contains("flussonic configuration not found"));

        let err = AppConfig::from_yaml("flussonics: []\n").unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }

    #[test]
    fn test_unparseable_target_list_is_fatal() {
        let err = AppConfig::from_yaml("flussonics: not-a-list\n").unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }

    #[test]
    fn test_duplicate_urls_rejected() {
        let yaml = r#"
flussonics:
  - url: http://a.local:8080
  - url: http://a.local:8080/
"#;
        let err = AppConfig::from_yaml(yaml).unwrap_err();
        assert!(err.to_string().contains("duplicate flussonic url"));
    }

    #[test]
    fn test_duplicate_instance_names_rejected() {
        let yaml = r#"
flussonics:
  - url: http://a.local
    instance-name: edge
  - url: http://b.local
    instance-name: edge
"#;
        let err = AppConfig::from_yaml(yaml).unwrap_err();
        assert!(err.to_string().contains("duplicate flussonic instance-name"));

        // Derived names collide as well.
        let yaml = r#"
flussonics:
  - url: http://a.local:8080
  - url: http://b.local
    instance-name: a.local:8080
"#;
        assert!(AppConfig::from_yaml(yaml).is_err());
    }

    #[test]
    fn test_invalid_listen_address() {
        let config = AppConfig {
            listen_address: "nowhere".to_string(),
            flussonics: vec![TargetConfig::new("http://a")],
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_metrics_path() {
        let config = AppConfig {
            metrics_path: "metrics".to_string(),
            flussonics: vec![TargetConfig::new("http://a")],
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_and_discover() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.yaml");
        std::fs::File::create(&path)
            .unwrap()
            .write_all(MINIMAL.as_bytes())
            .unwrap();

        let config = AppConfig::load(&path).unwrap();
        assert_eq!(config.flussonics.len(), 1);

        let missing = dir.path().join("missing.yaml");
        let missing = missing.to_str().unwrap();
        let found = path.to_str().unwrap();
        let (discovered, _) = AppConfig::discover_in(&[missing, found]).unwrap();
        assert_eq!(discovered, path);

        let err = AppConfig::discover_in(&[missing]).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound(_)));
    }
}
