//! Exporter configuration.

use serde::Deserialize;
use url::Url;

use std::{
    fmt, io,
    net::{Ipv4Addr, SocketAddr},
    path::{Path, PathBuf},
    time::Duration,
};

use crate::server::{DEFAULT_METRICS_PATH, DEFAULT_SCRAPE_PATH};

/// Errors that can occur when loading [`Config`].
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// Error reading the config file.
    #[error("cannot read config file `{}`: {source}", path.display())]
    Read {
        /// Path to the config file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
    /// Error parsing the config.
    #[error("cannot parse config: {0}")]
    Parse(#[from] toml::de::Error),
    /// Invalid HTTP path.
    #[error("invalid `{field}` value `{path}`: {reason}")]
    InvalidPath {
        /// Config field.
        field: &'static str,
        /// Path value.
        path: String,
        /// What is wrong with the path.
        reason: &'static str,
    },
}

/// Exporter configuration. All fields are optional in the TOML representation.
#[derive(Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Address the exporter listens on.
    pub listen_address: SocketAddr,
    /// HTTP path serving exporter self-metrics.
    pub metrics_path: String,
    /// HTTP path scraping Splunk health.
    pub scrape_path: String,
    /// Username for the Splunk API.
    pub username: String,
    /// Password for the Splunk API.
    pub password: String,
    /// Splunk management URL.
    pub splunk_url: Url,
    /// Disables verification of the Splunk TLS certificate.
    pub insecure_skip_verify: bool,
    /// Timeout for Splunk API requests, in seconds. No timeout if not set.
    pub upstream_timeout_secs: Option<u64>,
    /// Observe scrape latency for failed scrapes as well as for successful ones.
    pub observe_failed_scrapes: bool,
}

impl fmt::Debug for Config {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("Config")
            .field("listen_address", &self.listen_address)
            .field("metrics_path", &self.metrics_path)
            .field("scrape_path", &self.scrape_path)
            .field("username", &self.username)
            .field("password", &"_")
            .field("splunk_url", &self.splunk_url.as_str())
            .field("insecure_skip_verify", &self.insecure_skip_verify)
            .field("upstream_timeout_secs", &self.upstream_timeout_secs)
            .field("observe_failed_scrapes", &self.observe_failed_scrapes)
            .finish()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_address: (Ipv4Addr::UNSPECIFIED, 9042).into(),
            metrics_path: DEFAULT_METRICS_PATH.to_owned(),
            scrape_path: DEFAULT_SCRAPE_PATH.to_owned(),
            username: String::new(),
            password: String::new(),
            splunk_url: Self::default_splunk_url(),
            insecure_skip_verify: false,
            upstream_timeout_secs: None,
            observe_failed_scrapes: false,
        }
    }
}

impl Config {
    fn default_splunk_url() -> Url {
        Url::parse("https://localhost:8089").unwrap()
        // ^ `unwrap()` is safe; the URL is statically known to be valid
    }

    /// Loads the configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or if the configuration is invalid.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_owned(),
            source,
        })?;
        Self::from_toml(&raw)
    }

    /// Parses the configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the string cannot be parsed, or if the configuration is invalid.
    pub fn from_toml(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Validates this configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if HTTP paths do not start with `/` or coincide.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, path) in [
            ("metrics_path", &self.metrics_path),
            ("scrape_path", &self.scrape_path),
        ] {
            if !path.starts_with('/') {
                return Err(ConfigError::InvalidPath {
                    field,
                    path: path.clone(),
                    reason: "path must start with `/`",
                });
            }
        }
        if self.metrics_path == self.scrape_path {
            return Err(ConfigError::InvalidPath {
                field: "scrape_path",
                path: self.scrape_path.clone(),
                reason: "path must differ from `metrics_path`",
            });
        }
        Ok(())
    }

    /// Returns the timeout for Splunk API requests.
    pub fn upstream_timeout(&self) -> Option<Duration> {
        self.upstream_timeout_secs.map(Duration::from_secs)
    }
}
