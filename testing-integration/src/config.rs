use log::{info, LevelFilter};
use serde::{Deserialize, Serialize};
use std::{
    collections::HashSet,
    fs,
    path::{Path, PathBuf},
    time::Duration,
};
use url::Url;

use crate::{
    error::{HarnessError, HarnessResult},
    waiters::PollConfig,
};

/// Default values for configuration
pub mod defaults {
    pub const NODE_URL: &str = "http://127.0.0.1:6869";
    pub const CHAIN_ID: char = 'T';
    pub const LOG_LEVEL: &str = "info";

    // Confirmation polling
    pub const POLL_TIMEOUT_MS: u64 = 5_000;
    pub const POLL_INTERVAL_MS: u64 = 100;

    // Node client
    pub const REQUEST_TIMEOUT_SECS: u64 = 30;
    pub const CONNECTION_TIMEOUT_SECS: u64 = 10;
    pub const NODE_STARTUP_TIMEOUT_SECS: u64 = 30;
}

/// Settings shared by the feature runner and the end-to-end suite
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HarnessConfig {
    #[serde(default = "default_node_url")]
    pub node_url: String,

    #[serde(default = "default_chain_id")]
    pub chain_id: char,

    /// Seed of the account that funds every other account
    #[serde(default)]
    pub root_seed: Option<String>,

    #[serde(default = "default_poll_timeout_ms")]
    pub poll_timeout_ms: u64,

    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    #[serde(default = "default_connection_timeout_secs")]
    pub connection_timeout_secs: u64,

    #[serde(default = "default_node_startup_timeout_secs")]
    pub node_startup_timeout_secs: u64,

    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub log_file: Option<PathBuf>,

    /// Directory receiving a JSON artifact for every failed scenario
    #[serde(default)]
    pub artifacts_dir: Option<PathBuf>,
}

fn default_node_url() -> String {
    defaults::NODE_URL.to_string()
}
fn default_chain_id() -> char {
    defaults::CHAIN_ID
}
fn default_poll_timeout_ms() -> u64 {
    defaults::POLL_TIMEOUT_MS
}
fn default_poll_interval_ms() -> u64 {
    defaults::POLL_INTERVAL_MS
}
fn default_request_timeout_secs() -> u64 {
    defaults::REQUEST_TIMEOUT_SECS
}
fn default_connection_timeout_secs() -> u64 {
    defaults::CONNECTION_TIMEOUT_SECS
}
fn default_node_startup_timeout_secs() -> u64 {
    defaults::NODE_STARTUP_TIMEOUT_SECS
}
fn default_log_level() -> String {
    defaults::LOG_LEVEL.to_string()
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            node_url: default_node_url(),
            chain_id: default_chain_id(),
            root_seed: None,
            poll_timeout_ms: default_poll_timeout_ms(),
            poll_interval_ms: default_poll_interval_ms(),
            request_timeout_secs: default_request_timeout_secs(),
            connection_timeout_secs: default_connection_timeout_secs(),
            node_startup_timeout_secs: default_node_startup_timeout_secs(),
            log_level: default_log_level(),
            log_file: None,
            artifacts_dir: None,
        }
    }
}

impl HarnessConfig {
    /// Load a JSON configuration file and validate it
    pub fn from_file<P: AsRef<Path>>(path: P) -> HarnessResult<Self> {
        let config = FileConfig::load(path)?.config;
        config.validate()?;
        Ok(config)
    }

    /// Write the default configuration as pretty JSON
    pub fn generate_template<P: AsRef<Path>>(path: P) -> HarnessResult<()> {
        let path = path.as_ref();
        let content = serde_json::to_string_pretty(&HarnessConfig::default())
            .map_err(|e| HarnessError::Config(e.to_string()))?;
        fs::write(path, content).map_err(|e| {
            HarnessError::Config(format!("cannot write {}: {}", path.display(), e))
        })
    }

    pub fn validate(&self) -> HarnessResult<()> {
        parse_node_url(&self.node_url)?;

        if !self.chain_id.is_ascii_alphanumeric() {
            return Err(HarnessError::Config(format!(
                "chain id '{}' must be a single ASCII character",
                self.chain_id
            )));
        }

        if self.poll_interval_ms == 0 {
            return Err(HarnessError::Config("poll interval must be positive".into()));
        }

        if self.poll_interval_ms > self.poll_timeout_ms {
            return Err(HarnessError::Config(format!(
                "poll interval {}ms is larger than poll timeout {}ms",
                self.poll_interval_ms, self.poll_timeout_ms
            )));
        }

        if self.request_timeout_secs == 0 || self.connection_timeout_secs == 0 {
            return Err(HarnessError::Config("node client timeouts must be positive".into()));
        }

        self.level_filter()?;
        Ok(())
    }

    #[inline]
    pub fn chain_id_byte(&self) -> u8 {
        self.chain_id as u8
    }

    /// Root seed, required by anything that funds accounts
    pub fn require_root_seed(&self) -> HarnessResult<&str> {
        self.root_seed
            .as_deref()
            .filter(|seed| !seed.trim().is_empty())
            .ok_or_else(|| HarnessError::Config("root seed is not configured".into()))
    }

    pub fn level_filter(&self) -> HarnessResult<LevelFilter> {
        self.log_level
            .parse()
            .map_err(|_| HarnessError::Config(format!("unknown log level '{}'", self.log_level)))
    }

    pub fn poll_config(&self) -> PollConfig {
        PollConfig {
            timeout: Duration::from_millis(self.poll_timeout_ms),
            interval: Duration::from_millis(self.poll_interval_ms),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn connection_timeout(&self) -> Duration {
        Duration::from_secs(self.connection_timeout_secs)
    }

    pub fn node_startup_timeout(&self) -> Duration {
        Duration::from_secs(self.node_startup_timeout_secs)
    }
}

/// Parse a node url, reading one without a scheme as plain http
pub fn parse_node_url(node_url: &str) -> HarnessResult<Url> {
    let url = if node_url.contains("://") {
        Url::parse(node_url)
    } else {
        Url::parse(&format!("http://{}", node_url))
    }
    .map_err(|e| HarnessError::Config(format!("invalid node url '{}': {}", node_url, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(HarnessError::Config(format!(
            "node url '{}' must use http or https",
            node_url
        )));
    }
    Ok(url)
}

/// Configuration read from a file, remembering which fields the file sets
#[derive(Clone, Debug)]
pub struct FileConfig {
    pub config: HarnessConfig,
    fields: HashSet<String>,
}

impl FileConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> HarnessResult<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            HarnessError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        let parse_error = |e: serde_json::Error| {
            HarnessError::Config(format!("cannot parse {}: {}", path.display(), e))
        };

        let value: serde_json::Value = serde_json::from_str(&content).map_err(parse_error)?;
        let fields = value
            .as_object()
            .map(|object| {
                object
                    .iter()
                    .filter(|(_, value)| !value.is_null())
                    .map(|(key, _)| key.clone())
                    .collect()
            })
            .unwrap_or_default();
        let config: HarnessConfig = serde_json::from_value(value).map_err(parse_error)?;

        info!("Loaded configuration from {}", path.display());
        Ok(Self { config, fields })
    }

    /// True when the file gives `field` a non null value
    pub fn sets(&self, field: &str) -> bool {
        self.fields.contains(field)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = HarnessConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.chain_id_byte(), b'T');
        assert_eq!(config.poll_config(), PollConfig::default());
        assert!(config.require_root_seed().is_err());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let config = HarnessConfig {
            node_url: "ftp://node".into(),
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(HarnessError::Config(_))));

        let config = HarnessConfig {
            poll_interval_ms: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = HarnessConfig {
            poll_interval_ms: 6_000,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = HarnessConfig {
            chain_id: 'é',
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = HarnessConfig {
            log_level: "loud".into(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_node_url_without_scheme_is_http() {
        let config = HarnessConfig {
            node_url: "127.0.0.1:6869".into(),
            ..Default::default()
        };
        assert!(config.validate().is_ok());
        assert_eq!(
            parse_node_url(&config.node_url).unwrap().as_str(),
            "http://127.0.0.1:6869/"
        );
        assert!(parse_node_url("ftp://node").is_err());
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"root_seed": "root", "chain_id": "L"}"#).unwrap();

        let config = HarnessConfig::from_file(&path).unwrap();
        assert_eq!(config.chain_id, 'L');
        assert_eq!(config.require_root_seed().unwrap(), "root");
        assert_eq!(config.node_url, defaults::NODE_URL);
        assert_eq!(config.poll_timeout_ms, defaults::POLL_TIMEOUT_MS);
    }

    #[test]
    fn test_file_config_knows_its_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"node_url": "http://node:6869", "root_seed": null}"#).unwrap();

        let file = FileConfig::load(&path).unwrap();
        assert!(file.sets("node_url"));
        assert!(!file.sets("root_seed"));
        assert!(!file.sets("chain_id"));
        assert_eq!(file.config.node_url, "http://node:6869");
        assert_eq!(file.config.chain_id, defaults::CHAIN_ID);
    }

    #[test]
    fn test_template_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("template.json");
        HarnessConfig::generate_template(&path).unwrap();

        let config = HarnessConfig::from_file(&path).unwrap();
        assert_eq!(config.node_url, defaults::NODE_URL);
        assert_eq!(config.root_seed, None);
    }
}
