//! stratus.toml configuration parser.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Top-level daemon configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StratusConfig {
    pub driver: DriverConfig,
    pub store: Option<StoreConfig>,
    #[serde(default)]
    pub connections: Vec<ConnectionEntry>,
    pub crawler: Option<CrawlerConfig>,
}

/// Provider gateway driver endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriverConfig {
    /// Base URL of the remote driver, e.g. `http://localhost:1024/driver`.
    pub endpoint: String,
    /// Per-call deadline in seconds.
    pub timeout_secs: Option<u64>,
}

/// Persistent store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    pub data_dir: Option<PathBuf>,
}

/// A named provider connection registered at startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionEntry {
    pub name: String,
    pub provider: String,
    pub region: String,
    pub credential: String,
}

/// Periodic spec catalog refresh settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlerConfig {
    /// Namespace the refreshed catalog rows belong to.
    pub namespace: String,
    /// Refresh interval in seconds.
    pub interval_secs: Option<u64>,
    /// Update existing catalog rows on key conflict instead of failing.
    pub update_on_conflict: Option<bool>,
}

impl StratusConfig {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: StratusConfig = toml::from_str(&content)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_config() {
        let toml_str = r#"
[driver]
endpoint = "http://localhost:1024/driver"
timeout_secs = 120

[store]
data_dir = "/var/lib/stratus"

[[connections]]
name = "aws-seoul"
provider = "aws"
region = "ap-northeast-2"
credential = "aws-cred-01"

[[connections]]
name = "gcp-iowa"
provider = "gcp"
region = "us-central1"
credential = "gcp-cred-01"

[crawler]
namespace = "system"
interval_secs = 3600
update_on_conflict = true
"#;
        let config: StratusConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.driver.endpoint, "http://localhost:1024/driver");
        assert_eq!(config.connections.len(), 2);
        assert_eq!(config.connections[1].provider, "gcp");
        let crawler = config.crawler.unwrap();
        assert_eq!(crawler.namespace, "system");
        assert_eq!(crawler.update_on_conflict, Some(true));
    }

    #[test]
    fn connections_default_to_empty() {
        let toml_str = r#"
[driver]
endpoint = "http://localhost:1024/driver"
"#;
        let config: StratusConfig = toml::from_str(toml_str).unwrap();
        assert!(config.connections.is_empty());
        assert!(config.crawler.is_none());
    }
}
