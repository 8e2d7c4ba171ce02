//! Configuration for the mock server binary.

mod listen;

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::response::DEFAULT_VENDOR_PREFIX;

pub use listen::{ListenConfig, MetricsConfig};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Directory holding this server's counter, journal and fixtures.
    pub state_dir: PathBuf,

    #[serde(default)]
    pub listen: ListenConfig,

    #[serde(default)]
    pub metrics: MetricsConfig,

    /// First path segment of `/<vendor>/<reference>` URLs.
    #[serde(default = "default_vendor_prefix")]
    pub vendor_prefix: String,

    /// Take the advisory directory lock around read-modify-write sequences.
    #[serde(default = "default_lock")]
    pub lock: bool,
}

fn default_vendor_prefix() -> String {
    DEFAULT_VENDOR_PREFIX.to_string()
}

fn default_lock() -> bool {
    true
}

impl Config {
    pub fn new(state_dir: impl Into<PathBuf>) -> Self {
        Self {
            state_dir: state_dir.into(),
            listen: ListenConfig::default(),
            metrics: MetricsConfig::default(),
            vendor_prefix: default_vendor_prefix(),
            lock: default_lock(),
        }
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, anyhow::Error> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.state_dir.as_os_str().is_empty() {
            anyhow::bail!("'state_dir' must not be empty");
        }

        if self.vendor_prefix.is_empty() {
            anyhow::bail!("'vendor_prefix' must not be empty");
        }

        if self.vendor_prefix.contains('/') {
            anyhow::bail!(
                "'vendor_prefix' must be a single path segment, got '{}'",
                self.vendor_prefix
            );
        }

        if self.metrics.enabled && self.metrics.port == self.listen.port {
            anyhow::bail!(
                "metrics port {} collides with the listen port",
                self.metrics.port
            );
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config() {
        let yaml = r#"
state_dir: /tmp/mockdir-state
listen:
  host: 0.0.0.0
  port: 18080
metrics:
  enabled: true
  port: 19090
vendor_prefix: VND.Acme
lock: false
"#;

        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.state_dir, PathBuf::from("/tmp/mockdir-state"));
        assert_eq!(config.listen.address(), "0.0.0.0:18080");
        assert!(config.metrics.enabled);
        assert_eq!(config.metrics.port, 19090);
        assert_eq!(config.vendor_prefix, "VND.Acme");
        assert!(!config.lock);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_defaults() {
        let config: Config = serde_yaml::from_str("state_dir: ./state").unwrap();
        assert_eq!(config.listen.address(), "127.0.0.1:8080");
        assert!(!config.metrics.enabled);
        assert_eq!(config.vendor_prefix, "VND.Mockdir");
        assert!(config.lock);
    }

    #[test]
    fn test_missing_state_dir_rejected() {
        let result: Result<Config, _> = serde_yaml::from_str("listen:\n  port: 1\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_vendor_prefix_with_slash_rejected() {
        let mut config = Config::new("/tmp/x");
        config.vendor_prefix = "a/b".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("single path segment"));
    }

    #[test]
    fn test_metrics_port_collision_rejected() {
        let mut config = Config::new("/tmp/x");
        config.metrics.enabled = true;
        config.metrics.port = config.listen.port;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("mockdir.yaml");
        std::fs::write(&path, "state_dir: /tmp/state\nvendor_prefix: ''\n").unwrap();
        assert!(Config::from_file(&path).is_err());

        std::fs::write(&path, "state_dir: /tmp/state\n").unwrap();
        assert_eq!(Config::from_file(&path).unwrap().state_dir, PathBuf::from("/tmp/state"));
    }
}
