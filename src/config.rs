//! Configuration loading and types.
//!
//! Configuration is read from an optional YAML file into [`Config`]; every field
//! has a default, so a missing file or an empty document is a valid single-node
//! setup. Command-line flags in `main.rs` override individual values afterwards.

use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use crate::cluster::coordinator::CoordinatorSettings;
use crate::membership::types::ClusterNode;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub node: NodeConfig,

    #[serde(default)]
    pub cluster: ClusterConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Rejects values the runtime cannot run with.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.cluster.health_interval_ms == 0 {
            anyhow::bail!("cluster.health_interval_ms must be greater than zero");
        }
        if self.cluster.stats_interval_ms == 0 {
            anyhow::bail!("cluster.stats_interval_ms must be greater than zero");
        }
        Ok(())
    }
}

/// Identity of this process and how it joins the cluster.
#[derive(Debug, Clone, Deserialize)]
pub struct NodeConfig {
    #[serde(default = "default_node_id")]
    pub id: u32,

    /// Address peers use to reach this node. Also the bind host.
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Existing member to join through. `None` starts a new cluster.
    #[serde(default)]
    pub seed: Option<SeedConfig>,

    /// Initialize at startup instead of waiting for a bootstrap request.
    #[serde(default = "default_true")]
    pub auto_bootstrap: bool,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            id: default_node_id(),
            host: default_host(),
            port: default_port(),
            seed: None,
            auto_bootstrap: default_true(),
        }
    }
}

impl NodeConfig {
    pub fn identity(&self) -> ClusterNode {
        ClusterNode::new(self.id, self.host.clone(), self.port.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SeedConfig {
    pub id: u32,
    pub host: String,
    pub port: u16,
}

impl SeedConfig {
    /// Parses `id@host:port`.
    pub fn parse(raw: &str) -> anyhow::Result<Self> {
        let (id, address) = raw
            .split_once('@')
            .ok_or_else(|| anyhow::anyhow!("seed '{}' must look like id@host:port", raw))?;
        let (host, port) = address
            .rsplit_once(':')
            .ok_or_else(|| anyhow::anyhow!("seed '{}' is missing a port", raw))?;

        Ok(Self {
            id: id.parse()?,
            host: host.to_string(),
            port: port.parse()?,
        })
    }

    pub fn node(&self) -> ClusterNode {
        ClusterNode::new(self.id, self.host.clone(), self.port.to_string())
    }
}

/// Timing of the failure detector and peer calls, in milliseconds.
#[derive(Debug, Clone, Deserialize)]
pub struct ClusterConfig {
    #[serde(default = "default_health_interval_ms")]
    pub health_interval_ms: u64,

    #[serde(default = "default_heartbeat_attempts")]
    pub heartbeat_attempts: usize,

    #[serde(default = "default_heartbeat_retry_delay_ms")]
    pub heartbeat_retry_delay_ms: u64,

    #[serde(default = "default_leader_timeout_ms")]
    pub leader_timeout_ms: u64,

    #[serde(default = "default_peer_timeout_ms")]
    pub peer_timeout_ms: u64,

    #[serde(default = "default_forward_timeout_ms")]
    pub forward_timeout_ms: u64,

    /// How often the binary logs a cluster summary.
    #[serde(default = "default_stats_interval_ms")]
    pub stats_interval_ms: u64,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            health_interval_ms: default_health_interval_ms(),
            heartbeat_attempts: default_heartbeat_attempts(),
            heartbeat_retry_delay_ms: default_heartbeat_retry_delay_ms(),
            leader_timeout_ms: default_leader_timeout_ms(),
            peer_timeout_ms: default_peer_timeout_ms(),
            forward_timeout_ms: default_forward_timeout_ms(),
            stats_interval_ms: default_stats_interval_ms(),
        }
    }
}

impl ClusterConfig {
    pub fn settings(&self) -> CoordinatorSettings {
        CoordinatorSettings {
            health_interval: Duration::from_millis(self.health_interval_ms),
            heartbeat_attempts: self.heartbeat_attempts.max(1),
            heartbeat_retry_delay: Duration::from_millis(self.heartbeat_retry_delay_ms),
            leader_timeout: Duration::from_millis(self.leader_timeout_ms),
            peer_timeout: Duration::from_millis(self.peer_timeout_ms),
            forward_timeout: Duration::from_millis(self.forward_timeout_ms),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: text or json.
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_node_id() -> u32 {
    1
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_health_interval_ms() -> u64 {
    3000
}

fn default_heartbeat_attempts() -> usize {
    3
}

fn default_heartbeat_retry_delay_ms() -> u64 {
    200
}

fn default_leader_timeout_ms() -> u64 {
    10_000
}

fn default_peer_timeout_ms() -> u64 {
    500
}

fn default_forward_timeout_ms() -> u64 {
    3000
}

fn default_stats_interval_ms() -> u64 {
    5000
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

/// Parses configuration from YAML text.
pub fn parse_config(contents: &str) -> anyhow::Result<Config> {
    if contents.trim().is_empty() {
        return Ok(Config::default());
    }
    let config: Config = serde_yaml::from_str(contents)?;
    config.validate()?;
    Ok(config)
}

/// Loads configuration from `path`, or defaults if the file does not exist.
pub fn load_config<P: AsRef<Path>>(path: P) -> anyhow::Result<Config> {
    let path = path.as_ref();
    if !path.exists() {
        tracing::info!("No config file at {}, using defaults", path.display());
        return Ok(Config::default());
    }
    let contents = std::fs::read_to_string(path)?;
    parse_config(&contents)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_yields_defaults() {
        let config = parse_config("").unwrap();

        assert_eq!(config.node.id, 1);
        assert_eq!(config.node.port, 8080);
        assert!(config.node.auto_bootstrap);
        assert!(config.node.seed.is_none());
        assert_eq!(config.cluster.leader_timeout_ms, 10_000);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_partial_document_keeps_other_defaults() {
        let yaml = r#"
node:
  id: 4
  port: 9004
  seed:
    id: 1
    host: 10.0.0.1
    port: 9001
cluster:
  leader_timeout_ms: 2500
logging:
  format: json
"#;
        let config = parse_config(yaml).unwrap();

        assert_eq!(config.node.identity(), ClusterNode::new(4, "127.0.0.1", "9004"));
        assert_eq!(
            config.node.seed.as_ref().map(SeedConfig::node),
            Some(ClusterNode::new(1, "10.0.0.1", "9001"))
        );
        assert_eq!(config.cluster.leader_timeout_ms, 2500);
        assert_eq!(config.cluster.health_interval_ms, 3000);
        assert_eq!(config.logging.format, "json");
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_default_settings_match_coordinator_defaults() {
        let settings = ClusterConfig::default().settings();
        let reference = CoordinatorSettings::default();

        assert_eq!(settings.health_interval, reference.health_interval);
        assert_eq!(settings.heartbeat_attempts, reference.heartbeat_attempts);
        assert_eq!(settings.heartbeat_retry_delay, reference.heartbeat_retry_delay);
        assert_eq!(settings.leader_timeout, reference.leader_timeout);
        assert_eq!(settings.peer_timeout, reference.peer_timeout);
        assert_eq!(settings.forward_timeout, reference.forward_timeout);
    }

    #[test]
    fn test_zero_intervals_are_rejected() {
        let err = parse_config("cluster:\n  health_interval_ms: 0\n").unwrap_err();
        assert!(err.to_string().contains("health_interval_ms"));

        let err = parse_config("cluster:\n  stats_interval_ms: 0\n").unwrap_err();
        assert!(err.to_string().contains("stats_interval_ms"));

        assert!(parse_config("cluster:\n  health_interval_ms: 1\n").is_ok());
    }

    #[test]
    fn test_seed_parse() {
        let seed = SeedConfig::parse("3@node-c.local:7003").unwrap();
        assert_eq!(
            seed,
            SeedConfig {
                id: 3,
                host: "node-c.local".to_string(),
                port: 7003,
            }
        );

        assert!(SeedConfig::parse("node-c.local:7003").is_err());
        assert!(SeedConfig::parse("3@node-c.local").is_err());
        assert!(SeedConfig::parse("x@node-c.local:7003").is_err());
    }
}
