//! Relay configuration.
//!
//! Configuration can be loaded from:
//! - Environment variables (HERALD_*)
//! - TOML configuration file

use anyhow::{anyhow, bail, Context, Result};
use herald_backend::BackendConfig;
use herald_core::validate_topic_name;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Relay configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Topic both endpoints bind to.
    #[serde(default = "default_topic")]
    pub topic: String,

    /// DDS domain id.
    #[serde(default = "default_domain")]
    pub domain: u32,

    /// Producer configuration.
    #[serde(default)]
    pub producer: ProducerConfig,

    /// Receive configuration.
    #[serde(default)]
    pub receive: ReceiveConfig,

    /// Mock backend configuration.
    #[serde(default)]
    pub mock: MockConfig,

    /// Feed configuration.
    #[serde(default)]
    pub feed: FeedConfig,

    /// Shutdown configuration.
    #[serde(default)]
    pub shutdown: ShutdownConfig,

    /// Metrics configuration.
    #[serde(default)]
    pub metrics: MetricsConfig,
}

/// Producer configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProducerConfig {
    /// Publish cadence in milliseconds.
    #[serde(default = "default_producer_interval")]
    pub interval_ms: u64,

    /// Text prepended to the running sequence number.
    #[serde(default = "default_producer_prefix")]
    pub prefix: String,
}

/// Receive configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReceiveConfig {
    /// Bounded wait per receive in milliseconds. Also caps how long a
    /// cancelled delivery bridge keeps running.
    #[serde(default = "default_receive_poll")]
    pub poll_ms: u64,
}

/// Mock backend configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MockConfig {
    /// Ring capacity of the mock topic log.
    #[serde(default = "default_mock_capacity")]
    pub capacity: usize,
}

/// Feed configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedConfig {
    /// How many delivered messages the feed retains.
    #[serde(default = "default_feed_retain")]
    pub retain: usize,
}

/// Shutdown configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShutdownConfig {
    /// Join-barrier grace in milliseconds. A task still running past
    /// this bound after cancellation is reported as an error.
    #[serde(default = "default_shutdown_grace")]
    pub grace_ms: u64,
}

/// Metrics configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Enable metrics export.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Metrics port.
    #[serde(default = "default_metrics_port")]
    pub port: u16,
}

// Default value functions
fn default_topic() -> String {
    std::env::var("HERALD_TOPIC").unwrap_or_else(|_| "hello_topic".to_string())
}

fn default_domain() -> u32 {
    std::env::var("HERALD_DOMAIN")
        .ok()
        .and_then(|d| d.parse().ok())
        .unwrap_or(0)
}

fn default_true() -> bool {
    true
}

fn default_producer_interval() -> u64 {
    2_000
}

fn default_producer_prefix() -> String {
    "Hello World".to_string()
}

fn default_receive_poll() -> u64 {
    100
}

fn default_mock_capacity() -> usize {
    100
}

fn default_feed_retain() -> usize {
    20
}

fn default_shutdown_grace() -> u64 {
    5_000
}

fn default_metrics_port() -> u16 {
    9090
}

impl Default for Config {
    fn default() -> Self {
        Self {
            topic: default_topic(),
            domain: default_domain(),
            producer: ProducerConfig::default(),
            receive: ReceiveConfig::default(),
            mock: MockConfig::default(),
            feed: FeedConfig::default(),
            shutdown: ShutdownConfig::default(),
            metrics: MetricsConfig::default(),
        }
    }
}

impl Default for ProducerConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_producer_interval(),
            prefix: default_producer_prefix(),
        }
    }
}

impl Default for ReceiveConfig {
    fn default() -> Self {
        Self {
            poll_ms: default_receive_poll(),
        }
    }
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            capacity: default_mock_capacity(),
        }
    }
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            retain: default_feed_retain(),
        }
    }
}

impl Default for ShutdownConfig {
    fn default() -> Self {
        Self {
            grace_ms: default_shutdown_grace(),
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            port: default_metrics_port(),
        }
    }
}

impl Config {
    /// Load configuration from file or defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed,
    /// or if the resulting configuration is invalid.
    pub fn load() -> Result<Self> {
        // Try to load from default paths
        let config_paths = [
            "herald.toml",
            "/etc/herald/herald.toml",
            "~/.config/herald/herald.toml",
        ];

        for path in &config_paths {
            let expanded = shellexpand::tilde(path);
            if Path::new(expanded.as_ref()).exists() {
                return Self::from_file(expanded.as_ref());
            }
        }

        // Fall back to defaults with environment overrides
        let config = Self::default();
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed, or validated.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        config
            .validate()
            .with_context(|| format!("Invalid config file: {}", path.display()))?;

        Ok(config)
    }

    /// Check the configuration for values the relay cannot run with.
    ///
    /// # Errors
    ///
    /// Returns an error for an invalid topic name or a zero interval.
    pub fn validate(&self) -> Result<()> {
        validate_topic_name(&self.topic)
            .map_err(|reason| anyhow!("invalid topic {:?}: {reason}", self.topic))?;
        if self.producer.interval_ms == 0 {
            bail!("producer.interval_ms must be positive");
        }
        if self.receive.poll_ms == 0 {
            bail!("receive.poll_ms must be positive");
        }
        Ok(())
    }

    /// The backend-facing slice of this configuration.
    #[must_use]
    pub fn backend_config(&self) -> BackendConfig {
        BackendConfig {
            topic: self.topic.clone(),
            domain: self.domain,
            poll: self.receive.poll(),
            mock_capacity: self.mock.capacity,
        }
    }
}

impl ProducerConfig {
    /// Publish cadence as a [`Duration`].
    #[must_use]
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

impl ReceiveConfig {
    /// Bounded receive wait as a [`Duration`].
    #[must_use]
    pub fn poll(&self) -> Duration {
        Duration::from_millis(self.poll_ms)
    }
}

impl ShutdownConfig {
    /// Join-barrier grace as a [`Duration`].
    #[must_use]
    pub fn grace(&self) -> Duration {
        Duration::from_millis(self.grace_ms)
    }
}
