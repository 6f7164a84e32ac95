//! Configuration management for the raffle SDK
//!
//! Settings are layered: built-in defaults, then an optional TOML file, then
//! environment variables prefixed with `RAFFLE_` (sections separated by `__`,
//! e.g. `RAFFLE_NETWORK__RPC_URL`). Command-line flags are applied on top by
//! the binary.

use std::path::Path;
use std::time::Duration;

use alloy_primitives::Address;
use config::{Config as ConfigLoader, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};

use crate::discovery::{
    BlockPin, DiscoveryOptions, DEFAULT_IMAGE_URL, DEFAULT_MAX_CONCURRENT_READS,
    DEFAULT_MAX_RAFFLES, DEFAULT_READ_TIMEOUT,
};
use crate::error::Error;

/// Environment variable prefix
const ENV_PREFIX: &str = "RAFFLE";

/// Config file looked up in the working directory when none is given
pub const DEFAULT_CONFIG_FILE: &str = "raffle.toml";

/// Chain connection settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkSettings {
    /// JSON-RPC endpoint URL
    pub rpc_url: String,
    /// Chain ID the raffles are deployed on
    pub chain_id: u64,
    /// Factory contract listing all raffles
    pub factory_address: Option<Address>,
}

impl Default for NetworkSettings {
    fn default() -> Self {
        Self {
            rpc_url: "http://127.0.0.1:8545".to_string(),
            chain_id: 1,
            factory_address: None,
        }
    }
}

/// Raffle discovery settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoverySettings {
    /// Upper bound on raffles resolved at once
    pub max_concurrent_reads: usize,
    /// Per-read timeout in seconds, 0 to disable
    pub read_timeout_secs: u64,
    /// Pin all reads of a run to the head block at its start
    pub pin_block: bool,
    /// Largest raffle count accepted from the factory
    pub max_raffles: u64,
    /// Image shown next to every raffle
    pub image_url: String,
}

impl Default for DiscoverySettings {
    fn default() -> Self {
        Self {
            max_concurrent_reads: DEFAULT_MAX_CONCURRENT_READS,
            read_timeout_secs: DEFAULT_READ_TIMEOUT.as_secs(),
            pin_block: true,
            max_raffles: DEFAULT_MAX_RAFFLES,
            image_url: DEFAULT_IMAGE_URL.to_string(),
        }
    }
}

impl DiscoverySettings {
    pub fn to_options(&self) -> DiscoveryOptions {
        DiscoveryOptions {
            max_concurrent_reads: self.max_concurrent_reads,
            read_timeout: (self.read_timeout_secs > 0)
                .then(|| Duration::from_secs(self.read_timeout_secs)),
            block: if self.pin_block {
                BlockPin::Snapshot
            } else {
                BlockPin::Latest
            },
            max_raffles: self.max_raffles,
            image_url: self.image_url.clone(),
        }
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Compact,
    Pretty,
}

/// Logging settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Log level (error, warn, info, debug, trace) or a full filter directive
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::default(),
        }
    }
}

/// Complete SDK configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RaffleConfig {
    pub network: NetworkSettings,
    pub discovery: DiscoverySettings,
    pub logging: LoggingSettings,
}

impl RaffleConfig {
    /// Load from `path` (or `raffle.toml` if present) and the environment
    ///
    /// The result is not validated, so callers can apply overrides first and
    /// then call [`validate`](Self::validate).
    pub fn load(path: Option<&Path>) -> Result<Self, Error> {
        let mut builder = ConfigLoader::builder();

        builder = match path {
            Some(path) => builder.add_source(File::from(path).format(FileFormat::Toml)),
            None => builder.add_source(
                File::with_name(DEFAULT_CONFIG_FILE)
                    .format(FileFormat::Toml)
                    .required(false),
            ),
        };

        let settings = builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    /// Load from a TOML string, without consulting files or the environment
    pub fn from_toml_str(toml: &str) -> Result<Self, Error> {
        let config: RaffleConfig = ConfigLoader::builder()
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()?
            .try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Check settings that do not depend on the command being run
    pub fn validate(&self) -> Result<(), Error> {
        url::Url::parse(&self.network.rpc_url).map_err(|e| {
            Error::Config(format!("Invalid RPC URL '{}': {}", self.network.rpc_url, e))
        })?;
        if self.discovery.max_concurrent_reads == 0 {
            return Err(Error::Config(
                "discovery.max_concurrent_reads must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// The configured factory address, required for listing raffles
    pub fn require_factory(&self) -> Result<Address, Error> {
        self.network.factory_address.ok_or_else(|| {
            Error::Config(
                "No factory address configured (set network.factory_address, \
                 RAFFLE_NETWORK__FACTORY_ADDRESS or --factory)"
                    .to_string(),
            )
        })
    }
}
