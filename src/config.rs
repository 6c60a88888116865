use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{AggregatorError, Result};
use crate::fetch::DrainPolicy;

pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";
pub const ENV_PREFIX: &str = "AGGREGATOR";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub fetch: FetchConfig,
    pub database: DatabaseConfig,
    pub cache: CacheConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Upper bound for a single dispatched lookup
    pub sub_timeout_ms: u64,
    /// Upper bound for one whole request
    pub request_timeout_ms: u64,
    pub drain_policy: DrainPolicy,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            sub_timeout_ms: 2000,
            request_timeout_ms: 5000,
            drain_policy: DrainPolicy::WaitForAll,
        }
    }
}

impl FetchConfig {
    pub fn sub_timeout(&self) -> Duration {
        Duration::from_millis(self.sub_timeout_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: "schemes.db".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub enabled: bool,
    pub capacity: usize,
    pub ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            capacity: 1024,
            ttl_secs: 30,
        }
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "scheme_aggregator=info".to_string(),
        }
    }
}

impl Config {
    /// Load from an optional TOML file overlaid with `AGGREGATOR_*` variables
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        dotenv::dotenv().ok();

        let config = config::Config::builder()
            .add_source(config::File::from(path.as_ref()).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: Config = config.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.fetch.sub_timeout_ms == 0 {
            return Err(AggregatorError::Config(
                "fetch.sub_timeout_ms must be greater than zero".to_string(),
            ));
        }
        if self.fetch.request_timeout_ms < self.fetch.sub_timeout_ms {
            return Err(AggregatorError::Config(format!(
                "fetch.request_timeout_ms ({}) is shorter than fetch.sub_timeout_ms ({})",
                self.fetch.request_timeout_ms, self.fetch.sub_timeout_ms
            )));
        }
        if self.cache.enabled && self.cache.capacity == 0 {
            return Err(AggregatorError::Config(
                "cache.capacity must be greater than zero when the cache is enabled".to_string(),
            ));
        }
        Ok(())
    }

    pub fn to_toml(&self) -> anyhow::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}
