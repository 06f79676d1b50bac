//! Configuration management

use queuestack_queue::{QueueSeed, StoreSettings};
use serde::Deserialize;
use std::path::Path;

/// Main configuration structure
#[derive(Debug, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub store: StoreConfig,

    /// Queues the store starts with
    #[serde(default)]
    pub queues: Vec<QueueSeed>,
}

#[derive(Debug, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_store_name")]
    pub name: String,

    #[serde(default)]
    pub reject_when_closed: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            name: default_store_name(),
            reject_when_closed: false,
        }
    }
}

impl StoreConfig {
    pub fn settings(&self) -> StoreSettings {
        StoreSettings {
            reject_when_closed: self.reject_when_closed,
        }
    }
}

fn default_store_name() -> String {
    "default".to_string()
}

impl Config {
    /// Load configuration from file and environment
    ///
    /// Without an explicit path, `queuestack.toml` in the working directory
    /// is used if present. `QUEUESTACK_STORE__NAME` style variables override
    /// file values.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let file = match path {
            Some(path) => config::File::from(path).required(true),
            None => config::File::with_name("queuestack").required(false),
        };

        let config = config::Config::builder()
            .add_source(file)
            .add_source(
                config::Environment::with_prefix("QUEUESTACK")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?;

        Ok(config.try_deserialize::<Config>()?)
    }

    #[cfg(test)]
    fn from_toml(input: &str) -> anyhow::Result<Self> {
        let config = config::Config::builder()
            .add_source(config::File::from_str(input, config::FileFormat::Toml))
            .build()?;

        Ok(config.try_deserialize::<Config>()?)
    }
}
