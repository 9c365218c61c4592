// Copyright (c) Mysten Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Configuration loader, grounded on `sui-config`'s serde-round-trip
//! `Config` convention: a plain serde struct, loaded from YAML on disk and
//! overridable by environment variables for secrets (RPC API keys, DB
//! credentials) that should not be committed to a config file.

use std::collections::HashMap;
use std::path::Path;

use node_types::Network;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("missing required environment variable {0}")]
    MissingEnv(String),
}

/// Top-level node configuration (SPEC_FULL.md §1 "Configuration").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeConfig {
    pub database: DatabaseConfig,
    #[serde(default)]
    pub redis: Option<RedisConfig>,
    pub metrics_bind_address: String,
    #[serde(default = "default_api_bind_address")]
    pub api_bind_address: String,
    #[serde(default)]
    pub json_logs: bool,
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
    /// Per-network Source Client Pool endpoints.
    pub networks: HashMap<Network, NetworkEndpointConfig>,
    /// The `(network, worker, parameters)` instances this process runs.
    pub instances: Vec<InstanceConfig>,
}

fn default_log_filter() -> String {
    "info".to_string()
}

fn default_api_bind_address() -> String {
    "0.0.0.0:8080".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// May be overridden by the `NODE_DATABASE_URL` environment variable
    /// so credentials need not be committed to the config file.
    pub url: String,
    #[serde(default = "default_pool_size")]
    pub pool_size: u32,
}

fn default_pool_size() -> u32 {
    16
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisConfig {
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkEndpointConfig {
    pub endpoint: String,
    #[serde(default)]
    pub api_key_env: Option<String>,
    #[serde(default = "default_concurrent_requests")]
    pub concurrent_requests: usize,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_concurrent_requests() -> usize {
    8
}

fn default_request_timeout_secs() -> u64 {
    30
}

/// One running `(network, worker, parameters)` instance (spec.md §2, §4.4).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstanceConfig {
    pub network: Network,
    pub worker: String,
    /// Opaque to `node-config`: interpreted by the named worker/data
    /// source, and hashed to derive the checkpoint id (SPEC_FULL.md §3).
    #[serde(default)]
    pub parameters: serde_json::Value,
    #[serde(default)]
    pub block_start: Option<u64>,
    #[serde(default)]
    pub block_target: Option<u64>,
    #[serde(default = "default_concurrent_block_requests")]
    pub concurrent_block_requests: usize,
    #[serde(default)]
    pub concurrent_transforms: Option<usize>,
    #[serde(default = "default_progress_interval_secs")]
    pub progress_interval_secs: u64,
    #[serde(default = "default_unhealthy_after")]
    pub unhealthy_after_restarts: u32,
    #[serde(default = "default_ready_within_blocks")]
    pub ready_within_blocks: u64,
}

fn default_concurrent_block_requests() -> usize {
    8
}

fn default_progress_interval_secs() -> u64 {
    10
}

fn default_unhealthy_after() -> u32 {
    5
}

fn default_ready_within_blocks() -> u64 {
    3
}

impl InstanceConfig {
    /// spec.md §4.4: "fan-out ≤ concurrent_transforms (default equals
    /// concurrent_block_requests)". Independently configurable per
    /// SPEC_FULL.md §9's resolution of the corresponding Open Question.
    pub fn concurrent_transforms(&self) -> usize {
        self.concurrent_transforms.unwrap_or(self.concurrent_block_requests)
    }
}

impl NodeConfig {
    pub fn from_yaml_str(contents: &str) -> Result<Self, ConfigError> {
        let mut config: NodeConfig = serde_yaml::from_str(contents)?;
        config.apply_env_overrides();
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_yaml_str(&contents)
    }

    /// Overlays environment variables on top of the file-loaded config, so
    /// secrets never need to be committed (SPEC_FULL.md §1).
    fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var("NODE_DATABASE_URL") {
            self.database.url = url;
        }
        if let Ok(url) = std::env::var("NODE_REDIS_URL") {
            self.redis = Some(RedisConfig { url });
        }
    }

    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        Ok(serde_yaml::to_string(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
database:
  url: "postgres://localhost/node"
metrics_bind_address: "0.0.0.0:9184"
networks:
  ethereum:
    endpoint: "https://eth.example.com"
instances:
  - network: ethereum
    worker: optimism-bridge
    parameters:
      contract: "0x1234"
"#;

    #[test]
    fn parses_minimal_config() {
        let config = NodeConfig::from_yaml_str(SAMPLE).unwrap();
        assert_eq!(config.database.url, "postgres://localhost/node");
        assert_eq!(config.instances.len(), 1);
        assert_eq!(config.instances[0].network, Network::Ethereum);
        assert_eq!(config.instances[0].concurrent_block_requests, 8);
        assert_eq!(config.instances[0].concurrent_transforms(), 8);
    }

    #[test]
    fn env_override_replaces_database_url() {
        std::env::set_var("NODE_DATABASE_URL", "postgres://override/node");
        let config = NodeConfig::from_yaml_str(SAMPLE).unwrap();
        assert_eq!(config.database.url, "postgres://override/node");
        std::env::remove_var("NODE_DATABASE_URL");
    }

    #[test]
    fn round_trips_through_yaml() {
        let config = NodeConfig::from_yaml_str(SAMPLE).unwrap();
        let yaml = config.to_yaml().unwrap();
        let reparsed = NodeConfig::from_yaml_str(&yaml).unwrap();
        assert_eq!(reparsed.database.url, config.database.url);
    }
}
