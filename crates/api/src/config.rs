//! Server configuration, loaded from environment variables via the `config`
//! crate (teacher pattern: a typed struct deserialized once at startup).

use config::{Config, ConfigError, Environment};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_true")]
    pub enable_cors: bool,
    #[serde(default = "default_key_id")]
    pub signing_key_id: String,
    #[serde(default = "default_secret")]
    pub signing_secret: String,
    #[serde(default = "default_base_compatibility")]
    pub matching_base_compatibility: f64,
    #[serde(default = "default_value_delta_fraction")]
    pub matching_value_delta_fraction: f64,
    #[serde(default = "default_proposal_ttl_secs")]
    pub matching_proposal_ttl_secs: i64,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}
fn default_port() -> u16 {
    3000
}
fn default_true() -> bool {
    true
}
fn default_key_id() -> String {
    "swapgraph-dev-key".to_string()
}
fn default_secret() -> String {
    "dev-only-insecure-secret".to_string()
}
fn default_base_compatibility() -> f64 {
    0.8
}
fn default_value_delta_fraction() -> f64 {
    0.1
}
fn default_proposal_ttl_secs() -> i64 {
    3600
}

impl ApiConfig {
    /// Load from `SWAPGRAPH_*` environment variables, falling back to
    /// defaults for anything unset.
    pub fn load() -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(Environment::with_prefix("SWAPGRAPH").separator("__"))
            .build()?
            .try_deserialize()
    }
}
