use serde::{Deserialize, Serialize};

use crate::chain::CardanoNetwork;
use crate::secrets::SecretSource;

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8000;
pub const DEFAULT_INFERENCE_URL: &str = "http://localhost:8080/v1";
pub const DEFAULT_MODEL: &str = "openai/gpt-4";
pub const DEFAULT_INFERENCE_TIMEOUT_SECS: u64 = 120;

pub const BLOCKFROST_KEY_ENV: &str = "BLOCKFROST_API_KEY";
pub const INFERENCE_KEY_ENV: &str = "GAIA_NODE_API_KEY";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub blockfrost: BlockfrostConfig,
    #[serde(default)]
    pub inference: InferenceConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl ServerConfig {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// On-chain data provider settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockfrostConfig {
    #[serde(default)]
    pub network: CardanoNetwork,
    /// Overrides the network-derived base URL (self-hosted gateways, tests).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(flatten)]
    pub credential: SecretSource,
}

impl Default for BlockfrostConfig {
    fn default() -> Self {
        Self {
            network: CardanoNetwork::default(),
            base_url: None,
            credential: SecretSource::from_env_var(BLOCKFROST_KEY_ENV),
        }
    }
}

impl BlockfrostConfig {
    pub fn resolved_base_url(&self) -> String {
        self.base_url
            .clone()
            .unwrap_or_else(|| self.network.base_url())
    }
}

/// OpenAI-compatible chat-completion backend settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InferenceConfig {
    #[serde(default = "default_inference_url")]
    pub base_url: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_inference_timeout")]
    pub timeout_secs: u64,
    #[serde(flatten)]
    pub credential: SecretSource,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            base_url: default_inference_url(),
            model: default_model(),
            timeout_secs: default_inference_timeout(),
            credential: SecretSource::from_env_var(INFERENCE_KEY_ENV),
        }
    }
}

fn default_host() -> String {
    DEFAULT_HOST.to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_inference_url() -> String {
    DEFAULT_INFERENCE_URL.to_string()
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_inference_timeout() -> u64 {
    DEFAULT_INFERENCE_TIMEOUT_SECS
}
