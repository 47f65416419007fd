use std::path::Path;

use crate::chain::CardanoNetwork;
use crate::config::schema::{Config, BLOCKFROST_KEY_ENV, INFERENCE_KEY_ENV};
use crate::error::ConfigError;
use crate::secrets::SecretSource;

const SCHEMA_JSON: &str = include_str!("../../../../schema/config-v1.json");

/// Environment variable naming an optional JSON config file.
pub const CONFIG_PATH_ENV: &str = "VERITAS_CONFIG";

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source: e,
    })?;

    load_config_from_str(&content)
}

pub fn load_config_from_str(content: &str) -> Result<Config, ConfigError> {
    let json_value: serde_json::Value = serde_json::from_str(content)?;

    validate_schema(&json_value)?;

    let mut config: Config = serde_json::from_value(json_value)?;
    fill_credential_defaults(&mut config);

    validate_config(&config)?;

    Ok(config)
}

/// Loads the file named by `VERITAS_CONFIG` (or defaults), then overlays the
/// process environment.
pub fn load_from_env() -> Result<Config, ConfigError> {
    let mut config = match std::env::var(CONFIG_PATH_ENV) {
        Ok(path) if !path.trim().is_empty() => load_config(path.trim())?,
        _ => Config::default(),
    };
    apply_overrides(&mut config, |name| std::env::var(name).ok())?;
    validate_config(&config)?;
    Ok(config)
}

/// Overlays environment-style variables onto `config`. `lookup` returns the
/// value of a variable, or `None` when it is unset.
pub fn apply_overrides<F>(config: &mut Config, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

    if let Some(network) = get("CARDANO_NETWORK") {
        config.blockfrost.network =
            network
                .parse::<CardanoNetwork>()
                .map_err(|reason| ConfigError::InvalidEnv {
                    name: "CARDANO_NETWORK".to_string(),
                    value: network.clone(),
                    reason,
                })?;
    }
    if let Some(url) = get("BLOCKFROST_BASE_URL") {
        config.blockfrost.base_url = Some(url);
    }
    if let Some(url) = get("GAIA_NODE_URL") {
        config.inference.base_url = url;
    }
    if let Some(model) = get("GAIA_NODE_MODEL") {
        config.inference.model = model;
    }
    if let Some(host) = get("VERITAS_HOST") {
        config.server.host = host;
    }
    if let Some(port) = get("VERITAS_PORT") {
        config.server.port = parse_env("VERITAS_PORT", &port)?;
    }
    if let Some(secs) = get("VERITAS_INFERENCE_TIMEOUT_SECS") {
        config.inference.timeout_secs = parse_env("VERITAS_INFERENCE_TIMEOUT_SECS", &secs)?;
    }

    Ok(())
}

fn parse_env<T>(name: &str, value: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnv {
            name: name.to_string(),
            value: value.to_string(),
            reason: e.to_string(),
        })
}

/// A section that names no credential source falls back to the
/// conventional environment variable.
fn fill_credential_defaults(config: &mut Config) {
    if !config.blockfrost.credential.is_configured() {
        config.blockfrost.credential = SecretSource::from_env_var(BLOCKFROST_KEY_ENV);
    }
    if !config.inference.credential.is_configured() {
        config.inference.credential = SecretSource::from_env_var(INFERENCE_KEY_ENV);
    }
}

fn validate_schema(json_value: &serde_json::Value) -> Result<(), ConfigError> {
    let schema: serde_json::Value =
        serde_json::from_str(SCHEMA_JSON).map_err(|e| ConfigError::Validation {
            message: format!("Invalid embedded schema JSON: {}", e),
        })?;

    let validator = jsonschema::validator_for(&schema).map_err(|e| ConfigError::Validation {
        message: format!("Failed to compile JSON schema: {}", e),
    })?;

    let error_messages: Vec<String> = validator
        .iter_errors(json_value)
        .map(|e| e.to_string())
        .collect();
    if !error_messages.is_empty() {
        return Err(ConfigError::SchemaValidation {
            errors: error_messages.join("; "),
        });
    }

    Ok(())
}

pub(crate) fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.server.host.trim().is_empty() {
        return Err(ConfigError::Validation {
            message: "server.host must not be empty".to_string(),
        });
    }

    if config.inference.timeout_secs == 0 {
        return Err(ConfigError::Validation {
            message: "inference.timeoutSecs must be greater than zero".to_string(),
        });
    }

    if config.inference.model.trim().is_empty() {
        return Err(ConfigError::Validation {
            message: "inference.model must not be empty".to_string(),
        });
    }

    validate_url("inference.baseUrl", &config.inference.base_url)?;
    if let Some(ref url) = config.blockfrost.base_url {
        validate_url("blockfrost.baseUrl", url)?;
    }

    Ok(())
}

fn validate_url(field: &str, value: &str) -> Result<(), ConfigError> {
    match reqwest::Url::parse(value) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => Ok(()),
        Ok(url) => Err(ConfigError::Validation {
            message: format!("{} has unsupported scheme '{}'", field, url.scheme()),
        }),
        Err(e) => Err(ConfigError::Validation {
            message: format!("{} is not a valid URL '{}': {}", field, value, e),
        }),
    }
}
