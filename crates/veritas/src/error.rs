use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum VeritasError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Server error: {0}")]
    Server(#[from] std::io::Error),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config JSON: {0}")]
    ParseJson(#[from] serde_json::Error),

    #[error("Config validation failed: {message}")]
    Validation { message: String },

    #[error("Schema validation failed: {errors}")]
    SchemaValidation { errors: String },

    #[error("Invalid value '{value}' for environment variable '{name}': {reason}")]
    InvalidEnv {
        name: String,
        value: String,
        reason: String,
    },

    #[error("Failed to build HTTP client: {0}")]
    HttpClient(String),

    #[error("Failed to resolve secret for {field}: {source}")]
    Secret {
        field: &'static str,
        #[source]
        source: crate::secrets::SecretError,
    },
}

pub type Result<T> = std::result::Result<T, VeritasError>;
