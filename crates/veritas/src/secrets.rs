//! Credential resolution for the data provider and inference backend.
//!
//! A credential may be given in three ways, checked in this order:
//!
//! 1. **Direct value** - `"apiKey": "preprodAbc..."` (local testing)
//! 2. **File reference** - `"apiKeyFile": "/run/secrets/blockfrost"` (Docker secrets)
//! 3. **Env var reference** - `"apiKeyEnvVar": "BLOCKFROST_API_KEY"`

use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::fs;

/// Error type for secret resolution failures.
#[derive(Debug, thiserror::Error)]
pub enum SecretError {
    #[error("No secret source provided (need one of: direct value, file path, or env var name)")]
    NoSourceProvided,

    #[error("Failed to read secret from file '{path}': {source}")]
    FileReadError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Environment variable '{name}' not set")]
    EnvVarNotSet { name: String },

    #[error("Environment variable '{name}' contains invalid UTF-8")]
    EnvVarNotUnicode { name: String },
}

pub type Result<T> = std::result::Result<T, SecretError>;

/// Where a credential comes from. All fields are optional; the first
/// non-empty one wins.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecretSource {
    #[serde(default, skip_serializing_if = "Option::is_none", rename = "apiKey")]
    pub value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", rename = "apiKeyFile")]
    pub file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", rename = "apiKeyEnvVar")]
    pub env_var: Option<String>,
}

impl SecretSource {
    /// A source that only reads the named environment variable.
    pub fn from_env_var(name: &str) -> Self {
        Self {
            env_var: Some(name.to_string()),
            ..Self::default()
        }
    }

    pub fn is_configured(&self) -> bool {
        has_secret_source(
            self.value.as_deref(),
            self.file.as_deref(),
            self.env_var.as_deref(),
        )
    }

    /// Resolves the credential. A missing source or an unset env var is
    /// reported as `Ok(None)`; an unreadable file is an error.
    pub fn resolve(&self) -> Result<Option<SecretString>> {
        match resolve_secret(
            self.value.as_deref(),
            self.file.as_deref(),
            self.env_var.as_deref(),
        ) {
            Ok(secret) => Ok(Some(secret)),
            Err(SecretError::NoSourceProvided) | Err(SecretError::EnvVarNotSet { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

/// Resolves a secret from a direct value, a file, or an environment
/// variable, in that priority order.
pub fn resolve_secret(
    direct: Option<&str>,
    file_path: Option<&str>,
    env_var: Option<&str>,
) -> Result<SecretString> {
    if let Some(value) = direct {
        if !value.is_empty() {
            return Ok(SecretString::from(value.to_string()));
        }
    }

    if let Some(path) = file_path {
        if !path.is_empty() {
            let expanded = expand_home(path);
            return match fs::read_to_string(&expanded) {
                Ok(content) => Ok(SecretString::from(content.trim().to_string())),
                Err(e) => Err(SecretError::FileReadError {
                    path: expanded,
                    source: e,
                }),
            };
        }
    }

    if let Some(var_name) = env_var {
        if !var_name.is_empty() {
            return match std::env::var(var_name) {
                // Env files often leave a trailing newline.
                Ok(value) if !value.trim().is_empty() => Ok(SecretString::from(value.trim().to_string())),
                Ok(_) | Err(std::env::VarError::NotPresent) => Err(SecretError::EnvVarNotSet {
                    name: var_name.to_string(),
                }),
                Err(std::env::VarError::NotUnicode(_)) => Err(SecretError::EnvVarNotUnicode {
                    name: var_name.to_string(),
                }),
            };
        }
    }

    Err(SecretError::NoSourceProvided)
}

/// Checks if at least one secret source is configured (non-empty).
pub fn has_secret_source(
    direct: Option<&str>,
    file_path: Option<&str>,
    env_var: Option<&str>,
) -> bool {
    direct.is_some_and(|s| !s.is_empty())
        || file_path.is_some_and(|s| !s.is_empty())
        || env_var.is_some_and(|s| !s.is_empty())
}

/// Expands a leading `~` to the user's home directory. `~user/path` is not supported.
fn expand_home(path: &str) -> String {
    if path == "~" || path.starts_with("~/") {
        if let Some(home) = std::env::var_os("HOME").or_else(|| std::env::var_os("USERPROFILE")) {
            if path == "~" {
                return home.to_string_lossy().into_owned();
            }
            return path.replacen('~', &home.to_string_lossy(), 1);
        }
    }
    path.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;
    use serial_test::serial;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    #[serial]
    fn test_direct_value_takes_priority() {
        std::env::set_var("VERITAS_TEST_SECRET", "from-env");
        let secret =
            resolve_secret(Some("direct"), None, Some("VERITAS_TEST_SECRET")).unwrap();
        assert_eq!(secret.expose_secret(), "direct");
        std::env::remove_var("VERITAS_TEST_SECRET");
    }

    #[test]
    #[serial]
    fn test_file_takes_priority_over_env() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "from-file").unwrap();
        std::env::set_var("VERITAS_TEST_SECRET", "from-env");

        let path = file.path().to_str().unwrap();
        let secret = resolve_secret(None, Some(path), Some("VERITAS_TEST_SECRET")).unwrap();
        assert_eq!(secret.expose_secret(), "from-file");
        std::env::remove_var("VERITAS_TEST_SECRET");
    }

    #[test]
    #[serial]
    fn test_env_var_fallback() {
        std::env::set_var("VERITAS_TEST_SECRET", "  from-env\n");
        let secret = resolve_secret(None, None, Some("VERITAS_TEST_SECRET")).unwrap();
        assert_eq!(secret.expose_secret(), "from-env");
        std::env::remove_var("VERITAS_TEST_SECRET");
    }

    #[test]
    fn test_no_source_error() {
        let result = resolve_secret(None, None, None);
        assert!(matches!(result, Err(SecretError::NoSourceProvided)));
    }

    #[test]
    fn test_file_not_found_error() {
        let result = resolve_secret(None, Some("/nonexistent/veritas/secret"), None);
        assert!(matches!(result, Err(SecretError::FileReadError { .. })));
    }

    #[test]
    #[serial]
    fn test_source_resolve_treats_unset_env_as_absent() {
        std::env::remove_var("VERITAS_TEST_UNSET");
        let source = SecretSource::from_env_var("VERITAS_TEST_UNSET");
        assert!(source.is_configured());
        assert!(source.resolve().unwrap().is_none());
    }

    #[test]
    fn test_source_resolve_propagates_file_errors() {
        let source = SecretSource {
            file: Some("/nonexistent/veritas/secret".to_string()),
            ..SecretSource::default()
        };
        assert!(source.resolve().is_err());
    }

    #[test]
    fn test_source_deserializes_camel_case_keys() {
        let source: SecretSource =
            serde_json::from_str(r#"{"apiKey": "abc", "apiKeyEnvVar": "KEY"}"#).unwrap();
        assert_eq!(source.value.as_deref(), Some("abc"));
        assert_eq!(source.env_var.as_deref(), Some("KEY"));
        assert!(source.file.is_none());
    }

    #[test]
    #[serial]
    fn test_expand_home() {
        let original = std::env::var_os("HOME");
        std::env::set_var("HOME", "/home/veritas");
        assert_eq!(expand_home("~/keys/bf"), "/home/veritas/keys/bf");
        assert_eq!(expand_home("~"), "/home/veritas");
        assert_eq!(expand_home("/abs/path"), "/abs/path");
        match original {
            Some(home) => std::env::set_var("HOME", home),
            None => std::env::remove_var("HOME"),
        }
    }
}
