//! Client for OpenAI-compatible chat-completion endpoints.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::config::InferenceConfig;
use crate::error::ConfigError;

/// Maximum length of an error body echoed into diagnostics.
const MAX_ERROR_BODY_LENGTH: usize = 200;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Errors from the inference backend.
#[derive(Debug, Error)]
pub enum InferenceError {
    #[error("Inference request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Inference request failed: {0}")]
    Transport(String),

    #[error("Inference backend returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Failed to parse inference response: {0}")]
    ResponseParse(String),

    #[error("Inference backend returned no content")]
    EmptyResponse,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// A chat-completion backend.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Sends one conversation and returns the assistant's reply text.
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String, InferenceError>;
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// HTTP client for `{base_url}/chat/completions`.
pub struct OpenAiCompatClient {
    client: Client,
    endpoint: String,
    model: String,
    api_key: Option<SecretString>,
    timeout: Duration,
}

impl OpenAiCompatClient {
    pub fn new(
        base_url: &str,
        model: &str,
        api_key: Option<SecretString>,
        timeout: Duration,
    ) -> Result<Self, ConfigError> {
        let client = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(timeout)
            .build()
            .map_err(|e| ConfigError::HttpClient(e.to_string()))?;

        Ok(Self {
            client,
            endpoint: format!("{}/chat/completions", base_url.trim_end_matches('/')),
            model: wire_model_name(model).to_string(),
            api_key,
            timeout,
        })
    }

    pub fn from_config(config: &InferenceConfig) -> Result<Self, ConfigError> {
        let api_key = config
            .credential
            .resolve()
            .map_err(|source| ConfigError::Secret {
                field: "inference",
                source,
            })?;

        Self::new(
            &config.base_url,
            &config.model,
            api_key,
            Duration::from_secs(config.timeout_secs),
        )
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

/// Strips a `provider/` routing prefix (`openai/gpt-4` -> `gpt-4`) that
/// OpenAI-compatible servers do not understand.
fn wire_model_name(model: &str) -> &str {
    model.strip_prefix("openai/").unwrap_or(model)
}

fn truncate_body(body: &str) -> String {
    if body.len() > MAX_ERROR_BODY_LENGTH {
        let mut end = MAX_ERROR_BODY_LENGTH;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}... (truncated)", &body[..end])
    } else {
        body.to_string()
    }
}

#[async_trait]
impl ChatBackend for OpenAiCompatClient {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String, InferenceError> {
        debug!(model = %self.model, messages = messages.len(), "Sending chat completion");

        let mut request = self.client.post(&self.endpoint).json(&ChatRequest {
            model: &self.model,
            messages,
        });
        if let Some(ref key) = self.api_key {
            request = request.bearer_auth(key.expose_secret());
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                InferenceError::Timeout(self.timeout)
            } else {
                InferenceError::Transport(e.to_string())
            }
        })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            if e.is_timeout() {
                InferenceError::Timeout(self.timeout)
            } else {
                InferenceError::Transport(e.to_string())
            }
        })?;

        if !status.is_success() {
            return Err(InferenceError::Status {
                status: status.as_u16(),
                body: truncate_body(&body),
            });
        }

        let parsed: ChatResponse =
            serde_json::from_str(&body).map_err(|e| InferenceError::ResponseParse(e.to_string()))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|content| content.trim().to_string())
            .filter(|content| !content.is_empty())
            .ok_or(InferenceError::EmptyResponse)
    }
}
