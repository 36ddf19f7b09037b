//! Text-generation backend abstraction and implementations.
//!
//! Defines the [`GenerationBackend`] trait and concrete implementations:
//! - **[`DisabledBackend`]** — returns errors; used when generation is not
//!   configured.
//! - **[`GeminiBackend`]** — calls the Gemini `generateContent` API, with
//!   optional schema-constrained JSON output.
//!
//! # Error Classes
//!
//! Failures keep their class so callers can tell them apart:
//! - transport problems surface as [`GenerateError::Network`];
//! - non-success HTTP statuses as [`GenerateError::Api`];
//! - a well-formed response carrying no text as [`GenerateError::Empty`].
//!
//! This layer deliberately does not retry; retry-with-backoff is a
//! deployment policy, and the error classes above give such a layer what it
//! needs to decide retryability.

use anyhow::{bail, Result};
use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

use crate::blobstore::BlobHandle;
use crate::config::GenerationConfig;

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Input to a generation call: optional reference to a previously uploaded
/// blob, plus prompt text.
#[derive(Debug, Clone)]
pub struct GenerationInput {
    pub blob: Option<BlobHandle>,
    pub text: String,
}

impl GenerationInput {
    pub fn text_only(text: impl Into<String>) -> Self {
        Self {
            blob: None,
            text: text.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum GenerateError {
    #[error("network error: {0}")]
    Network(String),
    #[error("backend returned {status}: {message}")]
    Api { status: u16, message: String },
    #[error("backend returned no text")]
    Empty,
    #[error("generation backend is disabled")]
    Disabled,
}

/// Trait for text-generation backends.
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    /// Returns the model identifier (e.g. `"gemini-2.5-flash"`).
    fn model_name(&self) -> &str;

    /// Generate text for `input`. When `schema` is present the backend must
    /// constrain its output to that shape (schema-constrained decoding),
    /// not merely be asked to in prose.
    async fn generate(
        &self,
        input: GenerationInput,
        schema: Option<&serde_json::Value>,
    ) -> Result<String, GenerateError>;
}

// ============ Disabled Backend ============

/// A no-op backend that always returns errors.
///
/// Used when `generation.provider = "disabled"` in the configuration.
pub struct DisabledBackend;

#[async_trait]
impl GenerationBackend for DisabledBackend {
    fn model_name(&self) -> &str {
        "disabled"
    }

    async fn generate(
        &self,
        _input: GenerationInput,
        _schema: Option<&serde_json::Value>,
    ) -> Result<String, GenerateError> {
        Err(GenerateError::Disabled)
    }
}

// ============ Gemini Backend ============

/// Generation backend using the Gemini API.
///
/// Calls `POST /v1beta/models/{model}:generateContent`. The API key is read
/// from the environment variable named in the configuration
/// (`GEMINI_API_KEY` by default).
pub struct GeminiBackend {
    model: String,
    api_key: String,
    client: reqwest::Client,
    base_url: String,
}

impl GeminiBackend {
    /// Create a new Gemini backend from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if `model` is not set in config or the API key
    /// environment variable is missing.
    pub fn new(config: &GenerationConfig) -> Result<Self> {
        let model = config
            .model
            .clone()
            .ok_or_else(|| anyhow::anyhow!("generation.model required for Gemini backend"))?;

        let api_key = std::env::var(&config.api_key_env)
            .map_err(|_| anyhow::anyhow!("{} environment variable not set", config.api_key_env))?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            model,
            api_key,
            client,
            base_url: GEMINI_BASE_URL.to_string(),
        })
    }
}

#[async_trait]
impl GenerationBackend for GeminiBackend {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn generate(
        &self,
        input: GenerationInput,
        schema: Option<&serde_json::Value>,
    ) -> Result<String, GenerateError> {
        let mut parts = Vec::new();
        if let Some(blob) = &input.blob {
            parts.push(serde_json::json!({
                "file_data": {
                    "file_uri": blob.uri,
                    "mime_type": blob.mime_type,
                }
            }));
        }
        parts.push(serde_json::json!({ "text": input.text }));

        let mut body = serde_json::json!({
            "contents": [{ "role": "user", "parts": parts }],
        });
        if let Some(schema) = schema {
            body["generationConfig"] = serde_json::json!({
                "response_mime_type": "application/json",
                "response_schema": schema,
            });
        }

        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        );

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| GenerateError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(GenerateError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| GenerateError::Network(e.to_string()))?;

        extract_candidate_text(&json).ok_or(GenerateError::Empty)
    }
}

/// Pull the first candidate's concatenated text parts out of a
/// `generateContent` response.
fn extract_candidate_text(json: &serde_json::Value) -> Option<String> {
    let parts = json
        .get("candidates")?
        .as_array()?
        .first()?
        .get("content")?
        .get("parts")?
        .as_array()?;

    let text = parts
        .iter()
        .filter_map(|part| part.get("text").and_then(|t| t.as_str()))
        .collect::<String>();

    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

/// Create the appropriate [`GenerationBackend`] based on configuration.
pub fn create_backend(config: &GenerationConfig) -> Result<Box<dyn GenerationBackend>> {
    match config.provider.as_str() {
        "disabled" => Ok(Box::new(DisabledBackend)),
        "gemini" => Ok(Box::new(GeminiBackend::new(config)?)),
        other => bail!("Unknown generation provider: {}", other),
    }
}
