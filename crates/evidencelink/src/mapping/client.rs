//! Clients for the external text-analysis service.
//!
//! [`Analyzer`] is the seam between mapping and the network. The
//! [`HttpAnalyzer`] speaks a messages-style JSON API: one request, one
//! response, no retries and no streaming.

use std::fmt;

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::debug;

use super::prompt::AnalysisPrompt;
use crate::config::AnalysisConfig;
use crate::error::{Error, Result};

/// Sends a prompt to a text-analysis service and returns its text reply.
#[async_trait]
pub trait Analyzer: Send + Sync {
    /// Name of this analyzer (for logging).
    fn name(&self) -> &'static str;

    /// Run the analysis and return the raw response text.
    ///
    /// # Errors
    ///
    /// Returns an error if the call fails or the reply carries no text.
    async fn analyze(&self, prompt: &AnalysisPrompt) -> Result<String>;
}

/// Analyzer backed by an HTTP messages endpoint.
pub struct HttpAnalyzer {
    http_client: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: String,
    api_version: String,
    max_tokens: u32,
}

impl fmt::Debug for HttpAnalyzer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpAnalyzer")
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .field("api_key", &"[REDACTED]")
            .field("max_tokens", &self.max_tokens)
            .finish_non_exhaustive()
    }
}

impl HttpAnalyzer {
    /// Build an analyzer from configuration, reading the API key from the
    /// configured environment variable.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingApiKey`] if the variable is unset or empty,
    /// or an error if the HTTP client cannot be built.
    pub fn from_config(config: &AnalysisConfig) -> Result<Self> {
        let api_key = std::env::var(&config.api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| Error::MissingApiKey {
                env_var: config.api_key_env.clone(),
            })?;
        Self::with_api_key(config, api_key)
    }

    /// Build an analyzer with an explicit API key.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn with_api_key(config: &AnalysisConfig, api_key: impl Into<String>) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .user_agent(concat!("evidencelink/", env!("CARGO_PKG_VERSION")))
            .timeout(config.timeout())
            .build()?;

        Ok(Self::with_client(config, api_key, http_client))
    }

    /// Build an analyzer around an existing HTTP client.
    #[must_use]
    pub fn with_client(
        config: &AnalysisConfig,
        api_key: impl Into<String>,
        http_client: reqwest::Client,
    ) -> Self {
        Self {
            http_client,
            endpoint: config.endpoint.clone(),
            model: config.model.clone(),
            api_key: api_key.into(),
            api_version: config.api_version.clone(),
            max_tokens: config.max_tokens,
        }
    }

    /// The JSON body sent for a prompt.
    #[must_use]
    pub fn request_body(&self, prompt: &AnalysisPrompt) -> Value {
        json!({
            "model": self.model,
            "max_tokens": self.max_tokens,
            "system": prompt.system,
            "messages": [
                { "role": "user", "content": prompt.user }
            ]
        })
    }
}

#[async_trait]
impl Analyzer for HttpAnalyzer {
    fn name(&self) -> &'static str {
        "http"
    }

    async fn analyze(&self, prompt: &AnalysisPrompt) -> Result<String> {
        debug!(endpoint = %self.endpoint, model = %self.model, "Sending analysis request");

        let response = self
            .http_client
            .post(&self.endpoint)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", &self.api_version)
            .json(&self.request_body(prompt))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::AnalysisApi {
                status: status.as_u16(),
                message: response.text().await.unwrap_or_default(),
            });
        }

        let body: Value = response.json().await?;
        extract_text(&body)
    }
}

/// Concatenate the text blocks of a messages response.
///
/// # Errors
///
/// Returns an analysis error if the body has no `content` array or no text
/// blocks in it.
pub fn extract_text(body: &Value) -> Result<String> {
    let blocks = body
        .get("content")
        .and_then(Value::as_array)
        .ok_or_else(|| Error::analysis("response has no content array"))?;

    let texts: Vec<&str> = blocks
        .iter()
        .filter(|block| block.get("type").and_then(Value::as_str) == Some("text"))
        .filter_map(|block| block.get("text").and_then(Value::as_str))
        .collect();

    if texts.is_empty() {
        return Err(Error::analysis("response contained no text"));
    }
    Ok(texts.join(""))
}
