//! Generation backend client (Ollama `/api/generate`, non-streaming).

use std::time::Duration;

use async_trait::async_trait;
use clauseai_core::text::raw_preview;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum GenerationError {
    #[error("LLM request timed out after {0}s")]
    Timeout(u64),
    #[error("LLM request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("LLM server returned {status}: {body}")]
    Server { status: u16, body: String },
    #[error("LLM response is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Prompt in, raw model text out. One attempt per call.
#[async_trait]
pub trait Generator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError>;

    /// Model identifier, for logs and `/health`.
    fn model(&self) -> &str;
}

/// Client for an Ollama-compatible backend.
pub struct OllamaClient {
    client: reqwest::Client,
    base_url: String,
    model: String,
    timeout: Duration,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
}

impl OllamaClient {
    /// `base_url` like `http://localhost:11434`; a trailing slash is ignored.
    pub fn new(
        base_url: &str,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, GenerationError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.into(),
            timeout,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn transport(&self, err: reqwest::Error) -> GenerationError {
        if err.is_timeout() {
            GenerationError::Timeout(self.timeout.as_secs())
        } else {
            GenerationError::Http(err)
        }
    }
}

#[async_trait]
impl Generator for OllamaClient {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        let url = format!("{}/api/generate", self.base_url);
        let body = GenerateRequest {
            model: &self.model,
            prompt,
            stream: false,
        };

        info!(url = %url, model = %self.model, prompt_chars = prompt.len(), "calling LLM");
        let resp = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.transport(e))?;

        let status = resp.status();
        let text = resp.text().await.map_err(|e| self.transport(e))?;
        if !status.is_success() {
            return Err(GenerationError::Server {
                status: status.as_u16(),
                body: raw_preview(&text).to_string(),
            });
        }

        let parsed: GenerateResponse = serde_json::from_str(&text)?;
        debug!(raw = raw_preview(&parsed.response), "LLM response");
        Ok(parsed.response)
    }

    fn model(&self) -> &str {
        &self.model
    }
}
