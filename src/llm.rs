//! Client for the generation/embedding model service (Ollama).
//!
//! The service is reachable over HTTP and is treated as opaque: it takes a
//! model name, a prompt or input batch, a temperature, and a timeout, and
//! returns text or vectors. Timeouts are distinguishable from other
//! failures ([`ChatError::Timeout`]) because the query pipeline degrades
//! differently on them.
//!
//! [`LanguageModel`] is the seam tests use to substitute a deterministic
//! fake for the network service.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::ModelsConfig;
use crate::error::{ChatError, Result};

/// A generation model plus its fixed sampling settings, constructed once at
/// startup and threaded explicitly through each query.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelHandle {
    pub name: String,
    pub temperature: f32,
}

#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Generate a completion for `prompt`. Blocks up to the configured
    /// request timeout; there is no other cancellation mechanism.
    async fn generate(&self, model: &ModelHandle, prompt: &str) -> Result<String>;

    /// Embed a batch of texts, one vector per input, in input order.
    async fn embed(&self, model: &str, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}

pub struct OllamaClient {
    client: Client,
    base_url: String,
}

impl OllamaClient {
    /// Build a client with the request timeout applied uniformly to
    /// generation and embedding calls.
    pub fn new(config: &ModelsConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ChatError::Internal(format!("failed to build http client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
        })
    }
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Serialize)]
struct GenerateOptions {
    temperature: f32,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

#[async_trait]
impl LanguageModel for OllamaClient {
    async fn generate(&self, model: &ModelHandle, prompt: &str) -> Result<String> {
        let url = format!("{}/api/generate", self.base_url);
        let response = self
            .client
            .post(url)
            .json(&GenerateRequest {
                model: &model.name,
                prompt,
                stream: false,
                options: GenerateOptions {
                    temperature: model.temperature,
                },
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ChatError::Internal(format!(
                "ollama /api/generate returned {status}: {}",
                normalize_err_body(&body)
            )));
        }

        let parsed = response.json::<GenerateResponse>().await.map_err(|e| {
            ChatError::Internal(format!("failed to decode ollama generate response: {e}"))
        })?;

        Ok(parsed.response)
    }

    async fn embed(&self, model: &str, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let url = format!("{}/api/embed", self.base_url);
        let response = self
            .client
            .post(url)
            .json(&EmbedRequest {
                model,
                input: texts,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ChatError::Internal(format!(
                "ollama /api/embed returned {status}: {}",
                normalize_err_body(&body)
            )));
        }

        let parsed = response.json::<EmbedResponse>().await.map_err(|e| {
            ChatError::Internal(format!("failed to decode ollama embed response: {e}"))
        })?;

        if parsed.embeddings.len() != texts.len() {
            return Err(ChatError::Internal(format!(
                "ollama returned {} embeddings for {} inputs",
                parsed.embeddings.len(),
                texts.len()
            )));
        }

        Ok(parsed.embeddings)
    }
}

fn normalize_err_body(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return "<empty body>".to_string();
    }

    if let Ok(json) = serde_json::from_str::<serde_json::Value>(trimmed) {
        if let Some(err) = json.get("error").and_then(|v| v.as_str()) {
            return err.to_string();
        }
    }

    trimmed.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_err_body_extracts_json_error() {
        let body = r#"{"error": "model not found"}"#;
        assert_eq!(normalize_err_body(body), "model not found");
    }

    #[test]
    fn test_normalize_err_body_passes_plain_text() {
        assert_eq!(normalize_err_body("  boom  "), "boom");
        assert_eq!(normalize_err_body(""), "<empty body>");
    }

    #[test]
    fn test_trailing_slash_stripped_from_base_url() {
        let config = ModelsConfig {
            url: "http://localhost:11434/".to_string(),
            ..ModelsConfig::default()
        };
        let client = OllamaClient::new(&config).unwrap();
        assert_eq!(client.base_url, "http://localhost:11434");
    }
}
