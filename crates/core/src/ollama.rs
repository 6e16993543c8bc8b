use crate::embeddings::{TextEmbedder, DEFAULT_EMBEDDING_DIMENSIONS};
use crate::error::IngestError;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use url::Url;

pub const DEFAULT_EMBED_MODEL: &str = "nomic-embed-text";
pub const DEFAULT_GENERATE_MODEL: &str = "llama3";

/// Client for an Ollama server: `/api/embeddings` backs the `TextEmbedder`
/// seam and `/api/generate` produces markdown answers from grounded prompts.
pub struct OllamaClient {
    client: Arc<Client>,
    base_url: Url,
    embed_model: String,
    generate_model: String,
}

#[derive(Debug, Deserialize)]
struct EmbeddingsResponse {
    embedding: Vec<f32>,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
}

impl OllamaClient {
    pub fn new(base_url: &str) -> Result<Self, IngestError> {
        Ok(Self {
            client: Arc::new(Client::new()),
            base_url: Url::parse(base_url)?,
            embed_model: DEFAULT_EMBED_MODEL.to_string(),
            generate_model: DEFAULT_GENERATE_MODEL.to_string(),
        })
    }

    pub fn with_models(
        base_url: &str,
        embed_model: impl Into<String>,
        generate_model: impl Into<String>,
    ) -> Result<Self, IngestError> {
        Ok(Self {
            client: Arc::new(Client::new()),
            base_url: Url::parse(base_url)?,
            embed_model: embed_model.into(),
            generate_model: generate_model.into(),
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, IngestError> {
        Ok(self.base_url.join(path)?)
    }

    /// Sends a prompt to `/api/generate` (non-streaming) and returns the
    /// trimmed response text.
    pub async fn generate(&self, prompt: &str) -> Result<String, IngestError> {
        let response = self
            .client
            .post(self.endpoint("/api/generate")?)
            .json(&json!({
                "model": self.generate_model,
                "prompt": prompt,
                "stream": false,
            }))
            .send()
            .await?
            .error_for_status()?;

        let body: GenerateResponse = response.json().await?;
        Ok(body.response.trim().to_string())
    }
}

#[async_trait]
impl TextEmbedder for OllamaClient {
    fn dimensions(&self) -> usize {
        DEFAULT_EMBEDDING_DIMENSIONS
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, IngestError> {
        let response = self
            .client
            .post(self.endpoint("/api/embeddings")?)
            .json(&json!({
                "model": self.embed_model,
                "prompt": text,
            }))
            .send()
            .await?
            .error_for_status()?;

        let body: EmbeddingsResponse = response.json().await?;
        if body.embedding.is_empty() {
            return Err(IngestError::EmbeddingFailed(format!(
                "model {} returned an empty vector",
                self.embed_model
            )));
        }
        Ok(body.embedding)
    }
}

#[cfg(test)]
mod tests {
    use super::OllamaClient;

    #[test]
    fn rejects_unparseable_base_urls() {
        assert!(OllamaClient::new("not a url").is_err());
        assert!(OllamaClient::new("http://localhost:11434").is_ok());
    }
}
