//! OpenAI-compatible implementation of the model traits.
//!
//! A reference implementation over the `/chat/completions` and
//! `/embeddings` endpoints. The base URL is configurable, so any
//! OpenAI-compatible gateway works (the reference deployment pointed it
//! at a Gemini endpoint).
//!
//! # Example
//!
//! ```rust,ignore
//! use fieldwise::ai::OpenAIModel;
//!
//! let model = OpenAIModel::new("sk-...").with_model("gpt-4o-mini");
//! let walker = SchemaWalker::new(Arc::new(model), grounding, config);
//! ```

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::error::{ExtractionError, Result};
use crate::traits::model::{Embedder, LanguageModel, SamplingConfig};

/// OpenAI-compatible chat + embeddings client.
#[derive(Clone)]
pub struct OpenAIModel {
    client: Client,
    api_key: SecretString,
    model: String,
    embedding_model: String,
    base_url: String,
}

impl OpenAIModel {
    /// Create a new client with the given API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: SecretString::from(api_key.into()),
            model: "gpt-4o-mini".to_string(),
            embedding_model: "text-embedding-3-small".to_string(),
            base_url: "https://api.openai.com/v1".to_string(),
        }
    }

    /// Create from the `OPENAI_API_KEY` environment variable.
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| ExtractionError::config("OPENAI_API_KEY not set"))?;
        Ok(Self::new(api_key))
    }

    /// Set the chat model.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set the embedding model.
    pub fn with_embedding_model(mut self, model: impl Into<String>) -> Self {
        self.embedding_model = model.into();
        self
    }

    /// Set a custom base URL (for compatible gateways and proxies).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// The current chat model name.
    pub fn model(&self) -> &str {
        &self.model
    }
}

impl std::fmt::Debug for OpenAIModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAIModel")
            .field("api_key", &"[REDACTED]")
            .field("model", &self.model)
            .field("embedding_model", &self.embedding_model)
            .field("base_url", &self.base_url)
            .finish()
    }
}

#[async_trait]
impl LanguageModel for OpenAIModel {
    async fn complete(
        &self,
        system: &str,
        user: &str,
        sampling: &SamplingConfig,
    ) -> Result<String> {
        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: system.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: user.to_string(),
                },
            ],
            temperature: sampling.temperature,
            max_tokens: sampling.max_tokens,
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header(
                "Authorization",
                format!("Bearer {}", self.api_key.expose_secret()),
            )
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| ExtractionError::model(e.to_string()))?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(ExtractionError::model(format!(
                "chat completion error: {error_text}"
            )));
        }

        let chat_response: ChatResponse = response
            .json()
            .await
            .map_err(|e| ExtractionError::model(e.to_string()))?;

        chat_response
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| ExtractionError::model("empty completion response"))
    }
}

#[async_trait]
impl Embedder for OpenAIModel {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let request = EmbeddingRequest {
            model: self.embedding_model.clone(),
            input: text.to_string(),
        };

        let response = self
            .client
            .post(format!("{}/embeddings", self.base_url))
            .header(
                "Authorization",
                format!("Bearer {}", self.api_key.expose_secret()),
            )
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| ExtractionError::Embedding(e.to_string()))?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(ExtractionError::Embedding(format!(
                "embedding error: {error_text}"
            )));
        }

        let embed_response: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| ExtractionError::Embedding(e.to_string()))?;

        embed_response
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| ExtractionError::Embedding("empty embedding response".to_string()))
    }
}

// Request/Response types

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    content: String,
}

#[derive(Serialize)]
struct EmbeddingRequest {
    model: String,
    input: String,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let model = OpenAIModel::new("sk-test")
            .with_model("gpt-4o")
            .with_embedding_model("text-embedding-3-large")
            .with_base_url("https://gateway.example.com/v1beta/openai");

        assert_eq!(model.model(), "gpt-4o");
        assert_eq!(model.base_url, "https://gateway.example.com/v1beta/openai");
    }

    #[test]
    fn test_api_key_not_in_debug() {
        let model = OpenAIModel::new("sk-super-secret");
        let debug = format!("{model:?}");
        assert!(!debug.contains("sk-super-secret"));
        assert!(debug.contains("[REDACTED]"));
    }
}
