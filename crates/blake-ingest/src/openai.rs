//! A [`LanguageModel`] backed by an OpenAI-compatible HTTP API.
//!
//! Uses `POST {base_url}/chat/completions` with a JSON-object response
//! format for extraction and `POST {base_url}/embeddings` for vectors.

use async_trait::async_trait;
use blake_core::extraction::{CategoryHint, ExtractionResult, LanguageModel};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::{Error, Result, prompt};

/// Connection settings for the language-model service.
#[derive(Debug, Clone)]
pub struct OpenAiConfig {
  pub api_key:         String,
  pub base_url:        String,
  pub model:           String,
  pub embedding_model: String,
}

/// Cheap to clone — the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Clone)]
pub struct OpenAiClient {
  client: Client,
  config: OpenAiConfig,
}

#[derive(Deserialize)]
struct ChatResponse {
  choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
  message: ChatMessage,
}

#[derive(Serialize, Deserialize)]
struct ChatMessage {
  role:    String,
  #[serde(default)]
  content: Option<String>,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
  data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
  embedding: Vec<f32>,
}

impl OpenAiClient {
  pub fn new(config: OpenAiConfig) -> Result<Self> {
    let client = Client::builder().build()?;
    Ok(Self { client, config })
  }

  fn url(&self, path: &str) -> String {
    format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
  }

  async fn post<T: for<'de> Deserialize<'de>>(
    &self,
    path: &str,
    body: serde_json::Value,
  ) -> Result<T> {
    let resp = self
      .client
      .post(self.url(path))
      .bearer_auth(&self.config.api_key)
      .json(&body)
      .send()
      .await?;

    let status = resp.status();
    if !status.is_success() {
      let body = resp.text().await.unwrap_or_default();
      tracing::warn!(path, %status, "language model request failed");
      return Err(Error::Upstream { status: status.as_u16(), body });
    }
    Ok(resp.json().await?)
  }

  /// Ask the model for the entities and relations in `text`.
  pub async fn extract(
    &self,
    text: &str,
    categories: &[CategoryHint],
  ) -> Result<ExtractionResult> {
    let messages = [
      ChatMessage {
        role:    "system".into(),
        content: Some(prompt::system_prompt(categories)),
      },
      ChatMessage { role: "user".into(), content: Some(text.to_owned()) },
    ];
    let resp: ChatResponse = self
      .post(
        "/chat/completions",
        json!({
          "model": self.config.model,
          "messages": messages,
          "response_format": { "type": "json_object" },
          "temperature": 0.2,
        }),
      )
      .await?;

    let content = resp
      .choices
      .into_iter()
      .next()
      .and_then(|c| c.message.content)
      .ok_or_else(|| Error::MalformedResponse("no message content".into()))?;

    let result = prompt::parse_extraction(&content)?;
    tracing::info!(
      entities = result.entities.len(),
      relations = result.relations.len(),
      "entities extracted"
    );
    Ok(result)
  }

  /// Embed `text` with the configured embedding model.
  pub async fn embedding(&self, text: &str) -> Result<Vec<f32>> {
    let resp: EmbeddingResponse = self
      .post(
        "/embeddings",
        json!({ "model": self.config.embedding_model, "input": text }),
      )
      .await?;

    resp
      .data
      .into_iter()
      .next()
      .map(|d| d.embedding)
      .filter(|v| !v.is_empty())
      .ok_or_else(|| Error::MalformedResponse("no embedding returned".into()))
  }
}

#[async_trait]
impl LanguageModel for OpenAiClient {
  async fn extract_entities(
    &self,
    text: &str,
    categories: &[CategoryHint],
  ) -> Result<ExtractionResult, Box<dyn std::error::Error + Send + Sync>> {
    Ok(self.extract(text, categories).await?)
  }

  async fn embed(
    &self,
    text: &str,
  ) -> Result<Vec<f32>, Box<dyn std::error::Error + Send + Sync>> {
    Ok(self.embedding(text).await?)
  }
}
