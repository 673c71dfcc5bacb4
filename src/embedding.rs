//! Embedding provider abstraction and implementations.
//!
//! - **[`OpenAiEmbedder`]**: calls an OpenAI-compatible `POST /embeddings`
//!   endpoint in batches.
//! - **[`DisabledEmbedder`]**: always errors; used when embeddings are
//!   turned off in config.
//!
//! Embedding calls are not retried here. A failed call fails the index build
//! (or query) it belongs to, and the caller decides how to degrade.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

use crate::config::{EmbeddingConfig, ModelConfig};

/// Trait for embedding providers.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Returns the model identifier (e.g. `"text-embedding-ada-002"`).
    fn model_name(&self) -> &str;

    /// Embed a batch of texts, returning one vector per input in order.
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Embed a single query text.
    async fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        let results = self.embed(&[text.to_string()]).await?;
        results
            .into_iter()
            .next()
            .ok_or_else(|| anyhow::anyhow!("Empty embedding response"))
    }
}

// ============ Disabled Provider ============

/// An embedder that refuses every request.
pub struct DisabledEmbedder;

#[async_trait]
impl Embedder for DisabledEmbedder {
    fn model_name(&self) -> &str {
        "disabled"
    }

    async fn embed(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>> {
        bail!("Embedding provider is disabled")
    }
}

// ============ OpenAI-compatible Provider ============

/// Embedder backed by an OpenAI-compatible embeddings API.
pub struct OpenAiEmbedder {
    client: reqwest::Client,
    api_base: String,
    api_key: Option<String>,
    model: String,
    batch_size: usize,
}

impl OpenAiEmbedder {
    pub fn new(model_config: &ModelConfig, config: &EmbeddingConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to build embedding HTTP client")?;

        Ok(Self {
            client,
            api_base: model_config.api_base.trim_end_matches('/').to_string(),
            api_key: model_config.api_key.clone(),
            model: config.model.clone(),
            batch_size: config.batch_size.max(1),
        })
    }

    async fn embed_batch(&self, batch: &[String]) -> Result<Vec<Vec<f32>>> {
        let body = serde_json::json!({
            "model": self.model,
            "input": batch,
        });

        let mut request = self
            .client
            .post(format!("{}/embeddings", self.api_base))
            .json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .context("Embedding request failed")?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            bail!("Embedding API error {}: {}", status, body_text);
        }

        let parsed: EmbeddingResponse = response
            .json()
            .await
            .context("Invalid embedding response")?;
        parse_embedding_response(parsed, batch.len())
    }
}

#[async_trait]
impl Embedder for OpenAiEmbedder {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut vectors = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.batch_size) {
            vectors.extend(self.embed_batch(batch).await?);
        }
        Ok(vectors)
    }
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingItem>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingItem {
    #[serde(default)]
    index: Option<usize>,
    embedding: Vec<f32>,
}

/// Order vectors by their `index` field and check the count.
fn parse_embedding_response(
    mut response: EmbeddingResponse,
    expected: usize,
) -> Result<Vec<Vec<f32>>> {
    if response.data.len() != expected {
        bail!(
            "Embedding API returned {} vectors for {} inputs",
            response.data.len(),
            expected
        );
    }
    if response.data.iter().all(|item| item.index.is_some()) {
        response.data.sort_by_key(|item| item.index);
    }
    Ok(response.data.into_iter().map(|item| item.embedding).collect())
}

/// Create the configured [`Embedder`].
///
/// | Config Value | Provider |
/// |-------------|----------|
/// | `"disabled"` | [`DisabledEmbedder`] |
/// | `"openai"` | [`OpenAiEmbedder`] |
pub fn create_embedder(
    model_config: &ModelConfig,
    config: &EmbeddingConfig,
) -> Result<Box<dyn Embedder>> {
    match config.provider.as_str() {
        "disabled" => Ok(Box::new(DisabledEmbedder)),
        "openai" => Ok(Box::new(OpenAiEmbedder::new(model_config, config)?)),
        other => bail!("Unknown embedding provider: {}", other),
    }
}

/// Compute cosine similarity between two embedding vectors.
///
/// Returns a value in `[-1.0, 1.0]`, or `0.0` for empty vectors or vectors
/// of different lengths.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;

    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < f32::EPSILON {
        return 0.0;
    }

    dot / denom
}
