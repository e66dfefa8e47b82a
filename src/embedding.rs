//! Embedding provider abstraction and implementations.
//!
//! Defines the [`Embedder`] trait and two implementations:
//! - **[`DisabledEmbedder`]** returns errors; used when `provider = "disabled"`.
//! - **[`JinaEmbedder`]** calls the Jina embeddings API with retry and backoff
//!   (see [`crate::http`]).
//!
//! Passages (person records) and queries are embedded with different Jina
//! tasks, `retrieval.passage` and `retrieval.query` by default, so the two
//! sides of a search land in compatible spaces.
//!
//! Use [`create_embedder`] to pick the implementation from configuration.

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::config::EmbeddingConfig;
use crate::http;

/// Source of embedding vectors.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Returns the model identifier (e.g. `"jina-embeddings-v3"`).
    fn model_name(&self) -> &str;
    /// Returns the embedding vector dimensionality.
    fn dims(&self) -> usize;
    /// Embed documents for storage. One vector per input, in input order.
    async fn embed_passages(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
    /// Embed a search query.
    async fn embed_query(&self, text: &str) -> Result<Vec<f32>>;
}

/// Placeholder used when embeddings are turned off.
pub struct DisabledEmbedder {
    dims: usize,
}

#[async_trait]
impl Embedder for DisabledEmbedder {
    fn model_name(&self) -> &str {
        "disabled"
    }

    fn dims(&self) -> usize {
        self.dims
    }

    async fn embed_passages(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>> {
        bail!("Embeddings are disabled. Set [embedding] provider = \"jina\" in config.")
    }

    async fn embed_query(&self, _text: &str) -> Result<Vec<f32>> {
        bail!("Embeddings are disabled. Set [embedding] provider = \"jina\" in config.")
    }
}

/// Client for `POST https://api.jina.ai/v1/embeddings`.
pub struct JinaEmbedder {
    client: reqwest::Client,
    api_key: String,
    url: String,
    model: String,
    dims: usize,
    passage_task: String,
    query_task: String,
    max_retries: u32,
}

impl JinaEmbedder {
    /// Build a client. Reads the API key from `JINA_API_KEY`.
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let api_key = std::env::var("JINA_API_KEY")
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| anyhow!("JINA_API_KEY not set"))?;
        Ok(Self {
            client: http::client(config.timeout_secs)?,
            api_key,
            url: config.url.clone(),
            model: config.model.clone(),
            dims: config.dims,
            passage_task: config.passage_task.clone(),
            query_task: config.query_task.clone(),
            max_retries: config.max_retries,
        })
    }

    async fn embed(&self, task: &str, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let body = EmbeddingRequest {
            model: &self.model,
            task,
            truncate: true,
            dimensions: self.dims,
            input: texts.iter().map(|t| EmbeddingInput { text: t }).collect(),
        };

        let response = http::send_with_retry("Jina", self.max_retries, || {
            self.client
                .post(&self.url)
                .bearer_auth(&self.api_key)
                .json(&body)
        })
        .await?;
        let response = http::error_for_status("Jina", response).await?;
        let payload: EmbeddingResponse = response
            .json()
            .await
            .context("failed to parse Jina embeddings response")?;
        payload.into_embeddings(texts.len(), self.dims)
    }
}

#[async_trait]
impl Embedder for JinaEmbedder {
    fn model_name(&self) -> &str {
        &self.model
    }

    fn dims(&self) -> usize {
        self.dims
    }

    async fn embed_passages(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        self.embed(&self.passage_task, texts).await
    }

    async fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        let mut vectors = self.embed(&self.query_task, &[text.to_string()]).await?;
        vectors
            .pop()
            .ok_or_else(|| anyhow!("Jina returned no embedding for the query"))
    }
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    task: &'a str,
    truncate: bool,
    dimensions: usize,
    input: Vec<EmbeddingInput<'a>>,
}

#[derive(Serialize)]
struct EmbeddingInput<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    #[serde(default)]
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    #[serde(default)]
    index: Option<usize>,
}

impl EmbeddingResponse {
    /// Vectors in input order, checked against the expected count and width.
    fn into_embeddings(self, expected_len: usize, dims: usize) -> Result<Vec<Vec<f32>>> {
        if self.data.len() != expected_len {
            bail!(
                "Jina returned {} embeddings for {} inputs",
                self.data.len(),
                expected_len
            );
        }
        let mut data = self.data;
        data.sort_by_key(|d| d.index.unwrap_or(0));
        if let Some(bad) = data.iter().find(|d| d.embedding.len() != dims) {
            bail!(
                "Jina returned a {}-dimensional embedding, expected {}",
                bad.embedding.len(),
                dims
            );
        }
        Ok(data.into_iter().map(|d| d.embedding).collect())
    }
}

/// Create the embedder named by `config.provider`.
pub fn create_embedder(config: &EmbeddingConfig) -> Result<Arc<dyn Embedder>> {
    match config.provider.as_str() {
        "disabled" => Ok(Arc::new(DisabledEmbedder { dims: config.dims })),
        "jina" => Ok(Arc::new(JinaEmbedder::new(config)?)),
        other => bail!("Unknown embedding provider: {}", other),
    }
}
