//! Jina reranking client.
//!
//! `POST {url}` with `{model, query, documents, top_n}`; the response lists
//! `{index, relevance_score}` pairs, best first, where `index` refers back
//! into the submitted documents.

use anyhow::{anyhow, bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::config::{EmbeddingConfig, RerankConfig};
use crate::http;

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct RerankHit {
    pub index: usize,
    pub relevance_score: f32,
}

pub struct JinaReranker {
    client: reqwest::Client,
    api_key: String,
    url: String,
    model: String,
    max_retries: u32,
}

impl JinaReranker {
    /// Build a client. Shares the embedding section's timeout and retry
    /// settings and reads the key from `JINA_API_KEY`.
    pub fn new(config: &RerankConfig, embedding: &EmbeddingConfig) -> Result<Self> {
        let api_key = std::env::var("JINA_API_KEY")
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| anyhow!("JINA_API_KEY not set"))?;
        Ok(Self {
            client: http::client(embedding.timeout_secs)?,
            api_key,
            url: config.url.clone(),
            model: config.model.clone(),
            max_retries: embedding.max_retries,
        })
    }

    /// Score `documents` against `query` and return the best `top_n`.
    pub async fn rerank(
        &self,
        query: &str,
        documents: &[String],
        top_n: usize,
    ) -> Result<Vec<RerankHit>> {
        if documents.is_empty() {
            return Ok(Vec::new());
        }
        let body = RerankRequest {
            model: &self.model,
            query,
            documents,
            top_n: top_n.min(documents.len()),
        };

        let response = http::send_with_retry("Jina rerank", self.max_retries, || {
            self.client
                .post(&self.url)
                .bearer_auth(&self.api_key)
                .json(&body)
        })
        .await?;
        let response = http::error_for_status("Jina rerank", response).await?;
        let payload: RerankResponse = response
            .json()
            .await
            .context("failed to parse Jina rerank response")?;
        payload.into_hits(documents.len())
    }
}

#[derive(Serialize)]
struct RerankRequest<'a> {
    model: &'a str,
    query: &'a str,
    documents: &'a [String],
    top_n: usize,
}

#[derive(Debug, Deserialize)]
struct RerankResponse {
    #[serde(default)]
    results: Vec<RerankHit>,
}

impl RerankResponse {
    fn into_hits(self, document_count: usize) -> Result<Vec<RerankHit>> {
        if let Some(bad) = self.results.iter().find(|h| h.index >= document_count) {
            bail!(
                "rerank result index {} out of range for {} documents",
                bad.index,
                document_count
            );
        }
        let mut hits = self.results;
        hits.sort_by(|a, b| b.relevance_score.total_cmp(&a.relevance_score));
        Ok(hits)
    }
}
