//! Qdrant REST backend.
//!
//! Collections are created for cosine distance with vectors stored on disk,
//! int8 scalar quantization kept in RAM, and HNSW graph construction off
//! (`m = 0`) for the bulk load. [`VectorStore::set_index_phase`] patches
//! `hnsw_config.m` to switch it back on. The API key, if any, comes from
//! `QDRANT_API_KEY`.

use anyhow::{Context, Result};
use async_trait::async_trait;
use lead_ingest_core::PersonRecord;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use super::{IndexPhase, Point, ScoredPoint, VectorStore};
use crate::config::VectorStoreConfig;
use crate::http;

const MAX_RETRIES: u32 = 3;

pub struct QdrantStore {
    client: reqwest::Client,
    base_url: String,
    collection: String,
    on_disk: bool,
    quantization: bool,
}

impl QdrantStore {
    pub fn new(config: &VectorStoreConfig) -> Result<Self> {
        anyhow::ensure!(
            config.url.starts_with("http://") || config.url.starts_with("https://"),
            "vector_store.url must be an http(s) URL"
        );
        let mut headers = HeaderMap::new();
        if let Some(key) = std::env::var("QDRANT_API_KEY")
            .ok()
            .filter(|k| !k.trim().is_empty())
        {
            headers.insert(
                "api-key",
                HeaderValue::from_str(key.trim()).context("invalid QDRANT_API_KEY")?,
            );
        }
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .default_headers(headers)
            .build()
            .context("failed to build Qdrant HTTP client")?;
        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
            collection: config.collection.clone(),
            on_disk: config.on_disk,
            quantization: config.quantization,
        })
    }

    fn collection_url(&self) -> String {
        format!("{}/collections/{}", self.base_url, self.collection)
    }

    fn create_body(&self, dims: usize) -> serde_json::Value {
        let mut body = json!({
            "vectors": {
                "size": dims,
                "distance": "Cosine",
                "on_disk": self.on_disk,
            },
            "hnsw_config": { "m": IndexPhase::BulkLoad.hnsw_m() },
        });
        if self.quantization {
            body["quantization_config"] = json!({
                "scalar": { "type": "int8", "always_ram": true }
            });
        }
        body
    }
}

#[async_trait]
impl VectorStore for QdrantStore {
    async fn ensure_collection(&self, dims: usize) -> Result<bool> {
        let url = self.collection_url();
        let response =
            http::send_with_retry("Qdrant", MAX_RETRIES, || self.client.get(&url)).await?;
        if response.status() != StatusCode::NOT_FOUND {
            http::error_for_status("Qdrant", response).await?;
            tracing::debug!(collection = %self.collection, "collection exists");
            return Ok(false);
        }

        let body = self.create_body(dims);
        let response =
            http::send_with_retry("Qdrant", MAX_RETRIES, || self.client.put(&url).json(&body))
                .await?;
        http::error_for_status("Qdrant", response)
            .await
            .with_context(|| format!("failed to create collection {}", self.collection))?;
        tracing::info!(collection = %self.collection, dims, "created collection");
        Ok(true)
    }

    async fn upsert(&self, points: Vec<Point>) -> Result<()> {
        if points.is_empty() {
            return Ok(());
        }
        let body = UpsertRequest {
            points: points.iter().map(WirePoint::from).collect(),
        };
        let url = format!("{}/points?wait=false", self.collection_url());
        let response =
            http::send_with_retry("Qdrant", MAX_RETRIES, || self.client.put(&url).json(&body))
                .await?;
        http::error_for_status("Qdrant", response).await?;
        Ok(())
    }

    async fn set_index_phase(&self, phase: IndexPhase) -> Result<()> {
        let url = self.collection_url();
        let body = json!({ "hnsw_config": { "m": phase.hnsw_m() } });
        let response =
            http::send_with_retry("Qdrant", MAX_RETRIES, || self.client.patch(&url).json(&body))
                .await?;
        http::error_for_status("Qdrant", response)
            .await
            .with_context(|| format!("failed to update index of {}", self.collection))?;
        tracing::info!(collection = %self.collection, m = phase.hnsw_m(), "index settings updated");
        Ok(())
    }

    async fn search(&self, vector: &[f32], limit: usize) -> Result<Vec<ScoredPoint>> {
        let url = format!("{}/points/search", self.collection_url());
        let body = json!({
            "vector": vector,
            "limit": limit,
            "with_payload": true,
        });
        let response =
            http::send_with_retry("Qdrant", MAX_RETRIES, || self.client.post(&url).json(&body))
                .await?;
        let response = http::error_for_status("Qdrant", response).await?;
        let payload: SearchResponse = response
            .json()
            .await
            .context("failed to parse Qdrant search response")?;
        Ok(payload.into_scored())
    }
}

#[derive(Serialize)]
struct UpsertRequest<'a> {
    points: Vec<WirePoint<'a>>,
}

#[derive(Serialize)]
struct WirePoint<'a> {
    id: Uuid,
    vector: &'a [f32],
    payload: &'a PersonRecord,
}

impl<'a> From<&'a Point> for WirePoint<'a> {
    fn from(point: &'a Point) -> Self {
        Self {
            id: point.id,
            vector: &point.vector,
            payload: &point.payload,
        }
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    result: Vec<SearchHit>,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    id: Uuid,
    score: f32,
    #[serde(default)]
    payload: Option<PersonRecord>,
}

impl SearchResponse {
    fn into_scored(self) -> Vec<ScoredPoint> {
        self.result
            .into_iter()
            .map(|hit| ScoredPoint {
                id: hit.id,
                score: hit.score,
                payload: hit.payload.unwrap_or_default(),
            })
            .collect()
    }
}
