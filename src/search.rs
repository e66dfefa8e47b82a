//! Semantic search over the uploaded people.
//!
//! The query is embedded with the query task, the collection returns the
//! nearest points, and, when requested, Jina reranks the candidates against
//! the raw query text. Reranking fetches a wider candidate pool
//! ([`RERANK_POOL_FACTOR`] × `limit`) so it has something to reorder.

use anyhow::{Context, Result};
use lead_ingest_core::{Field, PersonRecord};
use uuid::Uuid;

use crate::config::Config;
use crate::embedding::{create_embedder, Embedder};
use crate::rerank::JinaReranker;
use crate::vector_store::{create_store, ScoredPoint, VectorStore};

pub const RERANK_POOL_FACTOR: usize = 4;

#[derive(Debug, Clone)]
pub struct PersonHit {
    pub id: Uuid,
    /// Cosine similarity, or the rerank relevance score when reranked.
    pub score: f32,
    pub record: PersonRecord,
}

impl From<ScoredPoint> for PersonHit {
    fn from(point: ScoredPoint) -> Self {
        Self {
            id: point.id,
            score: point.score,
            record: point.payload,
        }
    }
}

/// Nearest people to `query` by embedding similarity.
pub async fn search_people(
    embedder: &dyn Embedder,
    store: &dyn VectorStore,
    query: &str,
    limit: usize,
) -> Result<Vec<PersonHit>> {
    if query.trim().is_empty() || limit == 0 {
        return Ok(Vec::new());
    }
    let vector = embedder
        .embed_query(query)
        .await
        .context("failed to embed query")?;
    let points = store.search(&vector, limit).await?;
    Ok(points.into_iter().map(PersonHit::from).collect())
}

/// Reorder `hits` by rerank relevance and keep the best `limit`.
pub async fn rerank_hits(
    reranker: &JinaReranker,
    query: &str,
    hits: Vec<PersonHit>,
    limit: usize,
) -> Result<Vec<PersonHit>> {
    let documents = hits
        .iter()
        .map(|h| h.record.to_json())
        .collect::<serde_json::Result<Vec<_>>>()?;
    let ranked = reranker.rerank(query, &documents, limit).await?;

    let mut slots: Vec<Option<PersonHit>> = hits.into_iter().map(Some).collect();
    Ok(ranked
        .into_iter()
        .filter_map(|r| {
            let mut hit = slots.get_mut(r.index)?.take()?;
            hit.score = r.relevance_score;
            Some(hit)
        })
        .take(limit)
        .collect())
}

/// One-line summary of a person for terminal output.
pub fn describe(record: &PersonRecord) -> String {
    let name = record.get(Field::FullName).unwrap_or("(no name)");
    let mut parts = vec![name.to_string()];
    if let Some(title) = record.get(Field::JobTitle) {
        parts.push(title.to_string());
    }
    if let Some(company) = record.get(Field::CompanyName) {
        parts.push(format!("@ {}", company));
    }
    if let Some(location) = record.get(Field::Location) {
        parts.push(format!("({})", location));
    }
    parts.join(" ")
}

/// `lead-ingest search`: print the best matches for `query`.
pub async fn run_search(config: &Config, query: &str, limit: usize, rerank: bool) -> Result<()> {
    let embedder = create_embedder(&config.embedding)?;
    let store = create_store(&config.vector_store)?;

    let pool = if rerank {
        limit.saturating_mul(RERANK_POOL_FACTOR)
    } else {
        limit
    };
    let mut hits = search_people(embedder.as_ref(), store.as_ref(), query, pool).await?;
    if rerank && !hits.is_empty() {
        let reranker = JinaReranker::new(&config.rerank, &config.embedding)?;
        hits = rerank_hits(&reranker, query, hits, limit).await?;
    }

    if hits.is_empty() {
        println!("No results.");
        return Ok(());
    }
    for (i, hit) in hits.iter().enumerate() {
        println!("{}. [{:.3}] {}", i + 1, hit.score, describe(&hit.record));
        if let Some(email) = hit.record.get(Field::Email) {
            println!("    email: {}", email);
        }
        if let Some(url) = hit.record.get(Field::LinkedinUrl) {
            println!("    linkedin: {}", url);
        }
        println!("    id: {}", hit.id);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vector_store::memory::MemoryVectorStore;
    use crate::vector_store::Point;
    use async_trait::async_trait;

    /// Embeds "rust" texts along x and everything else along y.
    struct KeywordEmbedder;

    fn keyword_vector(text: &str) -> Vec<f32> {
        if text.to_lowercase().contains("rust") {
            vec![1.0, 0.0]
        } else {
            vec![0.0, 1.0]
        }
    }

    #[async_trait]
    impl Embedder for KeywordEmbedder {
        fn model_name(&self) -> &str {
            "keyword"
        }
        fn dims(&self) -> usize {
            2
        }
        async fn embed_passages(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Ok(texts.iter().map(|t| keyword_vector(t)).collect())
        }
        async fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
            Ok(keyword_vector(text))
        }
    }

    async fn seeded_store() -> MemoryVectorStore {
        let store = MemoryVectorStore::new();
        store.ensure_collection(2).await.unwrap();
        let people = [
            ("Ferris", "Rust developer"),
            ("Gopher", "Go developer"),
        ];
        let points = people
            .iter()
            .enumerate()
            .map(|(i, (name, title))| {
                let record = PersonRecord::empty()
                    .with(Field::FullName, name)
                    .with(Field::JobTitle, title);
                Point {
                    id: Uuid::from_u128(i as u128),
                    vector: keyword_vector(title),
                    payload: record,
                }
            })
            .collect();
        store.upsert(points).await.unwrap();
        store
    }

    #[tokio::test]
    async fn finds_nearest_person() {
        let store = seeded_store().await;
        let hits = search_people(&KeywordEmbedder, &store, "rust engineers", 1)
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].record.get(Field::FullName), Some("Ferris"));
    }

    #[tokio::test]
    async fn empty_query_returns_nothing() {
        let store = seeded_store().await;
        let hits = search_people(&KeywordEmbedder, &store, "   ", 5).await.unwrap();
        assert!(hits.is_empty());
    }

    #[test]
    fn describe_includes_known_fields() {
        let record = PersonRecord::empty()
            .with(Field::FullName, "Ada Lovelace")
            .with(Field::JobTitle, "Analyst")
            .with(Field::CompanyName, "Analytical Engines")
            .with(Field::Location, "London");
        assert_eq!(
            describe(&record),
            "Ada Lovelace Analyst @ Analytical Engines (London)"
        );
        assert_eq!(describe(&PersonRecord::empty()), "(no name)");
    }
}
