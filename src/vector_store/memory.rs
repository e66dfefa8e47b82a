//! In-memory [`VectorStore`] for offline runs and tests.
//!
//! Uses a `HashMap` behind `std::sync::RwLock`; search is a brute-force
//! cosine scan.

use anyhow::{bail, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};
use uuid::Uuid;

use super::{IndexPhase, Point, ScoredPoint, VectorStore};

#[derive(Debug, Default)]
struct Collection {
    dims: usize,
    phase: Option<IndexPhase>,
    points: HashMap<Uuid, Point>,
    upsert_calls: usize,
}

#[derive(Debug, Default)]
pub struct MemoryVectorStore {
    inner: RwLock<Option<Collection>>,
}

impl MemoryVectorStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of distinct points stored.
    pub fn len(&self) -> usize {
        self.read(|c| c.points.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, id: &Uuid) -> Option<Point> {
        self.read(|c| c.points.get(id).cloned()).flatten()
    }

    /// Current index phase, `None` before the collection exists.
    pub fn phase(&self) -> Option<IndexPhase> {
        self.read(|c| c.phase).flatten()
    }

    /// Number of [`VectorStore::upsert`] calls received.
    pub fn upsert_calls(&self) -> usize {
        self.read(|c| c.upsert_calls).unwrap_or(0)
    }

    fn read<T>(&self, f: impl FnOnce(&Collection) -> T) -> Option<T> {
        let guard = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        guard.as_ref().map(f)
    }
}

fn cosine_sim(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let mag_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let mag_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if mag_a < f32::EPSILON || mag_b < f32::EPSILON {
        0.0
    } else {
        dot / (mag_a * mag_b)
    }
}

#[async_trait]
impl VectorStore for MemoryVectorStore {
    async fn ensure_collection(&self, dims: usize) -> Result<bool> {
        let mut guard = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(existing) = guard.as_ref() {
            if existing.dims != dims {
                bail!(
                    "collection holds {}-dimensional vectors, expected {}",
                    existing.dims,
                    dims
                );
            }
            return Ok(false);
        }
        *guard = Some(Collection {
            dims,
            phase: Some(IndexPhase::BulkLoad),
            ..Collection::default()
        });
        Ok(true)
    }

    async fn upsert(&self, points: Vec<Point>) -> Result<()> {
        let mut guard = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        let Some(collection) = guard.as_mut() else {
            bail!("collection does not exist");
        };
        if let Some(bad) = points.iter().find(|p| p.vector.len() != collection.dims) {
            bail!(
                "point {} has {} dimensions, collection expects {}",
                bad.id,
                bad.vector.len(),
                collection.dims
            );
        }
        collection.upsert_calls += 1;
        for point in points {
            collection.points.insert(point.id, point);
        }
        Ok(())
    }

    async fn set_index_phase(&self, phase: IndexPhase) -> Result<()> {
        let mut guard = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        let Some(collection) = guard.as_mut() else {
            bail!("collection does not exist");
        };
        collection.phase = Some(phase);
        Ok(())
    }

    async fn search(&self, vector: &[f32], limit: usize) -> Result<Vec<ScoredPoint>> {
        let guard = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        let Some(collection) = guard.as_ref() else {
            return Ok(Vec::new());
        };
        let mut scored: Vec<ScoredPoint> = collection
            .points
            .values()
            .map(|p| ScoredPoint {
                id: p.id,
                score: cosine_sim(vector, &p.vector),
                payload: p.payload.clone(),
            })
            .collect();
        scored.sort_by(|a, b| b.score.total_cmp(&a.score).then(a.id.cmp(&b.id)));
        scored.truncate(limit);
        Ok(scored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lead_ingest_core::{Field, PersonRecord};

    fn point(n: u128, vector: Vec<f32>, name: &str) -> Point {
        Point {
            id: Uuid::from_u128(n),
            vector,
            payload: PersonRecord::empty().with(Field::FullName, name),
        }
    }

    #[test]
    fn test_cosine_identical() {
        let v = vec![1.0, 2.0, 3.0];
        assert!((cosine_sim(&v, &v) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_mismatched() {
        assert_eq!(cosine_sim(&[1.0, 2.0], &[1.0]), 0.0);
        assert_eq!(cosine_sim(&[], &[]), 0.0);
    }

    #[tokio::test]
    async fn ensure_collection_once() {
        let store = MemoryVectorStore::new();
        assert!(store.ensure_collection(2).await.unwrap());
        assert!(!store.ensure_collection(2).await.unwrap());
        assert_eq!(store.phase(), Some(IndexPhase::BulkLoad));
        assert!(store.ensure_collection(3).await.is_err());
    }

    #[tokio::test]
    async fn upsert_overwrites_by_id() {
        let store = MemoryVectorStore::new();
        store.ensure_collection(2).await.unwrap();
        store
            .upsert(vec![point(1, vec![1.0, 0.0], "Ada"), point(2, vec![0.0, 1.0], "Grace")])
            .await
            .unwrap();
        store
            .upsert(vec![point(1, vec![1.0, 0.0], "Ada Lovelace")])
            .await
            .unwrap();

        assert_eq!(store.len(), 2);
        assert_eq!(store.upsert_calls(), 2);
        let ada = store.get(&Uuid::from_u128(1)).unwrap();
        assert_eq!(ada.payload.get(Field::FullName), Some("Ada Lovelace"));
    }

    #[tokio::test]
    async fn upsert_requires_collection_and_width() {
        let store = MemoryVectorStore::new();
        assert!(store.upsert(vec![point(1, vec![1.0], "x")]).await.is_err());
        store.ensure_collection(2).await.unwrap();
        assert!(store.upsert(vec![point(1, vec![1.0], "x")]).await.is_err());
    }

    #[tokio::test]
    async fn search_ranks_by_cosine() {
        let store = MemoryVectorStore::new();
        store.ensure_collection(2).await.unwrap();
        store
            .upsert(vec![
                point(1, vec![1.0, 0.0], "east"),
                point(2, vec![0.0, 1.0], "north"),
                point(3, vec![0.7, 0.7], "northeast"),
            ])
            .await
            .unwrap();

        let hits = store.search(&[1.0, 0.1], 2).await.unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].payload.get(Field::FullName), Some("east"));
        assert_eq!(hits[1].payload.get(Field::FullName), Some("northeast"));
    }

    #[tokio::test]
    async fn phase_switch() {
        let store = MemoryVectorStore::new();
        assert!(store.set_index_phase(IndexPhase::QueryReady).await.is_err());
        store.ensure_collection(2).await.unwrap();
        store.set_index_phase(IndexPhase::QueryReady).await.unwrap();
        assert_eq!(store.phase(), Some(IndexPhase::QueryReady));
    }
}
