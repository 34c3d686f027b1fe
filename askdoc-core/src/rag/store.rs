//! Vector store abstraction and the in-memory implementation.
//!
//! The index lives entirely in memory, is built once at startup, and is
//! invalidated only by a process restart. There is no persistence and no
//! incremental update path.

use super::types::{Document, SearchResult};
use async_trait::async_trait;
use tokio::sync::RwLock;

/// Interface for vector index operations.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Adds documents to the index.
    async fn add(&self, documents: Vec<Document>);

    /// Searches for the most similar documents by cosine similarity,
    /// returning up to `top_k` results sorted by descending score.
    async fn search(&self, query_embedding: &[f32], top_k: usize) -> Vec<SearchResult>;

    /// Returns the total number of document chunks in the index.
    async fn count(&self) -> usize;
}

/// In-process vector store backing the query engine.
#[derive(Debug, Default)]
pub struct MemoryStore {
    documents: RwLock<Vec<Document>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl VectorStore for MemoryStore {
    async fn add(&self, documents: Vec<Document>) {
        self.documents.write().await.extend(documents);
    }

    async fn search(&self, query_embedding: &[f32], top_k: usize) -> Vec<SearchResult> {
        let documents = self.documents.read().await;

        let mut results: Vec<SearchResult> = documents
            .iter()
            .map(|doc| SearchResult {
                document: doc.clone(),
                score: cosine_similarity(query_embedding, &doc.embedding),
            })
            .collect();

        results.sort_by(|a, b| b.score.total_cmp(&a.score));
        results.truncate(top_k);
        results
    }

    async fn count(&self) -> usize {
        self.documents.read().await.len()
    }
}

/// Cosine similarity between two vectors; 0.0 when either has no magnitude
/// or the dimensions disagree.
fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
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

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot / (norm_a.sqrt() * norm_b.sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(id: &str, embedding: Vec<f32>) -> Document {
        Document::new(id, format!("content of {id}"), embedding)
    }

    #[test]
    fn test_cosine_similarity_identical() {
        let v = vec![0.5, 0.5, 0.0];
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_similarity_orthogonal() {
        let a = vec![1.0, 0.0];
        let b = vec![0.0, 1.0];
        assert!(cosine_similarity(&a, &b).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_similarity_mismatched_lengths() {
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 0.0]), 0.0);
    }

    #[test]
    fn test_cosine_similarity_zero_vector() {
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
    }

    #[tokio::test]
    async fn test_search_orders_by_score_and_truncates() {
        let store = MemoryStore::new();
        store
            .add(vec![
                doc("far", vec![0.0, 1.0]),
                doc("near", vec![1.0, 0.05]),
                doc("mid", vec![0.7, 0.7]),
            ])
            .await;

        let results = store.search(&[1.0, 0.0], 2).await;
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].document.id, "near");
        assert_eq!(results[1].document.id, "mid");
        assert!(results[0].score > results[1].score);
    }

    #[tokio::test]
    async fn test_count_and_empty_search() {
        let store = MemoryStore::new();
        assert_eq!(store.count().await, 0);
        assert!(store.search(&[1.0, 0.0], 5).await.is_empty());

        store.add(vec![doc("only", vec![1.0, 0.0])]).await;
        assert_eq!(store.count().await, 1);
    }
}
