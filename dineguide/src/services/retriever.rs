use std::sync::Arc;

use async_trait::async_trait;

use crate::db::DatabaseBackend;
use crate::embeddings::EmbeddingProvider;
use crate::error::{DineError, Result};
use crate::models::RetrievalHit;

/// Hits for one turn, ordered by descending score.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RetrievalContext {
    pub hits: Vec<RetrievalHit>,
    /// Set when the index could not be reached and the turn proceeds without it.
    pub degraded: bool,
}

impl RetrievalContext {
    pub fn new(hits: Vec<RetrievalHit>) -> Self {
        Self {
            hits,
            degraded: false,
        }
    }

    pub fn degraded() -> Self {
        Self {
            hits: Vec::new(),
            degraded: true,
        }
    }
}

#[async_trait]
pub trait ContextRetriever: Send + Sync {
    async fn search(&self, query: &str, k: usize) -> Result<RetrievalContext>;
}

/// Embeds the query and searches the restaurant vector index.
pub struct VectorRetriever {
    db: Arc<dyn DatabaseBackend>,
    embeddings: EmbeddingProvider,
    min_score: f32,
}

impl VectorRetriever {
    pub fn new(db: Arc<dyn DatabaseBackend>, embeddings: EmbeddingProvider, min_score: f32) -> Self {
        Self {
            db,
            embeddings,
            min_score,
        }
    }
}

#[async_trait]
impl ContextRetriever for VectorRetriever {
    async fn search(&self, query: &str, k: usize) -> Result<RetrievalContext> {
        let embedding = self
            .embeddings
            .embed_query(query)
            .await
            .map_err(|e| DineError::Retrieval(format!("Failed to embed query: {e}")))?;

        let limit = u32::try_from(k).unwrap_or(u32::MAX);
        let mut hits = self
            .db
            .search_similar_restaurants(&embedding, limit, self.min_score)
            .await
            .map_err(|e| DineError::Retrieval(format!("Vector search failed: {e}")))?;

        hits.sort_by(|a, b| b.score.total_cmp(&a.score));
        hits.truncate(k);

        tracing::debug!(hits = hits.len(), k, "Retrieved restaurant context");
        Ok(RetrievalContext::new(hits))
    }
}

/// Turns retrieval failures into an empty, degraded context.
pub struct GracefulRetriever<R> {
    inner: R,
}

impl<R> GracefulRetriever<R> {
    pub fn new(inner: R) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<R: ContextRetriever> ContextRetriever for GracefulRetriever<R> {
    async fn search(&self, query: &str, k: usize) -> Result<RetrievalContext> {
        match self.inner.search(query, k).await {
            Ok(context) => Ok(context),
            Err(e) => {
                tracing::warn!(error = %e, "Restaurant retrieval unavailable, continuing without context");
                Ok(RetrievalContext::degraded())
            }
        }
    }
}

/// Retrieval record persisted as `restaurant_data`: each hit as pretty JSON,
/// separated by a blank line.
pub fn format_retrieval_record(hits: &[RetrievalHit]) -> Result<String> {
    let parts = hits
        .iter()
        .map(serde_json::to_string_pretty)
        .collect::<serde_json::Result<Vec<_>>>()?;

    Ok(parts.join("\n\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RestaurantRecord;

    struct FailingRetriever;

    #[async_trait]
    impl ContextRetriever for FailingRetriever {
        async fn search(&self, _query: &str, _k: usize) -> Result<RetrievalContext> {
            Err(DineError::Retrieval("index offline".to_string()))
        }
    }

    fn hit(place_id: &str, score: f32) -> RetrievalHit {
        RetrievalHit {
            page_content: format!("about {place_id}"),
            metadata: RestaurantRecord {
                place_id: place_id.to_string(),
                ..Default::default()
            },
            score,
        }
    }

    #[tokio::test]
    async fn test_failure_propagates_without_decorator() {
        let result = FailingRetriever.search("tacos", 3).await;
        assert!(matches!(result, Err(DineError::Retrieval(_))));
    }

    #[tokio::test]
    async fn test_graceful_retriever_degrades() {
        let retriever = GracefulRetriever::new(FailingRetriever);
        let context = retriever.search("tacos", 3).await.unwrap();
        assert!(context.degraded);
        assert!(context.hits.is_empty());
    }

    #[test]
    fn test_retrieval_record_format() {
        let record = format_retrieval_record(&[hit("p1", 0.9), hit("p2", 0.8)]).unwrap();
        let parts: Vec<&str> = record.split("\n\n").collect();
        assert_eq!(parts.len(), 2);

        let first: serde_json::Value = serde_json::from_str(parts[0]).unwrap();
        assert_eq!(first["metadata"]["place_id"], "p1");
        assert_eq!(first["page_content"], "about p1");
        assert!(first.get("score").is_some());
    }

    #[test]
    fn test_empty_retrieval_record() {
        assert_eq!(format_retrieval_record(&[]).unwrap(), "");
    }
}
