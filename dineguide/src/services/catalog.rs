use std::path::Path;
use std::sync::Arc;

use validator::Validate;

use crate::db::DatabaseBackend;
use crate::embeddings::EmbeddingProvider;
use crate::error::{DineError, Result};
use crate::models::CatalogEntry;

/// Write side of the restaurant vector index.
#[derive(Clone)]
pub struct RestaurantCatalog {
    db: Arc<dyn DatabaseBackend>,
    embeddings: EmbeddingProvider,
}

impl RestaurantCatalog {
    pub fn new(db: Arc<dyn DatabaseBackend>, embeddings: EmbeddingProvider) -> Self {
        Self { db, embeddings }
    }

    /// Embeds and stores the entries, replacing existing rows with the same
    /// `place_id`. Returns the number of entries written.
    pub async fn upsert(&self, entries: Vec<CatalogEntry>) -> Result<usize> {
        if entries.is_empty() {
            return Ok(0);
        }

        let rows = self.embed_entries(entries).await?;
        self.db.upsert_restaurants(&rows).await?;

        tracing::info!(count = rows.len(), "Upserted catalog entries");
        Ok(rows.len())
    }

    /// Loads a JSON array of catalog entries from disk.
    pub async fn load_from_file(&self, path: impl AsRef<Path>) -> Result<usize> {
        let path = path.as_ref();
        let raw = tokio::fs::read_to_string(path).await?;
        let entries: Vec<CatalogEntry> = serde_json::from_str(&raw).map_err(|e| {
            DineError::Validation(format!("Invalid catalog file {}: {e}", path.display()))
        })?;

        tracing::info!(path = %path.display(), entries = entries.len(), "Loading restaurant catalog");
        self.upsert(entries).await
    }

    pub async fn count(&self) -> Result<u64> {
        self.db.count_restaurants().await
    }

    /// Re-embeds every stored entry with the current provider, recreating
    /// the vector column at the provider's dimensions.
    ///
    /// Every entry is embedded before the table is touched, so a provider
    /// failure leaves the stored catalog and its recorded width unchanged.
    pub async fn rebuild_embeddings(&self) -> Result<usize> {
        let entries = self.db.list_catalog_entries().await?;
        let dimensions = self.embeddings.dimensions();

        tracing::info!(
            entries = entries.len(),
            dimensions,
            "Rebuilding restaurant embeddings"
        );

        let rows = self.embed_entries(entries).await?;
        self.db.replace_restaurants(dimensions, &rows).await?;
        self.db.set_embedding_dimensions(dimensions).await?;

        Ok(rows.len())
    }

    async fn embed_entries(
        &self,
        entries: Vec<CatalogEntry>,
    ) -> Result<Vec<(CatalogEntry, Vec<f32>)>> {
        for entry in &entries {
            validate_entry(entry)?;
        }

        let texts: Vec<String> = entries.iter().map(CatalogEntry::embedding_text).collect();
        let embeddings = self.embeddings.embed_passages(texts).await?;

        Ok(entries.into_iter().zip(embeddings).collect())
    }
}

fn validate_entry(entry: &CatalogEntry) -> Result<()> {
    entry.validate().map_err(|e| {
        DineError::Validation(format!(
            "Invalid catalog entry '{}': {e}",
            entry.record.place_id
        ))
    })
}
