use std::collections::HashMap;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{CatalogEntry, Message, RetrievalHit, Session};

/// Durable per-user, per-session ordered message log.
#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// Upsert the user and session, bump `last_updated` and append the
    /// message, all in one transaction.
    async fn append_message(&self, user_id: &str, session_id: &str, message: &Message)
        -> Result<()>;

    /// Last `limit` messages of a session in original order.
    async fn read_recent_messages(
        &self,
        user_id: &str,
        session_id: &str,
        limit: usize,
    ) -> Result<Vec<Message>>;

    async fn read_all_messages(&self, user_id: &str, session_id: &str) -> Result<Vec<Message>>;

    async fn session_exists(&self, user_id: &str, session_id: &str) -> Result<bool>;

    /// Remove a session and its messages. Returns whether the session existed.
    async fn delete_session(&self, user_id: &str, session_id: &str) -> Result<bool>;

    async fn list_sessions(&self, user_id: &str) -> Result<HashMap<String, Session>>;
}

/// Restaurant catalog with vector similarity search.
#[async_trait]
pub trait RestaurantIndex: Send + Sync {
    async fn upsert_restaurants(&self, entries: &[(CatalogEntry, Vec<f32>)]) -> Result<()>;
    async fn search_similar_restaurants(
        &self,
        embedding: &[f32],
        limit: u32,
        threshold: f32,
    ) -> Result<Vec<RetrievalHit>>;
    async fn list_catalog_entries(&self) -> Result<Vec<CatalogEntry>>;
    async fn count_restaurants(&self) -> Result<u64>;

    /// Swap the whole catalog for `entries` at a new vector width. Atomic:
    /// a failure leaves the previous catalog in place.
    async fn replace_restaurants(
        &self,
        embedding_dimensions: usize,
        entries: &[(CatalogEntry, Vec<f32>)],
    ) -> Result<()>;
}

/// Key-value metadata store (e.g. embedding dimensions).
#[async_trait]
pub trait MetadataStore: Send + Sync {
    async fn get_embedding_dimensions(&self) -> Result<Option<usize>>;
    async fn set_embedding_dimensions(&self, dims: usize) -> Result<()>;
}

/// A complete database backend that combines all store traits plus lifecycle
/// operations.
#[async_trait]
pub trait DatabaseBackend: ConversationStore + RestaurantIndex + MetadataStore {
    /// Sync with remote (e.g. Turso replication). No-op for local-only backends.
    async fn sync(&self) -> Result<()>;
}
