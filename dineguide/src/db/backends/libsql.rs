use std::collections::HashMap;

use async_trait::async_trait;

use crate::db::connection::Database;
use crate::db::repository::{ConversationRepository, RestaurantRepository};
use crate::db::traits::{ConversationStore, DatabaseBackend, MetadataStore, RestaurantIndex};
use crate::db::MetadataRepository;
use crate::error::Result;
use crate::models::{CatalogEntry, Message, RetrievalHit, Session};

pub struct LibSqlBackend {
    db: Database,
}

impl LibSqlBackend {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ConversationStore for LibSqlBackend {
    async fn append_message(
        &self,
        user_id: &str,
        session_id: &str,
        message: &Message,
    ) -> Result<()> {
        let conn = self.db.connect_for_write().await?;
        ConversationRepository::append(&conn, user_id, session_id, message).await
    }
    async fn read_recent_messages(
        &self,
        user_id: &str,
        session_id: &str,
        limit: usize,
    ) -> Result<Vec<Message>> {
        let conn = self.db.connect()?;
        ConversationRepository::read_recent(&conn, user_id, session_id, limit).await
    }
    async fn read_all_messages(&self, user_id: &str, session_id: &str) -> Result<Vec<Message>> {
        let conn = self.db.connect()?;
        ConversationRepository::read_all(&conn, user_id, session_id).await
    }
    async fn session_exists(&self, user_id: &str, session_id: &str) -> Result<bool> {
        let conn = self.db.connect()?;
        ConversationRepository::session_exists(&conn, user_id, session_id).await
    }
    async fn delete_session(&self, user_id: &str, session_id: &str) -> Result<bool> {
        let conn = self.db.connect_for_write().await?;
        ConversationRepository::delete_session(&conn, user_id, session_id).await
    }
    async fn list_sessions(&self, user_id: &str) -> Result<HashMap<String, Session>> {
        let conn = self.db.connect()?;
        ConversationRepository::list_sessions(&conn, user_id).await
    }
}

#[async_trait]
impl RestaurantIndex for LibSqlBackend {
    async fn upsert_restaurants(&self, entries: &[(CatalogEntry, Vec<f32>)]) -> Result<()> {
        let conn = self.db.connect_for_write().await?;
        RestaurantRepository::upsert_batch(&conn, entries).await
    }
    async fn search_similar_restaurants(
        &self,
        embedding: &[f32],
        limit: u32,
        threshold: f32,
    ) -> Result<Vec<RetrievalHit>> {
        let conn = self.db.connect()?;
        RestaurantRepository::search_similar(&conn, embedding, limit, threshold).await
    }
    async fn list_catalog_entries(&self) -> Result<Vec<CatalogEntry>> {
        let conn = self.db.connect()?;
        RestaurantRepository::list_all(&conn).await
    }
    async fn count_restaurants(&self) -> Result<u64> {
        let conn = self.db.connect()?;
        RestaurantRepository::count(&conn).await
    }
    async fn replace_restaurants(
        &self,
        embedding_dimensions: usize,
        entries: &[(CatalogEntry, Vec<f32>)],
    ) -> Result<()> {
        let conn = self.db.connect_for_write().await?;
        RestaurantRepository::replace_all(&conn, embedding_dimensions, entries).await
    }
}

#[async_trait]
impl MetadataStore for LibSqlBackend {
    async fn get_embedding_dimensions(&self) -> Result<Option<usize>> {
        let conn = self.db.connect()?;
        MetadataRepository::get_embedding_dimensions(&conn).await
    }
    async fn set_embedding_dimensions(&self, dims: usize) -> Result<()> {
        let conn = self.db.connect()?;
        MetadataRepository::set_embedding_dimensions(&conn, dims).await
    }
}

#[async_trait]
impl DatabaseBackend for LibSqlBackend {
    async fn sync(&self) -> Result<()> {
        self.db.sync().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DatabaseConfig;
    use crate::models::StructuredResponse;
    use std::sync::Arc;

    async fn setup_test_db() -> (LibSqlBackend, tempfile::TempDir) {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let config = DatabaseConfig {
            url: format!("file:{}", dir.path().join("dineguide.db").display()),
            auth_token: None,
            local_path: None,
        };
        let db = Database::new(&config, 3)
            .await
            .expect("Failed to create database");

        (LibSqlBackend::new(db), dir)
    }

    #[tokio::test]
    async fn test_concurrent_appends_lose_nothing() {
        let (backend, _dir) = setup_test_db().await;
        let backend = Arc::new(backend);

        let mut handles = Vec::new();
        for i in 0..16 {
            let backend = Arc::clone(&backend);
            handles.push(tokio::spawn(async move {
                backend
                    .append_message("u1", "1", &Message::HumanMessageNoPrompt(format!("m{i}")))
                    .await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let messages = backend.read_all_messages("u1", "1").await.unwrap();
        assert_eq!(messages.len(), 16);
    }

    #[tokio::test]
    async fn test_metadata_through_backend() {
        let (backend, _dir) = setup_test_db().await;

        assert_eq!(backend.get_embedding_dimensions().await.unwrap(), None);
        backend.set_embedding_dimensions(3).await.unwrap();
        assert_eq!(backend.get_embedding_dimensions().await.unwrap(), Some(3));
    }

    #[tokio::test]
    async fn test_append_then_read_round_trip() {
        let (backend, _dir) = setup_test_db().await;

        let human = Message::HumanMessageNoPrompt("best tacos?".into());
        let ai = Message::AiMessage(StructuredResponse {
            general_response: "Try X".into(),
            restaurants: vec![],
        });

        backend.append_message("u1", "5", &human).await.unwrap();
        backend.append_message("u1", "5", &ai).await.unwrap();

        let messages = backend.read_all_messages("u1", "5").await.unwrap();
        assert_eq!(messages, vec![human, ai]);
        assert!(backend.session_exists("u1", "5").await.unwrap());
    }
}
