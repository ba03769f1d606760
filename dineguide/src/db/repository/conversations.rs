use std::collections::HashMap;

use chrono::Utc;
use libsql::{params, Connection, TransactionBehavior};

use crate::error::Result;
use crate::models::{format_timestamp, parse_timestamp, Message, Session};

pub struct ConversationRepository;

impl ConversationRepository {
    /// Upsert-and-append in a single immediate transaction, so concurrent
    /// appends to one session serialize in the store instead of racing.
    pub async fn append(
        conn: &Connection,
        user_id: &str,
        session_id: &str,
        message: &Message,
    ) -> Result<()> {
        let now = format_timestamp(&Utc::now());
        let message_type = message.message_type().to_string();
        let content = message.content_text()?;

        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .await?;

        tx.execute(
            "INSERT INTO users (user_id, created_at) VALUES (?1, ?2)
             ON CONFLICT(user_id) DO NOTHING",
            params![user_id, now.clone()],
        )
        .await?;

        tx.execute(
            r#"
            INSERT INTO sessions (user_id, session_id, created_at, last_updated)
            VALUES (?1, ?2, ?3, ?3)
            ON CONFLICT(user_id, session_id)
            DO UPDATE SET last_updated = MAX(sessions.last_updated, excluded.last_updated)
            "#,
            params![user_id, session_id, now.clone()],
        )
        .await?;

        tx.execute(
            r#"
            INSERT INTO messages (user_id, session_id, message_type, content, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![user_id, session_id, message_type, content, now],
        )
        .await?;

        tx.commit().await?;

        Ok(())
    }

    pub async fn read_recent(
        conn: &Connection,
        user_id: &str,
        session_id: &str,
        limit: usize,
    ) -> Result<Vec<Message>> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let mut rows = conn
            .query(
                r#"
                SELECT message_type, content FROM (
                    SELECT id, message_type, content
                    FROM messages
                    WHERE user_id = ?1 AND session_id = ?2
                    ORDER BY id DESC
                    LIMIT ?3
                )
                ORDER BY id ASC
                "#,
                params![user_id, session_id, limit],
            )
            .await?;

        let mut messages = Vec::new();
        while let Some(row) = rows.next().await? {
            let message_type: String = row.get(0)?;
            let content: String = row.get(1)?;
            if let Some(message) = Message::from_stored(&message_type, content) {
                messages.push(message);
            }
        }

        Ok(messages)
    }

    pub async fn read_all(
        conn: &Connection,
        user_id: &str,
        session_id: &str,
    ) -> Result<Vec<Message>> {
        let mut rows = conn
            .query(
                r#"
                SELECT message_type, content
                FROM messages
                WHERE user_id = ?1 AND session_id = ?2
                ORDER BY id ASC
                "#,
                params![user_id, session_id],
            )
            .await?;

        let mut messages = Vec::new();
        while let Some(row) = rows.next().await? {
            let message_type: String = row.get(0)?;
            let content: String = row.get(1)?;
            if let Some(message) = Message::from_stored(&message_type, content) {
                messages.push(message);
            }
        }

        Ok(messages)
    }

    pub async fn session_exists(conn: &Connection, user_id: &str, session_id: &str) -> Result<bool> {
        let exists = conn
            .query(
                "SELECT 1 FROM sessions WHERE user_id = ?1 AND session_id = ?2",
                params![user_id, session_id],
            )
            .await?
            .next()
            .await?
            .is_some();

        Ok(exists)
    }

    pub async fn delete_session(conn: &Connection, user_id: &str, session_id: &str) -> Result<bool> {
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .await?;

        tx.execute(
            "DELETE FROM messages WHERE user_id = ?1 AND session_id = ?2",
            params![user_id, session_id],
        )
        .await?;

        let removed = tx
            .execute(
                "DELETE FROM sessions WHERE user_id = ?1 AND session_id = ?2",
                params![user_id, session_id],
            )
            .await?;

        tx.commit().await?;

        Ok(removed > 0)
    }

    pub async fn list_sessions(conn: &Connection, user_id: &str) -> Result<HashMap<String, Session>> {
        let mut sessions = HashMap::new();

        let mut rows = conn
            .query(
                "SELECT session_id, last_updated FROM sessions WHERE user_id = ?1",
                params![user_id],
            )
            .await?;

        while let Some(row) = rows.next().await? {
            let session_id: String = row.get(0)?;
            let raw_last_updated: String = row.get(1)?;
            let last_updated = parse_timestamp(&raw_last_updated).unwrap_or_else(|| {
                tracing::warn!(
                    session_id = %session_id,
                    value = %raw_last_updated,
                    "Unparseable last_updated, treating as oldest"
                );
                Default::default()
            });

            sessions.insert(
                session_id.clone(),
                Session {
                    session_id,
                    last_updated,
                    messages: Vec::new(),
                },
            );
        }

        if sessions.is_empty() {
            return Ok(sessions);
        }

        let mut rows = conn
            .query(
                r#"
                SELECT session_id, message_type, content
                FROM messages
                WHERE user_id = ?1
                ORDER BY id ASC
                "#,
                params![user_id],
            )
            .await?;

        while let Some(row) = rows.next().await? {
            let session_id: String = row.get(0)?;
            let message_type: String = row.get(1)?;
            let content: String = row.get(2)?;

            if let Some(session) = sessions.get_mut(&session_id) {
                if let Some(message) = Message::from_stored(&message_type, content) {
                    session.messages.push(message);
                }
            }
        }

        Ok(sessions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::schema::init_schema;
    use crate::models::StructuredResponse;
    use libsql::Builder;
    use pretty_assertions::assert_eq;

    async fn setup() -> (libsql::Database, Connection) {
        let db = Builder::new_local(":memory:").build().await.unwrap();
        let conn = db.connect().unwrap();
        init_schema(&conn, 4).await.unwrap();
        (db, conn)
    }

    fn human(text: &str) -> Message {
        Message::HumanMessageNoPrompt(text.to_string())
    }

    #[tokio::test]
    async fn test_append_creates_user_and_session() {
        let (_db, conn) = setup().await;

        ConversationRepository::append(&conn, "u1", "1", &human("hello"))
            .await
            .unwrap();

        assert!(ConversationRepository::session_exists(&conn, "u1", "1")
            .await
            .unwrap());
        assert!(!ConversationRepository::session_exists(&conn, "u1", "2")
            .await
            .unwrap());

        let users = conn
            .query("SELECT COUNT(*) FROM users WHERE user_id = 'u1'", ())
            .await
            .unwrap()
            .next()
            .await
            .unwrap()
            .unwrap()
            .get::<i64>(0)
            .unwrap();
        assert_eq!(users, 1);
    }

    #[tokio::test]
    async fn test_read_recent_keeps_original_order() {
        let (_db, conn) = setup().await;

        for i in 0..7 {
            ConversationRepository::append(&conn, "u1", "1", &human(&format!("m{i}")))
                .await
                .unwrap();
        }

        let recent = ConversationRepository::read_recent(&conn, "u1", "1", 3)
            .await
            .unwrap();
        assert_eq!(recent, vec![human("m4"), human("m5"), human("m6")]);

        let all = ConversationRepository::read_all(&conn, "u1", "1").await.unwrap();
        assert_eq!(all.len(), 7);
        assert_eq!(all[0], human("m0"));
    }

    #[tokio::test]
    async fn test_read_missing_session_is_empty() {
        let (_db, conn) = setup().await;

        let recent = ConversationRepository::read_recent(&conn, "ghost", "1", 5)
            .await
            .unwrap();
        assert!(recent.is_empty());
    }

    #[tokio::test]
    async fn test_last_updated_is_monotonic() {
        let (_db, conn) = setup().await;

        let mut previous = None;
        for i in 0..5 {
            ConversationRepository::append(&conn, "u1", "1", &human(&format!("m{i}")))
                .await
                .unwrap();
            let sessions = ConversationRepository::list_sessions(&conn, "u1").await.unwrap();
            let current = sessions["1"].last_updated;
            if let Some(prev) = previous {
                assert!(current >= prev);
            }
            previous = Some(current);
        }
    }

    #[tokio::test]
    async fn test_last_updated_never_moves_backwards() {
        let (_db, conn) = setup().await;

        ConversationRepository::append(&conn, "u1", "1", &human("first"))
            .await
            .unwrap();

        let future = "2999-01-01T00:00:00.000000Z";
        conn.execute(
            "UPDATE sessions SET last_updated = ?1 WHERE user_id = 'u1'",
            params![future],
        )
        .await
        .unwrap();

        ConversationRepository::append(&conn, "u1", "1", &human("second"))
            .await
            .unwrap();

        let sessions = ConversationRepository::list_sessions(&conn, "u1").await.unwrap();
        assert_eq!(format_timestamp(&sessions["1"].last_updated), future);
    }

    #[tokio::test]
    async fn test_delete_session_reports_existence() {
        let (_db, conn) = setup().await;

        ConversationRepository::append(&conn, "u1", "1", &human("hi"))
            .await
            .unwrap();
        ConversationRepository::append(&conn, "u1", "2", &human("other"))
            .await
            .unwrap();

        assert!(ConversationRepository::delete_session(&conn, "u1", "1")
            .await
            .unwrap());
        assert!(!ConversationRepository::delete_session(&conn, "u1", "1")
            .await
            .unwrap());

        let remaining = ConversationRepository::read_all(&conn, "u1", "1").await.unwrap();
        assert!(remaining.is_empty());

        let sessions = ConversationRepository::list_sessions(&conn, "u1").await.unwrap();
        assert_eq!(sessions.len(), 1);
        assert!(sessions.contains_key("2"));
    }

    #[tokio::test]
    async fn test_list_sessions_groups_messages() {
        let (_db, conn) = setup().await;

        let ai = Message::AiMessage(StructuredResponse {
            general_response: "Try Sonoratown".into(),
            restaurants: vec![],
        });

        ConversationRepository::append(&conn, "u1", "1", &human("burritos?"))
            .await
            .unwrap();
        ConversationRepository::append(&conn, "u1", "1", &ai).await.unwrap();
        ConversationRepository::append(&conn, "u1", "3", &human("pho?"))
            .await
            .unwrap();
        ConversationRepository::append(&conn, "u2", "1", &human("not mine"))
            .await
            .unwrap();

        let sessions = ConversationRepository::list_sessions(&conn, "u1").await.unwrap();
        assert_eq!(sessions.len(), 2);
        assert_eq!(sessions["1"].messages, vec![human("burritos?"), ai]);
        assert_eq!(sessions["3"].messages, vec![human("pho?")]);

        let none = ConversationRepository::list_sessions(&conn, "nobody").await.unwrap();
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_message_types_are_dropped_on_read() {
        let (_db, conn) = setup().await;

        ConversationRepository::append(&conn, "u1", "1", &human("kept"))
            .await
            .unwrap();
        conn.execute(
            "INSERT INTO messages (user_id, session_id, message_type, content, created_at)
             VALUES ('u1', '1', 'system_note', 'hidden', '2024-01-01T00:00:00.000000Z')",
            (),
        )
        .await
        .unwrap();

        let all = ConversationRepository::read_all(&conn, "u1", "1").await.unwrap();
        assert_eq!(all, vec![human("kept")]);
    }
}
