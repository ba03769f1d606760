use libsql::Connection;

use crate::error::Result;

pub async fn init_schema(conn: &Connection, embedding_dimensions: usize) -> Result<()> {
    conn.execute_batch(
        r#"
        -- One row per user identity, created implicitly on first append
        CREATE TABLE IF NOT EXISTS users (
            user_id TEXT PRIMARY KEY,
            created_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS sessions (
            user_id TEXT NOT NULL,
            session_id TEXT NOT NULL,
            created_at TEXT NOT NULL,
            last_updated TEXT NOT NULL,
            PRIMARY KEY (user_id, session_id),
            FOREIGN KEY (user_id) REFERENCES users(user_id) ON DELETE CASCADE
        );

        CREATE INDEX IF NOT EXISTS idx_sessions_last_updated ON sessions(user_id, last_updated);

        -- Append-only session log; id order is append order
        CREATE TABLE IF NOT EXISTS messages (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id TEXT NOT NULL,
            session_id TEXT NOT NULL,
            message_type TEXT NOT NULL,
            content TEXT NOT NULL,
            created_at TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_messages_session ON messages(user_id, session_id, id);

        -- Metadata key-value store
        CREATE TABLE IF NOT EXISTS dineguide_meta (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );
        "#,
    )
    .await?;

    create_restaurants_table(conn, embedding_dimensions).await?;

    Ok(())
}

/// Restaurant catalog with its vector column. The column width is fixed at
/// creation time; a dimension change goes through a rebuild.
pub async fn create_restaurants_table(conn: &Connection, embedding_dimensions: usize) -> Result<()> {
    let ddl = format!(
        r#"
        CREATE TABLE IF NOT EXISTS restaurants (
            place_id TEXT PRIMARY KEY,
            name TEXT,
            address TEXT,
            rating REAL,
            price_level TEXT,
            google_maps_url TEXT,
            restaurant_website TEXT,
            opening_hours TEXT,
            summary_of_restaurant TEXT,
            summary_of_reviews TEXT,
            page_content TEXT NOT NULL DEFAULT '',
            embedding F32_BLOB({embedding_dimensions}),
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );
        "#
    );
    conn.execute_batch(&ddl).await?;

    create_vector_index(conn).await
}

async fn create_vector_index(conn: &Connection) -> Result<()> {
    let index_exists: bool = conn
        .query(
            "SELECT 1 FROM sqlite_master WHERE type='index' AND name='restaurants_embedding_idx'",
            (),
        )
        .await?
        .next()
        .await?
        .is_some();

    if !index_exists {
        if let Err(e) = conn
            .execute(
                "CREATE INDEX IF NOT EXISTS restaurants_embedding_idx ON restaurants(libsql_vector_idx(embedding))",
                (),
            )
            .await
        {
            tracing::warn!("Vector index creation failed for restaurants (may already exist): {e}");
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use libsql::Builder;

    #[tokio::test]
    async fn test_schema_creates_core_tables() {
        let db = Builder::new_local(":memory:").build().await.unwrap();
        let conn = db.connect().unwrap();

        init_schema(&conn, 8).await.unwrap();
        // Idempotent on an existing database
        init_schema(&conn, 8).await.unwrap();

        let mut rows = conn
            .query(
                "SELECT name FROM sqlite_master WHERE type='table' AND name IN ('users', 'sessions', 'messages', 'restaurants', 'dineguide_meta') ORDER BY name",
                (),
            )
            .await
            .unwrap();

        let mut names = Vec::new();
        while let Some(row) = rows.next().await.unwrap() {
            names.push(row.get::<String>(0).unwrap());
        }

        assert_eq!(
            names,
            vec!["dineguide_meta", "messages", "restaurants", "sessions", "users"]
        );
    }
}
