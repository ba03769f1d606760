use chrono::Utc;
use libsql::{params, Connection, Row, TransactionBehavior};

use crate::db::schema;
use crate::error::Result;
use crate::models::{CatalogEntry, RestaurantRecord, RetrievalHit};

const RECORD_COLUMNS: &str = "place_id, name, address, rating, price_level, google_maps_url, \
     restaurant_website, opening_hours, summary_of_restaurant, summary_of_reviews, page_content";

pub struct RestaurantRepository;

impl RestaurantRepository {
    pub async fn upsert(conn: &Connection, entry: &CatalogEntry, embedding: &[f32]) -> Result<()> {
        let embedding_json = serde_json::to_string(embedding)?;
        let now = Utc::now().to_rfc3339();
        let record = &entry.record;

        conn.execute(
            r#"
            INSERT INTO restaurants (
                place_id, name, address, rating, price_level, google_maps_url,
                restaurant_website, opening_hours, summary_of_restaurant, summary_of_reviews,
                page_content, embedding, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, vector32(?12), ?13, ?13)
            ON CONFLICT(place_id) DO UPDATE SET
                name = excluded.name,
                address = excluded.address,
                rating = excluded.rating,
                price_level = excluded.price_level,
                google_maps_url = excluded.google_maps_url,
                restaurant_website = excluded.restaurant_website,
                opening_hours = excluded.opening_hours,
                summary_of_restaurant = excluded.summary_of_restaurant,
                summary_of_reviews = excluded.summary_of_reviews,
                page_content = excluded.page_content,
                embedding = excluded.embedding,
                updated_at = excluded.updated_at
            "#,
            params![
                record.place_id.clone(),
                record.name.clone(),
                record.address.clone(),
                record.rating,
                record.price_level.map(|p| p.to_string()),
                record.google_maps_url.clone(),
                record.restaurant_website.clone(),
                record.opening_hours.clone(),
                record.summary_of_restaurant.clone(),
                record.summary_of_reviews.clone(),
                entry.page_content.clone(),
                embedding_json,
                now,
            ],
        )
        .await?;

        Ok(())
    }

    /// All rows land or none do.
    pub async fn upsert_batch(conn: &Connection, entries: &[(CatalogEntry, Vec<f32>)]) -> Result<()> {
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .await?;

        if let Err(e) = Self::write_rows(&tx, entries).await {
            tx.rollback().await?;
            return Err(e);
        }

        tx.commit().await?;
        Ok(())
    }

    /// Drops the table, recreates it at `embedding_dimensions` and writes
    /// `entries`, in one transaction. On error the previous catalog stays.
    pub async fn replace_all(
        conn: &Connection,
        embedding_dimensions: usize,
        entries: &[(CatalogEntry, Vec<f32>)],
    ) -> Result<()> {
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .await?;

        let replaced = async {
            tx.execute_batch(
                r#"
                DROP INDEX IF EXISTS restaurants_embedding_idx;
                DROP TABLE IF EXISTS restaurants;
                "#,
            )
            .await?;
            schema::create_restaurants_table(&tx, embedding_dimensions).await?;
            Self::write_rows(&tx, entries).await
        }
        .await;

        if let Err(e) = replaced {
            tx.rollback().await?;
            return Err(e);
        }

        tx.commit().await?;
        Ok(())
    }

    async fn write_rows(conn: &Connection, entries: &[(CatalogEntry, Vec<f32>)]) -> Result<()> {
        for (entry, embedding) in entries {
            Self::upsert(conn, entry, embedding).await?;
        }
        Ok(())
    }

    pub async fn search_similar(
        conn: &Connection,
        embedding: &[f32],
        limit: u32,
        threshold: f32,
    ) -> Result<Vec<RetrievalHit>> {
        let embedding_json = serde_json::to_string(embedding)?;

        let query = format!(
            r#"
            SELECT {RECORD_COLUMNS},
                1 - vector_distance_cos(embedding, vector32(?1)) AS score
            FROM restaurants
            WHERE embedding IS NOT NULL
              AND (1 - vector_distance_cos(embedding, vector32(?1))) >= ?2
            ORDER BY score DESC
            LIMIT ?3
            "#
        );

        let mut rows = conn
            .query(&query, params![embedding_json, threshold as f64, limit])
            .await?;

        let mut hits = Vec::new();
        while let Some(row) = rows.next().await? {
            let entry = Self::row_to_entry(&row)?;
            let score: f64 = row.get(11)?;
            hits.push(RetrievalHit {
                page_content: entry.page_content,
                metadata: entry.record,
                score: score as f32,
            });
        }

        Ok(hits)
    }

    pub async fn list_all(conn: &Connection) -> Result<Vec<CatalogEntry>> {
        let query = format!("SELECT {RECORD_COLUMNS} FROM restaurants ORDER BY place_id");
        let mut rows = conn.query(&query, ()).await?;

        let mut entries = Vec::new();
        while let Some(row) = rows.next().await? {
            entries.push(Self::row_to_entry(&row)?);
        }

        Ok(entries)
    }

    pub async fn count(conn: &Connection) -> Result<u64> {
        let count = conn
            .query("SELECT COUNT(*) FROM restaurants", ())
            .await?
            .next()
            .await?
            .map(|row| row.get::<i64>(0))
            .transpose()?
            .unwrap_or(0);

        Ok(count.max(0) as u64)
    }

    fn row_to_entry(row: &Row) -> Result<CatalogEntry> {
        let price_level = row
            .get::<Option<String>>(4)?
            .and_then(|raw| raw.parse().ok());

        Ok(CatalogEntry {
            record: RestaurantRecord {
                place_id: row.get(0)?,
                name: row.get(1)?,
                address: row.get(2)?,
                rating: row.get(3)?,
                price_level,
                google_maps_url: row.get(5)?,
                restaurant_website: row.get(6)?,
                opening_hours: row.get(7)?,
                summary_of_restaurant: row.get(8)?,
                summary_of_reviews: row.get(9)?,
            },
            page_content: row.get(10)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::schema::init_schema;
    use crate::models::PriceLevel;
    use libsql::Builder;

    async fn setup() -> (libsql::Database, Connection) {
        let db = Builder::new_local(":memory:").build().await.unwrap();
        let conn = db.connect().unwrap();
        init_schema(&conn, 3).await.unwrap();
        (db, conn)
    }

    fn entry(place_id: &str, name: &str) -> CatalogEntry {
        CatalogEntry {
            record: RestaurantRecord {
                place_id: place_id.to_string(),
                name: Some(name.to_string()),
                address: Some("123 Main St".to_string()),
                rating: Some(4.5),
                price_level: Some(PriceLevel::Moderate),
                ..Default::default()
            },
            page_content: format!("{name} page"),
        }
    }

    #[tokio::test]
    async fn test_upsert_and_search_orders_by_similarity() {
        let (_db, conn) = setup().await;

        RestaurantRepository::upsert_batch(
            &conn,
            &[
                (entry("p1", "Tacos"), vec![1.0, 0.0, 0.0]),
                (entry("p2", "Ramen"), vec![0.0, 1.0, 0.0]),
                (entry("p3", "Taqueria"), vec![0.9, 0.1, 0.0]),
            ],
        )
        .await
        .unwrap();

        let hits = RestaurantRepository::search_similar(&conn, &[1.0, 0.0, 0.0], 2, 0.0)
            .await
            .unwrap();

        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].metadata.place_id, "p1");
        assert_eq!(hits[1].metadata.place_id, "p3");
        assert!(hits[0].score >= hits[1].score);
        assert_eq!(hits[0].metadata.price_level, Some(PriceLevel::Moderate));
        assert_eq!(hits[0].page_content, "Tacos page");
    }

    #[tokio::test]
    async fn test_upsert_replaces_existing_record() {
        let (_db, conn) = setup().await;

        RestaurantRepository::upsert(&conn, &entry("p1", "Old Name"), &[1.0, 0.0, 0.0])
            .await
            .unwrap();
        RestaurantRepository::upsert(&conn, &entry("p1", "New Name"), &[0.0, 1.0, 0.0])
            .await
            .unwrap();

        assert_eq!(RestaurantRepository::count(&conn).await.unwrap(), 1);
        let all = RestaurantRepository::list_all(&conn).await.unwrap();
        assert_eq!(all[0].record.name.as_deref(), Some("New Name"));
    }

    #[tokio::test]
    async fn test_replace_all_changes_width() {
        let (_db, conn) = setup().await;

        RestaurantRepository::upsert(&conn, &entry("p1", "Tacos"), &[1.0, 0.0, 0.0])
            .await
            .unwrap();
        RestaurantRepository::replace_all(
            &conn,
            4,
            &[(entry("p2", "Ramen"), vec![0.0, 1.0, 0.0, 0.0])],
        )
        .await
        .unwrap();

        let all = RestaurantRepository::list_all(&conn).await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].record.place_id, "p2");

        let hits = RestaurantRepository::search_similar(&conn, &[0.0, 1.0, 0.0, 0.0], 5, 0.0)
            .await
            .unwrap();
        assert_eq!(hits[0].metadata.place_id, "p2");
    }

    #[tokio::test]
    async fn test_failed_batch_writes_nothing() {
        let (_db, conn) = setup().await;

        let result = RestaurantRepository::upsert_batch(
            &conn,
            &[
                (entry("p1", "Tacos"), vec![1.0, 0.0, 0.0]),
                (entry("p2", "Ramen"), vec![f32::NAN, 1.0, 0.0]),
            ],
        )
        .await;

        assert!(result.is_err());
        assert_eq!(RestaurantRepository::count(&conn).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_failed_replace_keeps_previous_catalog() {
        let (_db, conn) = setup().await;

        RestaurantRepository::upsert(&conn, &entry("p1", "Tacos"), &[1.0, 0.0, 0.0])
            .await
            .unwrap();

        let result = RestaurantRepository::replace_all(
            &conn,
            4,
            &[(entry("p2", "Ramen"), vec![f32::NAN, 1.0, 0.0, 0.0])],
        )
        .await;

        assert!(result.is_err());
        let all = RestaurantRepository::list_all(&conn).await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].record.place_id, "p1");
    }
}
