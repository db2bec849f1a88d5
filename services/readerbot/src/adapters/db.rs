//! services/readerbot/src/adapters/db.rs
//!
//! This module contains the history store adapter, the concrete implementation
//! of the `HistoryStore` port from the `core` crate. It keeps the append-only
//! posting history in SQLite using `sqlx`.

use async_trait::async_trait;
use readerbot_core::{HistoryStore, PortError, PortResult, Post};
use sqlx::{FromRow, SqlitePool};

/// Subject, variant and text of the placeholder post written into a fresh store.
pub const SEED_MARKER: &str = "seed";

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A SQLite adapter that implements the `HistoryStore` port.
#[derive(Clone)]
pub struct SqliteHistoryStore {
    pool: SqlitePool,
}

impl SqliteHistoryStore {
    /// Creates a new `SqliteHistoryStore`.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::Error> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    /// Writes the placeholder post if the history is empty. Returns whether it did.
    pub async fn seed_if_empty(&self) -> PortResult<bool> {
        let mut tx = self.pool.begin().await.map_err(store_error)?;

        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM posts")
            .fetch_one(&mut *tx)
            .await
            .map_err(store_error)?;
        if count > 0 {
            return Ok(false);
        }

        let seed = Post::new(SEED_MARKER, SEED_MARKER, SEED_MARKER, 0)
            .map_err(|e| PortError::StoreUnavailable(e.to_string()))?;
        insert_post(&mut tx, &seed).await?;
        tx.commit().await.map_err(store_error)?;
        Ok(true)
    }
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct PostRecord {
    subject: String,
    variant: String,
    text: String,
    timestamp: i64,
}
impl PostRecord {
    fn to_domain(self) -> PortResult<Post> {
        Post::new(self.subject, self.variant, self.text, self.timestamp)
            .map_err(|e| PortError::StoreUnavailable(format!("corrupt history row: {}", e)))
    }
}

fn store_error(e: sqlx::Error) -> PortError {
    PortError::StoreUnavailable(e.to_string())
}

async fn insert_post(tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>, post: &Post) -> PortResult<()> {
    sqlx::query("INSERT INTO posts (subject, variant, text, timestamp) VALUES (?, ?, ?, ?)")
        .bind(post.subject())
        .bind(post.variant())
        .bind(post.text())
        .bind(post.timestamp())
        .execute(&mut **tx)
        .await
        .map_err(store_error)?;
    Ok(())
}

//=========================================================================================
// `HistoryStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl HistoryStore for SqliteHistoryStore {
    async fn most_recent(&self) -> PortResult<Post> {
        let record = sqlx::query_as::<_, PostRecord>(
            "SELECT subject, variant, text, timestamp FROM posts ORDER BY timestamp DESC, rowid DESC LIMIT 1",
        )
        .fetch_optional(&self.pool)
        .await
        .map_err(store_error)?;

        match record {
            Some(record) => record.to_domain(),
            None => Err(PortError::EmptyHistory),
        }
    }

    async fn append(&self, post: &Post) -> PortResult<()> {
        let mut tx = self.pool.begin().await.map_err(store_error)?;
        insert_post(&mut tx, post).await?;
        tx.commit().await.map_err(store_error)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn store() -> SqliteHistoryStore {
        // One connection: every in-memory connection is its own database.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        let store = SqliteHistoryStore::new(pool);
        store.run_migrations().await.unwrap();
        store
    }

    fn post(subject: &str, timestamp: i64) -> Post {
        Post::new(subject, "halfway done with", format!("about {}", subject), timestamp).unwrap()
    }

    #[tokio::test]
    async fn test_empty_history() {
        let store = store().await;
        assert!(matches!(
            store.most_recent().await,
            Err(PortError::EmptyHistory)
        ));
    }

    #[tokio::test]
    async fn test_most_recent_orders_by_timestamp() {
        let store = store().await;
        store.append(&post("Emma", 200)).await.unwrap();
        store.append(&post("Dune", 300)).await.unwrap();
        store.append(&post("Walden", 100)).await.unwrap();

        let latest = store.most_recent().await.unwrap();
        assert_eq!(latest, post("Dune", 300));
    }

    #[tokio::test]
    async fn test_latest_insert_wins_timestamp_ties() {
        let store = store().await;
        store.append(&post("Emma", 300)).await.unwrap();
        store.append(&post("Dune", 300)).await.unwrap();
        assert_eq!(store.most_recent().await.unwrap().subject(), "Dune");
    }

    #[tokio::test]
    async fn test_seed_only_fresh_store() {
        let store = store().await;
        assert!(store.seed_if_empty().await.unwrap());
        assert!(!store.seed_if_empty().await.unwrap());
        let seed = store.most_recent().await.unwrap();
        assert_eq!(seed.subject(), SEED_MARKER);
        assert_eq!(seed.timestamp(), 0);

        store.append(&post("Dune", 10)).await.unwrap();
        assert!(!store.seed_if_empty().await.unwrap());
        assert_eq!(store.most_recent().await.unwrap().subject(), "Dune");
    }
}
