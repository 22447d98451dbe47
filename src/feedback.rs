//! SQLite-backed feedback store.
//!
//! Persists user feedback on generated responses for offline analysis.

use std::path::PathBuf;

use serde::Deserialize;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::core::errors::ApiError;

#[derive(Debug, Clone, Deserialize)]
pub struct FeedbackEntry {
    pub rating: Option<i64>,
    pub comment: Option<String>,
    #[serde(default)]
    pub query: Option<String>,
    #[serde(default)]
    pub response: Option<String>,
}

#[derive(Clone)]
pub struct FeedbackStore {
    pool: SqlitePool,
    #[allow(dead_code)]
    db_path: PathBuf,
}

impl FeedbackStore {
    pub async fn new(db_path: PathBuf) -> Result<Self, ApiError> {
        let options = SqliteConnectOptions::new()
            .filename(&db_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal);

        let pool = SqlitePoolOptions::new()
            .min_connections(1)
            .max_connections(4)
            .connect_with(options)
            .await
            .map_err(ApiError::internal)?;

        let store = Self { pool, db_path };
        store.init_schema().await?;
        Ok(store)
    }

    async fn init_schema(&self) -> Result<(), ApiError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS feedback (
                feedback_id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL DEFAULT 'anonymous',
                rating INTEGER,
                comment TEXT,
                query TEXT,
                response TEXT,
                created_at TEXT NOT NULL DEFAULT (STRFTIME('%Y-%m-%dT%H:%M:%fZ', 'now'))
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(ApiError::internal)?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_feedback_user ON feedback(user_id)")
            .execute(&self.pool)
            .await
            .map_err(ApiError::internal)?;

        Ok(())
    }

    /// Insert one feedback entry, returning its generated id.
    pub async fn insert(&self, user_id: &str, entry: &FeedbackEntry) -> Result<String, ApiError> {
        let feedback_id = Uuid::new_v4().to_string();

        sqlx::query(
            "INSERT INTO feedback (feedback_id, user_id, rating, comment, query, response)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        )
        .bind(&feedback_id)
        .bind(user_id)
        .bind(entry.rating)
        .bind(&entry.comment)
        .bind(&entry.query)
        .bind(&entry.response)
        .execute(&self.pool)
        .await
        .map_err(ApiError::internal)?;

        Ok(feedback_id)
    }

    pub async fn count(&self, user_id: Option<&str>) -> Result<usize, ApiError> {
        let count: i64 = if let Some(user_id) = user_id {
            sqlx::query_scalar("SELECT COUNT(*) FROM feedback WHERE user_id = ?1")
                .bind(user_id)
                .fetch_one(&self.pool)
                .await
                .map_err(ApiError::internal)?
        } else {
            sqlx::query_scalar("SELECT COUNT(*) FROM feedback")
                .fetch_one(&self.pool)
                .await
                .map_err(ApiError::internal)?
        };

        Ok(count as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_store() -> FeedbackStore {
        let tmp = std::env::temp_dir().join(format!("carebot-feedback-test-{}.db", Uuid::new_v4()));
        FeedbackStore::new(tmp).await.expect("feedback store")
    }

    #[tokio::test]
    async fn insert_and_count() {
        let store = test_store().await;

        let entry = FeedbackEntry {
            rating: Some(5),
            comment: Some("helpful".to_string()),
            query: Some("flu shot?".to_string()),
            response: Some("yes".to_string()),
        };

        let id = store.insert("demo_user", &entry).await.expect("insert");
        assert!(!id.is_empty());

        assert_eq!(store.count(None).await.expect("count"), 1);
        assert_eq!(store.count(Some("demo_user")).await.expect("count"), 1);
        assert_eq!(store.count(Some("other")).await.expect("count"), 0);
    }

    #[tokio::test]
    async fn insert_tolerates_sparse_entries() {
        let store = test_store().await;

        let entry = FeedbackEntry {
            rating: None,
            comment: None,
            query: None,
            response: None,
        };

        store.insert("anonymous", &entry).await.expect("insert");
        assert_eq!(store.count(Some("anonymous")).await.expect("count"), 1);
    }

    #[tokio::test]
    async fn stored_row_preserves_fields() {
        let store = test_store().await;

        let entry = FeedbackEntry {
            rating: Some(2),
            comment: Some("too vague".to_string()),
            query: None,
            response: None,
        };
        let id = store.insert("demo_user", &entry).await.expect("insert");

        let row = sqlx::query("SELECT user_id, rating, comment FROM feedback WHERE feedback_id = ?1")
            .bind(&id)
            .fetch_one(&store.pool)
            .await
            .expect("fetch");

        let user_id: String = row.get("user_id");
        let rating: Option<i64> = row.get("rating");
        let comment: Option<String> = row.get("comment");

        assert_eq!(user_id, "demo_user");
        assert_eq!(rating, Some(2));
        assert_eq!(comment.as_deref(), Some("too vague"));
    }
}
