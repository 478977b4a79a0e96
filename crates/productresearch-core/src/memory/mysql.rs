use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::Row;
use sqlx::mysql::{MySqlConnectOptions, MySqlPool, MySqlPoolOptions};
use tracing::{debug, info};

use super::{LongTermMemory, MemoryItem};
use crate::MySqlSettings;

const CREATE_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS long_term_memories (
    id BIGINT AUTO_INCREMENT PRIMARY KEY,
    task_description TEXT NOT NULL,
    metadata TEXT NOT NULL,
    recorded_at BIGINT NOT NULL,
    score DOUBLE NOT NULL
)
"#;

/// Long-term memory persisted in MySQL.
#[derive(Clone)]
pub struct MySqlStore {
    pool: MySqlPool,
}

impl MySqlStore {
    pub async fn connect(settings: &MySqlSettings) -> Result<Self> {
        let options = MySqlConnectOptions::new()
            .host(&settings.host)
            .port(settings.port)
            .username(&settings.user)
            .password(settings.password.expose())
            .database(&settings.database);

        let pool = MySqlPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(10))
            .connect_with(options)
            .await
            .with_context(|| format!("connect to {}", settings.redacted_url()))?;

        info!(url = %settings.redacted_url(), "connected long-term memory store");
        Self::from_pool(pool).await
    }

    /// Wrap an existing pool, creating the memory table if needed.
    pub async fn from_pool(pool: MySqlPool) -> Result<Self> {
        sqlx::query(CREATE_TABLE)
            .execute(&pool)
            .await
            .context("create long_term_memories table")?;
        Ok(Self { pool })
    }
}

#[async_trait]
impl LongTermMemory for MySqlStore {
    async fn save(&self, item: MemoryItem) -> Result<()> {
        let metadata = serde_json::to_string(&item.metadata).context("serialize metadata")?;
        sqlx::query(
            "INSERT INTO long_term_memories (task_description, metadata, recorded_at, score) \
             VALUES (?, ?, ?, ?)",
        )
        .bind(&item.task_description)
        .bind(metadata)
        .bind(item.recorded_at.timestamp_millis())
        .bind(item.score)
        .execute(&self.pool)
        .await
        .context("insert long-term memory")?;

        debug!(task = %item.task_description, score = item.score, "memory saved");
        Ok(())
    }

    async fn search(&self, task_description: &str, latest_n: usize) -> Result<Vec<MemoryItem>> {
        let rows = sqlx::query(
            "SELECT task_description, metadata, recorded_at, score FROM long_term_memories \
             WHERE task_description = ? ORDER BY recorded_at DESC, score ASC LIMIT ?",
        )
        .bind(task_description)
        .bind(latest_n as i64)
        .fetch_all(&self.pool)
        .await
        .context("query long-term memories")?;

        rows.into_iter()
            .map(|row| -> Result<MemoryItem> {
                let metadata: String = row.try_get("metadata")?;
                let recorded_at: i64 = row.try_get("recorded_at")?;
                Ok(MemoryItem {
                    task_description: row.try_get("task_description")?,
                    metadata: serde_json::from_str(&metadata).context("decode metadata")?,
                    recorded_at: DateTime::<Utc>::from_timestamp_millis(recorded_at)
                        .ok_or_else(|| anyhow!("invalid timestamp {recorded_at}"))?,
                    score: row.try_get("score")?,
                })
            })
            .collect()
    }

    fn backend(&self) -> &'static str {
        "mysql"
    }
}
