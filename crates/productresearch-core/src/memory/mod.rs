//! Long-term memory shared across crew runs.

#[cfg(feature = "mysql-memory")]
pub mod mysql;
#[cfg(feature = "mysql-memory")]
pub use mysql::MySqlStore;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A remembered outcome of one task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryItem {
    pub task_description: String,
    pub metadata: Value,
    pub recorded_at: DateTime<Utc>,
    pub score: f64,
}

impl MemoryItem {
    pub fn new(task_description: impl Into<String>, metadata: Value, score: f64) -> Self {
        Self {
            task_description: task_description.into(),
            metadata,
            recorded_at: Utc::now(),
            score,
        }
    }
}

#[async_trait]
pub trait LongTermMemory: Send + Sync {
    async fn save(&self, item: MemoryItem) -> anyhow::Result<()>;

    /// Up to `latest_n` items recorded for `task_description`, newest first.
    async fn search(
        &self,
        task_description: &str,
        latest_n: usize,
    ) -> anyhow::Result<Vec<MemoryItem>>;

    fn backend(&self) -> &'static str;
}

pub type DynMemory = Arc<dyn LongTermMemory>;

/// Process-local memory for tests and runs without a database.
#[derive(Default)]
pub struct InMemoryStore {
    store: DashMap<String, Vec<MemoryItem>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            store: DashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.store.iter().map(|entry| entry.value().len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl LongTermMemory for InMemoryStore {
    async fn save(&self, item: MemoryItem) -> anyhow::Result<()> {
        self.store
            .entry(item.task_description.clone())
            .or_default()
            .push(item);
        Ok(())
    }

    async fn search(
        &self,
        task_description: &str,
        latest_n: usize,
    ) -> anyhow::Result<Vec<MemoryItem>> {
        let mut items = self
            .store
            .get(task_description)
            .map(|entry| entry.clone())
            .unwrap_or_default();

        items.sort_by(|a, b| {
            b.recorded_at
                .cmp(&a.recorded_at)
                .then(a.score.total_cmp(&b.score))
        });
        items.truncate(latest_n);
        Ok(items)
    }

    fn backend(&self) -> &'static str {
        "in-memory"
    }
}
