//! Category tag store: the job-description keyword lists, keyed by category.
//!
//! The ranking core only needs `get_all` and `add_tags_unique`; the rest is the CRUD
//! surface the JD endpoints expose. Every write normalizes tags through `normalize_tag`
//! and keeps each category free of duplicates while preserving first-seen order.

use std::collections::BTreeMap;

use async_trait::async_trait;
use sqlx::PgPool;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::info;

use crate::models::job_description::JobDescriptionRow;

/// Category name → ordered, de-duplicated keyword list.
pub type CategoryKeywords = BTreeMap<String, Vec<String>>;

/// Pseudo-category holding hard requirements; never weighted, only sent to the fitness gate.
pub const JOB_REQUIREMENTS: &str = "job_requirements";

#[derive(Debug, Error)]
pub enum TagStoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[async_trait]
pub trait CategoryTagStore: Send + Sync {
    /// Snapshot of every category. No consistency is promised against concurrent writers.
    async fn get_all(&self) -> Result<CategoryKeywords, TagStoreError>;

    async fn get(&self, category: &str) -> Result<Option<Vec<String>>, TagStoreError>;

    /// Set-union `tags` into `category`, creating the category if needed. Idempotent.
    async fn add_tags_unique(&self, category: &str, tags: &[String]) -> Result<(), TagStoreError>;

    /// Replaces the list of an existing category. `false` if the category does not exist.
    async fn replace(&self, category: &str, tags: &[String]) -> Result<bool, TagStoreError>;

    /// Set-union into an existing category only. `false` if the category does not exist.
    async fn append(&self, category: &str, tags: &[String]) -> Result<bool, TagStoreError>;

    /// Removes the listed tags from an existing category. `false` if it does not exist.
    async fn remove(&self, category: &str, tags: &[String]) -> Result<bool, TagStoreError>;

    async fn delete(&self, category: &str) -> Result<bool, TagStoreError>;

    async fn delete_all(&self) -> Result<(), TagStoreError>;
}

pub fn normalize_tag(tag: &str) -> String {
    tag.to_lowercase().replace('_', " ").trim().to_string()
}

/// Normalizes and de-duplicates, keeping first-seen order.
pub fn normalize_tags(tags: &[String]) -> Vec<String> {
    let mut out = Vec::with_capacity(tags.len());
    merge_unique(&mut out, tags);
    out
}

/// Appends each normalized tag of `new` to `existing` unless already present.
pub fn merge_unique(existing: &mut Vec<String>, new: &[String]) {
    for tag in new.iter().map(|t| normalize_tag(t)) {
        if !tag.is_empty() && !existing.contains(&tag) {
            existing.push(tag);
        }
    }
}

fn without(existing: &[String], remove: &[String]) -> Vec<String> {
    let remove = normalize_tags(remove);
    existing
        .iter()
        .filter(|t| !remove.contains(t))
        .cloned()
        .collect()
}

// ────────────────────────────────────────────────────────────────────────────
// In-memory store (no DATABASE_URL, and tests)
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct InMemoryTagStore {
    inner: RwLock<CategoryKeywords>,
}

impl InMemoryTagStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tags(tags: CategoryKeywords) -> Self {
        let normalized = tags
            .into_iter()
            .map(|(category, list)| (category, normalize_tags(&list)))
            .collect();
        Self {
            inner: RwLock::new(normalized),
        }
    }
}

#[async_trait]
impl CategoryTagStore for InMemoryTagStore {
    async fn get_all(&self) -> Result<CategoryKeywords, TagStoreError> {
        Ok(self.inner.read().await.clone())
    }

    async fn get(&self, category: &str) -> Result<Option<Vec<String>>, TagStoreError> {
        Ok(self.inner.read().await.get(category).cloned())
    }

    async fn add_tags_unique(&self, category: &str, tags: &[String]) -> Result<(), TagStoreError> {
        let mut inner = self.inner.write().await;
        merge_unique(inner.entry(category.to_string()).or_default(), tags);
        Ok(())
    }

    async fn replace(&self, category: &str, tags: &[String]) -> Result<bool, TagStoreError> {
        let mut inner = self.inner.write().await;
        Ok(match inner.get_mut(category) {
            Some(list) => {
                *list = normalize_tags(tags);
                true
            }
            None => false,
        })
    }

    async fn append(&self, category: &str, tags: &[String]) -> Result<bool, TagStoreError> {
        let mut inner = self.inner.write().await;
        Ok(match inner.get_mut(category) {
            Some(list) => {
                merge_unique(list, tags);
                true
            }
            None => false,
        })
    }

    async fn remove(&self, category: &str, tags: &[String]) -> Result<bool, TagStoreError> {
        let mut inner = self.inner.write().await;
        Ok(match inner.get_mut(category) {
            Some(list) => {
                *list = without(list, tags);
                true
            }
            None => false,
        })
    }

    async fn delete(&self, category: &str) -> Result<bool, TagStoreError> {
        Ok(self.inner.write().await.remove(category).is_some())
    }

    async fn delete_all(&self) -> Result<(), TagStoreError> {
        self.inner.write().await.clear();
        Ok(())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// PostgreSQL store
// ────────────────────────────────────────────────────────────────────────────

/// `job_descriptions(category TEXT PRIMARY KEY, data TEXT[])`.
/// Read-modify-write operations lock the row (`FOR UPDATE`) inside a transaction.
#[derive(Clone)]
pub struct PgTagStore {
    pool: PgPool,
}

impl PgTagStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Locks `category`, applies `update` to its list and writes it back.
    /// Returns `false` without writing when the category does not exist.
    async fn modify<F>(&self, category: &str, update: F) -> Result<bool, TagStoreError>
    where
        F: FnOnce(&mut Vec<String>) + Send,
    {
        let mut tx = self.pool.begin().await?;
        let current: Option<Vec<String>> = sqlx::query_scalar(
            "SELECT data FROM job_descriptions WHERE category = $1 FOR UPDATE",
        )
        .bind(category)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(mut data) = current else {
            tx.rollback().await?;
            return Ok(false);
        };
        update(&mut data);

        sqlx::query("UPDATE job_descriptions SET data = $2 WHERE category = $1")
            .bind(category)
            .bind(&data)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(true)
    }
}

#[async_trait]
impl CategoryTagStore for PgTagStore {
    async fn get_all(&self) -> Result<CategoryKeywords, TagStoreError> {
        let rows = sqlx::query_as::<_, JobDescriptionRow>(
            "SELECT category, data FROM job_descriptions ORDER BY category",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(|r| (r.category, r.data)).collect())
    }

    async fn get(&self, category: &str) -> Result<Option<Vec<String>>, TagStoreError> {
        let data = sqlx::query_scalar("SELECT data FROM job_descriptions WHERE category = $1")
            .bind(category)
            .fetch_optional(&self.pool)
            .await?;
        Ok(data)
    }

    async fn add_tags_unique(&self, category: &str, tags: &[String]) -> Result<(), TagStoreError> {
        // Make sure the row exists so the merge below can lock it.
        sqlx::query(
            "INSERT INTO job_descriptions (category, data) VALUES ($1, '{}') \
             ON CONFLICT (category) DO NOTHING",
        )
        .bind(category)
        .execute(&self.pool)
        .await?;

        self.modify(category, |data| merge_unique(data, tags)).await?;
        info!("Merged {} tags into category '{category}'", tags.len());
        Ok(())
    }

    async fn replace(&self, category: &str, tags: &[String]) -> Result<bool, TagStoreError> {
        let normalized = normalize_tags(tags);
        let result = sqlx::query("UPDATE job_descriptions SET data = $2 WHERE category = $1")
            .bind(category)
            .bind(&normalized)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn append(&self, category: &str, tags: &[String]) -> Result<bool, TagStoreError> {
        self.modify(category, |data| merge_unique(data, tags)).await
    }

    async fn remove(&self, category: &str, tags: &[String]) -> Result<bool, TagStoreError> {
        self.modify(category, |data| *data = without(data, tags))
            .await
    }

    async fn delete(&self, category: &str) -> Result<bool, TagStoreError> {
        let result = sqlx::query("DELETE FROM job_descriptions WHERE category = $1")
            .bind(category)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_all(&self) -> Result<(), TagStoreError> {
        sqlx::query("DELETE FROM job_descriptions")
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
