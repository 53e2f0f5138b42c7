//! Document stores for uploaded resumes and job descriptions.
//!
//! Two backends: a local directory (default) and an S3 / MinIO bucket under a key
//! prefix. Both expose a flat namespace of file names; names are validated so a
//! client-supplied name can never escape the store.

use std::path::PathBuf;

use async_trait::async_trait;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client as S3Client;
use bytes::Bytes;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Invalid file name '{0}'")]
    InvalidName(String),

    #[error("Document '{0}' not found")]
    NotFound(String),

    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("S3 error: {0}")]
    S3(String),
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Every stored name, sorted.
    async fn list(&self) -> Result<Vec<String>, StoreError>;

    async fn get(&self, name: &str) -> Result<Bytes, StoreError>;

    /// Stores `bytes` under `name`, replacing any previous document.
    async fn put(&self, name: &str, bytes: Bytes) -> Result<(), StoreError>;

    /// `false` when nothing was stored under `name`.
    async fn delete(&self, name: &str) -> Result<bool, StoreError>;

    async fn delete_all(&self) -> Result<usize, StoreError>;
}

/// Rejects names that are empty, hidden, or contain path separators.
pub fn validate_name(name: &str) -> Result<&str, StoreError> {
    let invalid = name.trim().is_empty()
        || name.starts_with('.')
        || name.contains(['/', '\\', '\0'])
        || name.len() > 255;
    if invalid {
        return Err(StoreError::InvalidName(name.to_string()));
    }
    Ok(name)
}

// ────────────────────────────────────────────────────────────────────────────
// Local directory
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct LocalDocumentStore {
    root: PathBuf,
}

impl LocalDocumentStore {
    /// Opens (and creates if missing) the directory at `root`.
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        tokio::fs::create_dir_all(&root).await?;
        info!("Document store ready at {}", root.display());
        Ok(Self { root })
    }

    fn path_for(&self, name: &str) -> Result<PathBuf, StoreError> {
        Ok(self.root.join(validate_name(name)?))
    }
}

#[async_trait]
impl DocumentStore for LocalDocumentStore {
    async fn list(&self) -> Result<Vec<String>, StoreError> {
        let mut names = Vec::new();
        let mut entries = tokio::fs::read_dir(&self.root).await?;
        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_file() {
                continue;
            }
            if let Ok(name) = entry.file_name().into_string() {
                if validate_name(&name).is_ok() {
                    names.push(name);
                }
            }
        }
        names.sort();
        Ok(names)
    }

    async fn get(&self, name: &str) -> Result<Bytes, StoreError> {
        match tokio::fs::read(self.path_for(name)?).await {
            Ok(bytes) => Ok(Bytes::from(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StoreError::NotFound(name.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn put(&self, name: &str, bytes: Bytes) -> Result<(), StoreError> {
        tokio::fs::write(self.path_for(name)?, &bytes).await?;
        Ok(())
    }

    async fn delete(&self, name: &str) -> Result<bool, StoreError> {
        match tokio::fs::remove_file(self.path_for(name)?).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn delete_all(&self) -> Result<usize, StoreError> {
        let names = self.list().await?;
        for name in &names {
            self.delete(name).await?;
        }
        Ok(names.len())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// S3 / MinIO bucket
// ────────────────────────────────────────────────────────────────────────────

/// Documents live at `s3://{bucket}/{prefix}{name}`.
#[derive(Clone)]
pub struct S3DocumentStore {
    client: S3Client,
    bucket: String,
    prefix: String,
}

fn s3_error<E: std::error::Error>(e: E) -> StoreError {
    StoreError::S3(DisplayErrorContext(e).to_string())
}

impl S3DocumentStore {
    pub fn new(client: S3Client, bucket: impl Into<String>, prefix: impl Into<String>) -> Self {
        let mut prefix = prefix.into();
        if !prefix.is_empty() && !prefix.ends_with('/') {
            prefix.push('/');
        }
        Self {
            client,
            bucket: bucket.into(),
            prefix,
        }
    }

    fn key_for(&self, name: &str) -> Result<String, StoreError> {
        Ok(format!("{}{}", self.prefix, validate_name(name)?))
    }
}

#[async_trait]
impl DocumentStore for S3DocumentStore {
    async fn list(&self) -> Result<Vec<String>, StoreError> {
        let mut names = Vec::new();
        let mut token: Option<String> = None;
        loop {
            let page = self
                .client
                .list_objects_v2()
                .bucket(&self.bucket)
                .prefix(&self.prefix)
                .set_continuation_token(token.take())
                .send()
                .await
                .map_err(s3_error)?;

            for object in page.contents() {
                let name = object
                    .key()
                    .and_then(|key| key.strip_prefix(self.prefix.as_str()));
                if let Some(name) = name.filter(|n| validate_name(n).is_ok()) {
                    names.push(name.to_string());
                }
            }

            match page.next_continuation_token() {
                Some(next) if page.is_truncated().unwrap_or(false) => {
                    token = Some(next.to_string())
                }
                _ => break,
            }
        }
        names.sort();
        Ok(names)
    }

    async fn get(&self, name: &str) -> Result<Bytes, StoreError> {
        let key = self.key_for(name)?;
        let output = match self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(&key)
            .send()
            .await
        {
            Ok(output) => output,
            Err(e) => {
                let e = e.into_service_error();
                if e.is_no_such_key() {
                    return Err(StoreError::NotFound(name.to_string()));
                }
                return Err(s3_error(e));
            }
        };
        let data = output
            .body
            .collect()
            .await
            .map_err(|e| StoreError::S3(format!("reading s3://{}/{key}: {e}", self.bucket)))?;
        Ok(data.into_bytes())
    }

    async fn put(&self, name: &str, bytes: Bytes) -> Result<(), StoreError> {
        let key = self.key_for(name)?;
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .body(ByteStream::from(bytes))
            .send()
            .await
            .map_err(s3_error)?;
        info!("Uploaded s3://{}/{}", self.bucket, key);
        Ok(())
    }

    async fn delete(&self, name: &str) -> Result<bool, StoreError> {
        let key = self.key_for(name)?;
        // S3 deletes are idempotent, so existence is checked first.
        let exists = match self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(&key)
            .send()
            .await
        {
            Ok(_) => true,
            Err(e) => {
                let e = e.into_service_error();
                if !e.is_not_found() {
                    return Err(s3_error(e));
                }
                false
            }
        };
        if !exists {
            return Ok(false);
        }

        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(&key)
            .send()
            .await
            .map_err(s3_error)?;
        Ok(true)
    }

    async fn delete_all(&self) -> Result<usize, StoreError> {
        let names = self.list().await?;
        for name in &names {
            self.client
                .delete_object()
                .bucket(&self.bucket)
                .key(self.key_for(name)?)
                .send()
                .await
                .map_err(s3_error)?;
        }
        Ok(names.len())
    }
}
