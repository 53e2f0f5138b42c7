// Resume storage and text extraction.

pub mod extract;
pub mod handlers;
pub mod store;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::resumes::extract::{ExtractionError, TextExtractor};
use crate::resumes::store::{DocumentStore, StoreError};

#[derive(Debug, Error)]
pub enum ResumeTextError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Extraction(#[from] ExtractionError),
}

/// Resume id → plain text. The ranking core only sees this trait.
#[async_trait]
pub trait ResumeTextSource: Send + Sync {
    async fn text_for(&self, resume: &str) -> Result<String, ResumeTextError>;
}

/// Reads the stored document and runs it through the extractor on every call.
#[derive(Clone)]
pub struct StoredResumeText {
    store: Arc<dyn DocumentStore>,
    extractor: Arc<dyn TextExtractor>,
}

impl StoredResumeText {
    pub fn new(store: Arc<dyn DocumentStore>, extractor: Arc<dyn TextExtractor>) -> Self {
        Self { store, extractor }
    }
}

#[async_trait]
impl ResumeTextSource for StoredResumeText {
    async fn text_for(&self, resume: &str) -> Result<String, ResumeTextError> {
        let bytes = self.store.get(resume).await?;
        Ok(self.extractor.extract(resume, bytes).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resumes::extract::DocumentExtractor;
    use crate::resumes::store::LocalDocumentStore;
    use bytes::Bytes;

    #[tokio::test]
    async fn test_stored_text_reads_and_extracts() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalDocumentStore::open(dir.path()).await.unwrap();
        store
            .put("alice.txt", Bytes::from_static(b"Rust, Kafka"))
            .await
            .unwrap();
        let source = StoredResumeText::new(Arc::new(store), Arc::new(DocumentExtractor::default()));

        assert_eq!(source.text_for("alice.txt").await.unwrap(), "Rust, Kafka");
    }

    #[tokio::test]
    async fn test_missing_resume_is_a_store_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalDocumentStore::open(dir.path()).await.unwrap();
        let source = StoredResumeText::new(Arc::new(store), Arc::new(DocumentExtractor::default()));

        let err = source.text_for("ghost.txt").await.unwrap_err();
        assert!(matches!(err, ResumeTextError::Store(StoreError::NotFound(_))));
    }
}
