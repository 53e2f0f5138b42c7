//! Embedding scorer: cosine similarity between the resume and each category's keywords.
//!
//! The resume is embedded once per call; each category's keyword list is joined into
//! one blob and embedded once. Negative similarity is clamped to 0 (no signal).
//! Categories with no keyword data are skipped entirely and do not appear in the
//! breakdown.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use thiserror::Error;
use tracing::{debug, warn};

use crate::jd::tags::CategoryKeywords;
use crate::ranking::weights::CategoryWeights;
use crate::ranking::{ResumeScorer, ScoreBreakdown, ScoringError};

#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("embedding model error: {0}")]
    Model(String),

    #[error("embedding model returned no vector")]
    Empty,

    #[error("embedding task failed: {0}")]
    Task(String),
}

/// Text → fixed-length vector. Deterministic for identical input.
#[async_trait]
pub trait TextEmbedder: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;
}

/// Local sentence-embedding model (all-MiniLM-L6-v2 via fastembed / ONNX runtime).
///
/// Inference is CPU-bound, so it runs on the blocking pool. The mutex is held only for
/// the duration of one `embed` call.
#[derive(Clone)]
pub struct FastEmbedder {
    model: Arc<Mutex<TextEmbedding>>,
}

impl FastEmbedder {
    /// Loads (and on first use downloads) the model. Call once at start-up.
    pub fn load() -> Result<Self, EmbeddingError> {
        let model = TextEmbedding::try_new(InitOptions::new(EmbeddingModel::AllMiniLML6V2))
            .map_err(|e| EmbeddingError::Model(e.to_string()))?;
        Ok(Self {
            model: Arc::new(Mutex::new(model)),
        })
    }
}

#[async_trait]
impl TextEmbedder for FastEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let model = Arc::clone(&self.model);
        let text = text.to_string();
        tokio::task::spawn_blocking(move || {
            let mut model = model
                .lock()
                .map_err(|_| EmbeddingError::Model("embedding model mutex poisoned".into()))?;
            model
                .embed(vec![text], None)
                .map_err(|e| EmbeddingError::Model(e.to_string()))?
                .into_iter()
                .next()
                .ok_or(EmbeddingError::Empty)
        })
        .await
        .map_err(|e| EmbeddingError::Task(e.to_string()))?
    }
}

pub struct EmbeddingScorer {
    embedder: Arc<dyn TextEmbedder>,
}

impl EmbeddingScorer {
    pub fn new(embedder: Arc<dyn TextEmbedder>) -> Self {
        Self { embedder }
    }
}

#[async_trait]
impl ResumeScorer for EmbeddingScorer {
    async fn score(
        &self,
        resume_text: &str,
        weights: &CategoryWeights,
        keywords: &CategoryKeywords,
    ) -> Result<ScoreBreakdown, ScoringError> {
        let mut per_category = BTreeMap::new();
        let mut total = 0.0;

        let scored: Vec<_> = weights
            .iter()
            .filter_map(|(category, weight)| match keywords.get(category.as_str()) {
                Some(texts) if !texts.is_empty() => Some((category, weight, texts)),
                _ => None,
            })
            .collect();
        if scored.is_empty() {
            return Ok(ScoreBreakdown {
                total,
                per_category,
            });
        }

        let resume_vec = self.embedder.embed(resume_text).await?;

        for (category, weight, texts) in scored {
            let combined = texts.join(" ");
            let category_vec = self.embedder.embed(&combined).await?;

            let similarity = cosine_similarity(&category_vec, &resume_vec).max(0.0);
            let contribution = similarity * weight;
            debug!("cosine score: {category} similarity={similarity:.4} weight={weight}");

            per_category.insert(*category, contribution);
            total += contribution;
        }

        Ok(ScoreBreakdown {
            total,
            per_category,
        })
    }
}

/// Raw cosine similarity in [-1, 1]. Mismatched dimensions or zero vectors give 0.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() {
        warn!(
            a_len = a.len(),
            b_len = b.len(),
            "embedding dimension mismatch; returning zero similarity"
        );
        return 0.0;
    }

    let dot: f64 = a.iter().zip(b).map(|(x, y)| *x as f64 * *y as f64).sum();
    let norm_a: f64 = a.iter().map(|x| (*x as f64).powi(2)).sum::<f64>().sqrt();
    let norm_b: f64 = b.iter().map(|x| (*x as f64).powi(2)).sum::<f64>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    (dot / (norm_a * norm_b)).clamp(-1.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ranking::weights::{default_weights, Category};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Maps known texts to fixed vectors and counts calls.
    struct TableEmbedder {
        table: Vec<(&'static str, Vec<f32>)>,
        calls: AtomicUsize,
    }

    impl TableEmbedder {
        fn new(table: Vec<(&'static str, Vec<f32>)>) -> Self {
            Self {
                table,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl TextEmbedder for TableEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self
                .table
                .iter()
                .find(|(t, _)| *t == text)
                .map(|(_, v)| v.clone())
                .unwrap_or_else(|| vec![0.5, 0.5]))
        }
    }

    struct BrokenEmbedder;

    #[async_trait]
    impl TextEmbedder for BrokenEmbedder {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>, EmbeddingError> {
            Err(EmbeddingError::Model("onnx session gone".into()))
        }
    }

    fn keywords(pairs: &[(&str, &[&str])]) -> CategoryKeywords {
        pairs
            .iter()
            .map(|(c, kws)| (c.to_string(), kws.iter().map(|k| k.to_string()).collect()))
            .collect()
    }

    #[test]
    fn test_cosine_identical_vectors_is_one() {
        let sim = cosine_similarity(&[1.0, 2.0, 3.0], &[1.0, 2.0, 3.0]);
        assert!((sim - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_cosine_opposite_vectors_is_minus_one() {
        let sim = cosine_similarity(&[1.0, 0.0], &[-1.0, 0.0]);
        assert!((sim + 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_cosine_zero_and_mismatched_vectors() {
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
        assert_eq!(cosine_similarity(&[1.0, 0.0, 0.0], &[1.0, 0.0]), 0.0);
    }

    #[tokio::test]
    async fn test_resume_is_embedded_once_per_call() {
        let embedder = Arc::new(TableEmbedder::new(vec![]));
        let scorer = EmbeddingScorer::new(embedder.clone());
        let kws = keywords(&[
            ("skills", &["rust", "go"]),
            ("education", &["bsc"]),
            ("projects", &["compiler"]),
        ]);

        scorer.score("resume", &default_weights(), &kws).await.unwrap();

        // 1 resume + 3 categories with data
        assert_eq!(embedder.calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_negative_similarity_is_clamped_to_zero() {
        let embedder = Arc::new(TableEmbedder::new(vec![
            ("resume", vec![1.0, 0.0]),
            ("cobol mainframe", vec![-1.0, 0.0]),
        ]));
        let scorer = EmbeddingScorer::new(embedder);
        let weights = CategoryWeights::from([(Category::Skills, 1.0)]);
        let kws = keywords(&[("skills", &["cobol", "mainframe"])]);

        let breakdown = scorer.score("resume", &weights, &kws).await.unwrap();
        assert_eq!(breakdown.total, 0.0);
        assert_eq!(breakdown.per_category[&Category::Skills], 0.0);
    }

    #[tokio::test]
    async fn test_categories_without_data_are_skipped() {
        let embedder = Arc::new(TableEmbedder::new(vec![
            ("resume", vec![1.0, 0.0]),
            ("rust", vec![1.0, 0.0]),
        ]));
        let scorer = EmbeddingScorer::new(embedder);
        let weights = CategoryWeights::from([
            (Category::Skills, 0.4),
            (Category::Projects, 0.6),
            (Category::Education, 0.2),
        ]);
        let kws = keywords(&[("skills", &["rust"]), ("education", &[])]);

        let breakdown = scorer.score("resume", &weights, &kws).await.unwrap();
        assert!((breakdown.total - 0.4).abs() < 1e-9);
        assert_eq!(breakdown.per_category.len(), 1);
        assert!(!breakdown.per_category.contains_key(&Category::Projects));
    }

    #[tokio::test]
    async fn test_score_bounded_by_weights_with_data() {
        let embedder = Arc::new(TableEmbedder::new(vec![
            ("resume", vec![0.9, 0.1, 0.3]),
            ("rust tokio", vec![0.8, 0.2, 0.1]),
            ("bsc", vec![0.1, 0.9, 0.0]),
        ]));
        let scorer = EmbeddingScorer::new(embedder);
        let weights = default_weights();
        let kws = keywords(&[("skills", &["rust", "tokio"]), ("education", &["bsc"])]);

        let breakdown = scorer.score("resume", &weights, &kws).await.unwrap();
        let bound = weights[&Category::Skills] + weights[&Category::Education];
        assert!(breakdown.total >= 0.0);
        assert!(breakdown.total <= bound + 1e-9);
    }

    #[tokio::test]
    async fn test_no_keyword_data_makes_no_model_calls() {
        let embedder = Arc::new(TableEmbedder::new(vec![]));
        let scorer = EmbeddingScorer::new(embedder.clone());

        let breakdown = scorer
            .score("resume", &default_weights(), &CategoryKeywords::new())
            .await
            .unwrap();

        assert_eq!(breakdown.total, 0.0);
        assert_eq!(embedder.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_embedder_failure_is_a_scoring_error() {
        let scorer = EmbeddingScorer::new(Arc::new(BrokenEmbedder));
        let kws = keywords(&[("skills", &["rust"])]);

        let err = scorer
            .score("resume", &default_weights(), &kws)
            .await
            .unwrap_err();
        assert!(matches!(err, ScoringError::Embedding(_)));
    }
}
