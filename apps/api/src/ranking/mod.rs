// Resume scoring and ranking.
// Keyword and cosine scorers share the `ResumeScorer` trait; the orchestrator picks one
// per request and never calls the model endpoint directly.

pub mod embedding;
pub mod handlers;
pub mod keyword;
pub mod normalize;
pub mod orchestrator;
pub mod weights;

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::jd::tags::CategoryKeywords;
use crate::ranking::embedding::EmbeddingError;
use crate::ranking::weights::{Category, CategoryWeights};

/// Weighted total plus each category's contribution to it.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ScoreBreakdown {
    pub total: f64,
    pub per_category: BTreeMap<Category, f64>,
}

#[derive(Debug, Error)]
pub enum ScoringError {
    #[error(transparent)]
    Embedding(#[from] EmbeddingError),
}

/// The scorer trait. Implement this to add a criterion without touching the orchestrator.
#[async_trait]
pub trait ResumeScorer: Send + Sync {
    async fn score(
        &self,
        resume_text: &str,
        weights: &CategoryWeights,
        keywords: &CategoryKeywords,
    ) -> Result<ScoreBreakdown, ScoringError>;
}

/// Scoring method selected per request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Criteria {
    Keyword,
    Cosine,
}

#[derive(Debug, Error)]
#[error("Invalid criteria '{0}'. Choose 'keyword' or 'cosine'.")]
pub struct InvalidCriteria(pub String);

impl FromStr for Criteria {
    type Err = InvalidCriteria;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "keyword" => Ok(Criteria::Keyword),
            "cosine" => Ok(Criteria::Cosine),
            _ => Err(InvalidCriteria(s.to_string())),
        }
    }
}

impl fmt::Display for Criteria {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Criteria::Keyword => f.write_str("keyword"),
            Criteria::Cosine => f.write_str("cosine"),
        }
    }
}
