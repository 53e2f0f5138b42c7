use std::sync::Arc;

use crate::config::Config;
use crate::jd::extract::TagExtractor;
use crate::jd::tags::CategoryTagStore;
use crate::ranking::orchestrator::RankingOrchestrator;
use crate::ranking::weights::WeightConfig;
use crate::resumes::extract::TextExtractor;
use crate::resumes::store::DocumentStore;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    /// Uploaded resumes, listed in name order when ranking.
    pub resumes: Arc<dyn DocumentStore>,
    /// Uploaded job-description files, kept for reference after tagging.
    pub job_documents: Arc<dyn DocumentStore>,
    pub extractor: Arc<dyn TextExtractor>,
    pub tags: Arc<dyn CategoryTagStore>,
    pub tag_extractor: Arc<TagExtractor>,
    pub weights: WeightConfig,
    pub ranker: RankingOrchestrator,
}
