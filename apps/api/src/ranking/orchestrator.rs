//! Ranking orchestrator: text extraction, the optional fitness gate and the selected
//! scorer, run for a batch of resumes with bounded concurrency.
//!
//! One tag snapshot is taken per call and shared by every resume in the batch. Results
//! come back in input order with exactly one entry per requested resume; a failure in
//! one resume (extraction, scoring, even a panic) never affects the others.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::task::{AbortHandle, JoinHandle};
use tokio::time::Instant;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::jd::tags::{CategoryKeywords, CategoryTagStore, TagStoreError};
use crate::ranking::weights::{Category, CategoryWeights};
use crate::ranking::{Criteria, ResumeScorer};
use crate::resumes::ResumeTextSource;
use crate::screening::fitness::FitnessGate;

/// Score given to candidates the fitness gate rejects. Keeps them visible but ranked
/// below any candidate with real keyword or semantic signal above 0.1.
pub const NOT_FIT_SCORE: f64 = 0.1;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    Scored {
        breakdown: BTreeMap<Category, f64>,
    },
    NotFit {
        reasoning: BTreeMap<String, String>,
        degraded: bool,
    },
    Failed {
        error: String,
    },
    /// The run deadline passed before this resume finished.
    NotProcessed,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreEntry {
    pub resume: String,
    pub score: f64,
    #[serde(flatten)]
    pub outcome: Outcome,
}

impl ScoreEntry {
    fn failed(resume: String, error: String) -> Self {
        Self {
            resume,
            score: 0.0,
            outcome: Outcome::Failed { error },
        }
    }

    fn not_processed(resume: String) -> Self {
        Self {
            resume,
            score: 0.0,
            outcome: Outcome::NotProcessed,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RankRequest {
    pub resumes: Vec<String>,
    pub weights: CategoryWeights,
    pub include_fitness_gate: bool,
    pub criteria: Criteria,
}

#[derive(Debug, Error)]
pub enum RankError {
    #[error("No resumes uploaded")]
    EmptyBatch,

    #[error(transparent)]
    TagStore(#[from] TagStoreError),
}

#[derive(Debug, Clone, Copy)]
pub struct RankOptions {
    /// Resumes processed at once.
    pub concurrency: usize,
    /// Wall-clock budget for the whole batch. Unfinished resumes become `not_processed`.
    pub deadline: Option<Duration>,
}

impl Default for RankOptions {
    fn default() -> Self {
        Self {
            concurrency: 4,
            deadline: None,
        }
    }
}

struct AbortOnDrop(Vec<AbortHandle>);

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        for handle in &self.0 {
            handle.abort();
        }
    }
}

#[derive(Clone)]
pub struct RankingOrchestrator {
    texts: Arc<dyn ResumeTextSource>,
    tags: Arc<dyn CategoryTagStore>,
    gate: Arc<dyn FitnessGate>,
    keyword: Arc<dyn ResumeScorer>,
    cosine: Arc<dyn ResumeScorer>,
    options: RankOptions,
}

impl RankingOrchestrator {
    pub fn new(
        texts: Arc<dyn ResumeTextSource>,
        tags: Arc<dyn CategoryTagStore>,
        gate: Arc<dyn FitnessGate>,
        keyword: Arc<dyn ResumeScorer>,
        cosine: Arc<dyn ResumeScorer>,
    ) -> Self {
        Self {
            texts,
            tags,
            gate,
            keyword,
            cosine,
            options: RankOptions::default(),
        }
    }

    pub fn with_options(mut self, options: RankOptions) -> Self {
        self.options = options;
        self
    }

    pub async fn rank(&self, request: RankRequest) -> Result<Vec<ScoreEntry>, RankError> {
        if request.resumes.is_empty() {
            return Err(RankError::EmptyBatch);
        }

        let run_id = Uuid::new_v4();
        let keywords = Arc::new(self.tags.get_all().await?);
        let weights = Arc::new(request.weights);
        let permits = Arc::new(Semaphore::new(self.options.concurrency.max(1)));
        let deadline = self.options.deadline.map(|budget| Instant::now() + budget);

        info!(
            %run_id,
            resumes = request.resumes.len(),
            criteria = %request.criteria,
            fitness_gate = request.include_fitness_gate,
            "Ranking started"
        );

        let handles: Vec<_> = request
            .resumes
            .iter()
            .map(|resume| {
                let this = self.clone();
                let resume = resume.clone();
                let keywords = Arc::clone(&keywords);
                let weights = Arc::clone(&weights);
                let permits = Arc::clone(&permits);
                let criteria = request.criteria;
                let gate = request.include_fitness_gate;
                tokio::spawn(async move {
                    // The semaphore is never closed.
                    let _permit = permits.acquire_owned().await.ok();
                    this.rank_one(resume, &weights, &keywords, gate, criteria)
                        .await
                })
            })
            .collect();
        // Dropping `rank` mid-batch aborts every task still queued or running.
        let _abort = AbortOnDrop(handles.iter().map(JoinHandle::abort_handle).collect());

        let mut results = Vec::with_capacity(handles.len());
        for (resume, mut handle) in request.resumes.into_iter().zip(handles) {
            let joined = match deadline {
                Some(at) => match tokio::time::timeout_at(at, &mut handle).await {
                    Ok(joined) => joined,
                    Err(_) => {
                        handle.abort();
                        warn!(%run_id, "Deadline passed before {resume} was ranked");
                        results.push(ScoreEntry::not_processed(resume));
                        continue;
                    }
                },
                None => handle.await,
            };

            results.push(match joined {
                Ok(entry) => entry,
                Err(e) => {
                    error!(%run_id, "Ranking task for {resume} aborted: {e}");
                    ScoreEntry::failed(resume, format!("ranking task aborted: {e}"))
                }
            });
        }

        let count = |status: fn(&Outcome) -> bool| {
            results.iter().filter(|e| status(&e.outcome)).count()
        };
        info!(
            %run_id,
            scored = count(|o| matches!(o, Outcome::Scored { .. })),
            not_fit = count(|o| matches!(o, Outcome::NotFit { .. })),
            failed = count(|o| matches!(o, Outcome::Failed { .. })),
            not_processed = count(|o| matches!(o, Outcome::NotProcessed)),
            "Ranking finished"
        );
        Ok(results)
    }

    async fn rank_one(
        &self,
        resume: String,
        weights: &CategoryWeights,
        keywords: &CategoryKeywords,
        include_fitness_gate: bool,
        criteria: Criteria,
    ) -> ScoreEntry {
        let text = match self.texts.text_for(&resume).await {
            Ok(text) => text,
            Err(e) => {
                warn!("Could not read {resume}: {e}");
                return ScoreEntry::failed(resume, e.to_string());
            }
        };

        if include_fitness_gate {
            let assessment = self.gate.assess(keywords, &text).await;
            if !assessment.is_fit {
                warn!(
                    "{resume} screened out{}",
                    if assessment.degraded { " (assessment degraded)" } else { "" }
                );
                return ScoreEntry {
                    resume,
                    score: NOT_FIT_SCORE,
                    outcome: Outcome::NotFit {
                        reasoning: assessment.reasoning,
                        degraded: assessment.degraded,
                    },
                };
            }
        }

        let scorer = match criteria {
            Criteria::Keyword => &self.keyword,
            Criteria::Cosine => &self.cosine,
        };
        match scorer.score(&text, weights, keywords).await {
            Ok(breakdown) => ScoreEntry {
                resume,
                score: breakdown.total,
                outcome: Outcome::Scored {
                    breakdown: breakdown.per_category,
                },
            },
            Err(e) => {
                warn!("Scoring {resume} failed: {e}");
                ScoreEntry::failed(resume, e.to_string())
            }
        }
    }
}
