//! Fitness gate: a yes/no screen of one resume against the job description.
//!
//! The gate never fails the ranking run. When the model cannot be reached, keeps
//! returning malformed JSON, or the prompt cannot be summarized below the threshold,
//! the gate answers with a degraded "not fit" assessment instead.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::jd::tags::{CategoryKeywords, JOB_REQUIREMENTS};
use crate::llm_client::prompts::json_system;
use crate::llm_client::retry::RetryPolicy;
use crate::llm_client::{parse_json, Completion, CompletionModel};
use crate::screening::prompts::{assessment_prompt, ASSESSMENT_ROLE};
use crate::screening::summarize::{Summarizer, SUMMARY_FAILED};

/// Reasoning text attached to a degraded assessment.
pub const ASSESSMENT_FAILED: &str = "Candidate assessment could not be completed due to an error.";

/// Key used when the model answers with a single reasoning string.
const SUMMARY_KEY: &str = "summary";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitnessAssessment {
    pub is_fit: bool,
    /// Category → why the candidate does not meet it. Free-form model text.
    pub reasoning: BTreeMap<String, String>,
    /// `true` when the model was not consulted successfully.
    #[serde(default)]
    pub degraded: bool,
}

impl FitnessAssessment {
    pub fn degraded(reason: &str) -> Self {
        Self {
            is_fit: false,
            reasoning: BTreeMap::from([("error".to_string(), reason.to_string())]),
            degraded: true,
        }
    }
}

#[async_trait]
pub trait FitnessGate: Send + Sync {
    async fn assess(&self, job: &CategoryKeywords, resume_text: &str) -> FitnessAssessment;
}

/// Shape the model is asked to produce. `reasoning` may come back as an object or a
/// plain string, so both are accepted.
#[derive(Debug, Deserialize)]
struct ModelVerdict {
    is_fit: bool,
    #[serde(default)]
    reasoning: Reasoning,
}

#[derive(Debug, Default, Deserialize)]
#[serde(untagged)]
enum Reasoning {
    PerCategory(BTreeMap<String, serde_json::Value>),
    Summary(String),
    #[default]
    Missing,
}

impl From<ModelVerdict> for FitnessAssessment {
    fn from(verdict: ModelVerdict) -> Self {
        let reasoning = match verdict.reasoning {
            Reasoning::PerCategory(map) => map
                .into_iter()
                .map(|(category, value)| {
                    let text = match value {
                        serde_json::Value::String(s) => s,
                        other => other.to_string(),
                    };
                    (category, text)
                })
                .collect(),
            Reasoning::Summary(text) => BTreeMap::from([(SUMMARY_KEY.to_string(), text)]),
            Reasoning::Missing => BTreeMap::new(),
        };
        Self {
            is_fit: verdict.is_fit,
            reasoning,
            degraded: false,
        }
    }
}

pub struct LlmFitnessGate {
    model: Arc<dyn CompletionModel>,
    summarizer: Summarizer,
    retry: RetryPolicy,
}

impl LlmFitnessGate {
    pub fn new(model: Arc<dyn CompletionModel>, summarizer: Summarizer, retry: RetryPolicy) -> Self {
        Self {
            model,
            summarizer,
            retry,
        }
    }
}

/// Builds the assessment payload. Hard requirements travel in their own labelled
/// field and are left out of the category map.
pub fn build_assessment_payload(job: &CategoryKeywords, resume_text: &str) -> String {
    let requirements = job
        .get(JOB_REQUIREMENTS)
        .map(|reqs| reqs.join("; "))
        .unwrap_or_default();
    let categories: BTreeMap<&str, &Vec<String>> = job
        .iter()
        .filter(|(category, _)| category.as_str() != JOB_REQUIREMENTS)
        .map(|(category, tags)| (category.as_str(), tags))
        .collect();
    let categories = serde_json::to_string(&categories).unwrap_or_default();

    assessment_prompt(&requirements, &categories, resume_text)
}

#[async_trait]
impl FitnessGate for LlmFitnessGate {
    async fn assess(&self, job: &CategoryKeywords, resume_text: &str) -> FitnessAssessment {
        let payload = build_assessment_payload(job, resume_text);

        let payload = match self.summarizer.reduce(&payload).await {
            Ok(reduced) => reduced,
            Err(e) => {
                warn!("Fitness prompt could not be reduced: {e}");
                return FitnessAssessment::degraded(SUMMARY_FAILED);
            }
        };

        let system = json_system(ASSESSMENT_ROLE);
        let system = system.as_str();
        let prompt = payload.as_str();
        let model = &self.model;

        let verdict = self
            .retry
            .run("fitness assessment", move || async move {
                let text = model
                    .complete(Completion::new(system, prompt).temperature(0.0).json())
                    .await?;
                parse_json::<ModelVerdict>(&text)
            })
            .await;

        match verdict {
            Ok(verdict) => {
                let assessment = FitnessAssessment::from(verdict);
                info!(
                    "Fitness assessment: is_fit={} ({} categories flagged)",
                    assessment.is_fit,
                    assessment.reasoning.len()
                );
                assessment
            }
            Err(_) => FitnessAssessment::degraded(ASSESSMENT_FAILED),
        }
    }
}
