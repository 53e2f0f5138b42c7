//! Job-description ingestion: model-driven keyword extraction into the category
//! store.
//!
//! Extraction never fails the upload. After the retry budget is spent the result is
//! an empty tag set, which leaves the store untouched.

use std::sync::Arc;

use serde::{Deserialize, Deserializer, Serialize};
use tracing::{info, warn};

use crate::jd::prompts::{TAG_EXTRACTION_PROMPT_TEMPLATE, TAG_EXTRACTION_ROLE};
use crate::jd::tags::{CategoryTagStore, TagStoreError, JOB_REQUIREMENTS};
use crate::llm_client::prompts::json_system;
use crate::llm_client::retry::RetryPolicy;
use crate::llm_client::{parse_json, Completion, CompletionModel};
use crate::ranking::weights::Category;

/// Keywords extracted from one job description, per category, plus hard requirements.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobDescriptionTags {
    #[serde(default, deserialize_with = "string_or_list")]
    pub education: Vec<String>,
    #[serde(default, deserialize_with = "string_or_list")]
    pub work_experience: Vec<String>,
    #[serde(default, deserialize_with = "string_or_list")]
    pub skills: Vec<String>,
    #[serde(default, deserialize_with = "string_or_list")]
    pub certifications: Vec<String>,
    #[serde(default, deserialize_with = "string_or_list")]
    pub projects: Vec<String>,
    #[serde(default, deserialize_with = "string_or_list")]
    pub additional_info: Vec<String>,
    #[serde(default, deserialize_with = "string_or_list")]
    pub job_requirements: Vec<String>,
}

impl JobDescriptionTags {
    /// `(store category, tags)` pairs, weighted categories first.
    pub fn by_category(&self) -> [(&'static str, &[String]); 7] {
        [
            (Category::Education.as_str(), self.education.as_slice()),
            (Category::WorkExperience.as_str(), self.work_experience.as_slice()),
            (Category::Skills.as_str(), self.skills.as_slice()),
            (Category::Certifications.as_str(), self.certifications.as_slice()),
            (Category::Projects.as_str(), self.projects.as_slice()),
            (Category::AdditionalInfo.as_str(), self.additional_info.as_slice()),
            (JOB_REQUIREMENTS, self.job_requirements.as_slice()),
        ]
    }

    pub fn is_empty(&self) -> bool {
        self.by_category().iter().all(|(_, tags)| tags.is_empty())
    }

    pub fn len(&self) -> usize {
        self.by_category().iter().map(|(_, tags)| tags.len()).sum()
    }
}

/// Models sometimes answer a category with one comma-separated string, or `null`.
fn string_or_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Field {
        List(Vec<String>),
        Text(String),
        Null,
    }

    Ok(match Field::deserialize(deserializer)? {
        Field::List(list) => list,
        Field::Text(text) => text
            .split(',')
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect(),
        Field::Null => Vec::new(),
    })
}

pub struct TagExtractor {
    model: Arc<dyn CompletionModel>,
    retry: RetryPolicy,
}

impl TagExtractor {
    pub fn new(model: Arc<dyn CompletionModel>, retry: RetryPolicy) -> Self {
        Self { model, retry }
    }

    /// Extracts tags from `jd_text`; an empty set when the model never answers usefully.
    pub async fn extract(&self, jd_text: &str) -> JobDescriptionTags {
        let system = json_system(TAG_EXTRACTION_ROLE);
        let prompt = TAG_EXTRACTION_PROMPT_TEMPLATE.replace("{jd_text}", jd_text);
        let (system, prompt) = (system.as_str(), prompt.as_str());
        let model = &self.model;

        let result = self
            .retry
            .run("JD tag extraction", move || async move {
                let text = model
                    .complete(Completion::new(system, prompt).temperature(0.2).json())
                    .await?;
                parse_json::<JobDescriptionTags>(&text)
            })
            .await;

        match result {
            Ok(tags) => tags,
            Err(_) => {
                warn!("JD tag extraction degraded to an empty tag set");
                JobDescriptionTags::default()
            }
        }
    }

    /// Extracts tags from `jd_text` and merges them into `store`.
    pub async fn ingest(
        &self,
        store: &dyn CategoryTagStore,
        jd_text: &str,
    ) -> Result<JobDescriptionTags, TagStoreError> {
        let tags = self.extract(jd_text).await;
        for (category, list) in tags.by_category() {
            if !list.is_empty() {
                store.add_tags_unique(category, list).await?;
            }
        }
        info!("Ingested {} JD tags", tags.len());
        Ok(tags)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jd::tags::InMemoryTagStore;
    use crate::llm_client::LlmError;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct Scripted {
        reply: Option<&'static str>,
        calls: AtomicUsize,
    }

    #[async_trait::async_trait]
    impl CompletionModel for Scripted {
        async fn complete(&self, request: Completion<'_>) -> Result<String, LlmError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            assert_eq!(request.temperature, Some(0.2));
            assert!(request.json);
            self.reply
                .map(str::to_string)
                .ok_or(LlmError::EmptyContent)
        }
    }

    fn extractor(reply: Option<&'static str>) -> (TagExtractor, Arc<Scripted>) {
        let model = Arc::new(Scripted {
            reply,
            calls: AtomicUsize::new(0),
        });
        let retry = RetryPolicy::new(3, Duration::from_secs(2));
        (TagExtractor::new(model.clone(), retry), model)
    }

    const REPLY: &str = r#"{
        "education": ["BSc"],
        "work_experience": ["Backend_Development"],
        "skills": ["Rust", "Kafka"],
        "certifications": [],
        "projects": null,
        "additional_info": "remote, english",
        "job_requirements": ["5 years experience"]
    }"#;

    #[test]
    fn test_string_categories_are_split() {
        let tags: JobDescriptionTags = serde_json::from_str(REPLY).unwrap();
        assert_eq!(tags.additional_info, vec!["remote", "english"]);
        assert!(tags.projects.is_empty());
        assert_eq!(tags.len(), 7);
    }

    #[tokio::test]
    async fn test_ingest_merges_normalized_tags() {
        let (extractor, _) = extractor(Some(REPLY));
        let store = InMemoryTagStore::new();

        extractor.ingest(&store, "We need a Rust engineer").await.unwrap();

        let all = store.get_all().await.unwrap();
        assert_eq!(all["skills"], vec!["rust", "kafka"]);
        assert_eq!(all["work_experience"], vec!["backend development"]);
        assert_eq!(all[JOB_REQUIREMENTS], vec!["5 years experience"]);
        assert!(!all.contains_key("projects"));
    }

    #[tokio::test]
    async fn test_ingest_twice_is_idempotent() {
        let (extractor, _) = extractor(Some(REPLY));
        let store = InMemoryTagStore::new();

        extractor.ingest(&store, "jd").await.unwrap();
        let first = store.get_all().await.unwrap();
        extractor.ingest(&store, "jd").await.unwrap();

        assert_eq!(store.get_all().await.unwrap(), first);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_degrades_to_empty_after_retries() {
        let (extractor, model) = extractor(None);
        let store = InMemoryTagStore::new();

        let tags = extractor.ingest(&store, "jd").await.unwrap();

        assert!(tags.is_empty());
        assert_eq!(model.calls.load(Ordering::SeqCst), 3);
        assert!(store.get_all().await.unwrap().is_empty());
    }
}
