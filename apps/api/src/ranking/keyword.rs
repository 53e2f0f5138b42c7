//! Keyword scorer: binary per-category match, weighted sum.
//!
//! A category contributes its full weight when ANY of its keywords appears in the
//! normalized resume as a whole word (case-insensitive), otherwise nothing. The number
//! of matches within a category never changes its contribution.

use std::collections::BTreeMap;

use async_trait::async_trait;
use regex::Regex;
use tracing::debug;

use crate::jd::tags::CategoryKeywords;
use crate::ranking::normalize::normalize;
use crate::ranking::weights::CategoryWeights;
use crate::ranking::{ResumeScorer, ScoreBreakdown, ScoringError};

#[derive(Debug, Default, Clone, Copy)]
pub struct KeywordScorer;

#[async_trait]
impl ResumeScorer for KeywordScorer {
    async fn score(
        &self,
        resume_text: &str,
        weights: &CategoryWeights,
        keywords: &CategoryKeywords,
    ) -> Result<ScoreBreakdown, ScoringError> {
        Ok(score_normalized(&normalize(resume_text), weights, keywords))
    }
}

/// Scores already-normalized text. Every weighted category appears in the breakdown,
/// including the ones that contributed 0.
pub fn score_normalized(
    normalized: &str,
    weights: &CategoryWeights,
    keywords: &CategoryKeywords,
) -> ScoreBreakdown {
    let mut per_category = BTreeMap::new();
    let mut total = 0.0;

    for (category, weight) in weights {
        let list = keywords
            .get(category.as_str())
            .map(Vec::as_slice)
            .unwrap_or_default();
        let indicator = if list.iter().any(|kw| keyword_matches(normalized, kw)) {
            1.0
        } else {
            0.0
        };
        let contribution = weight * indicator;
        debug!("keyword score: {category} matched={} weight={weight}", indicator > 0.0);
        per_category.insert(*category, contribution);
        total += contribution;
    }

    ScoreBreakdown {
        total,
        per_category,
    }
}

/// Whole-word, case-insensitive match of `keyword` inside `text`.
///
/// Word boundaries are only asserted on sides where the keyword itself starts/ends with
/// a word character, so "c++" and ".net" still match as standalone tokens.
pub fn keyword_matches(text: &str, keyword: &str) -> bool {
    // Same token trimming as the resume text, so "ph.d." meets "ph.d".
    let keyword = normalize(keyword);
    if keyword.is_empty() {
        return false;
    }
    match boundary_pattern(&keyword) {
        Ok(re) => re.is_match(text),
        Err(_) => text.to_lowercase().contains(&keyword),
    }
}

fn boundary_pattern(keyword: &str) -> Result<Regex, regex::Error> {
    let is_word = |c: Option<char>| c.is_some_and(|c| c.is_alphanumeric() || c == '_');
    let left = if is_word(keyword.chars().next()) {
        r"\b"
    } else {
        r"(?:^|[^\w])"
    };
    let right = if is_word(keyword.chars().last()) {
        r"\b"
    } else {
        r"(?:$|[^\w])"
    };
    Regex::new(&format!("(?i){left}{}{right}", regex::escape(keyword)))
}
