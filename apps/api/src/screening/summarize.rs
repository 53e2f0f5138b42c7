//! Summarization reduction: shrinks over-long model input before the fitness call.
//!
//! While the text is longer than the threshold it is split into overlapping line
//! blocks, each block is summarized by the fast model, and the partial summaries are
//! concatenated. Every pass must strictly shrink the text and the number of passes is
//! capped, so the loop always terminates.

use std::sync::Arc;

use thiserror::Error;
use tracing::debug;

use crate::llm_client::retry::RetryPolicy;
use crate::llm_client::{Completion, CompletionModel, LlmError, ModelTier};
use crate::screening::prompts::SUMMARIZE_SYSTEM;

/// Text reported in place of a summary when reduction fails.
pub const SUMMARY_FAILED: &str = "Summary could not be completed due to an error.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SummarizerSettings {
    /// Length (in characters) at or below which text is passed through untouched.
    pub threshold_chars: usize,
    pub block_lines: usize,
    pub overlap_lines: usize,
    pub max_passes: usize,
    pub max_tokens: u32,
}

impl Default for SummarizerSettings {
    fn default() -> Self {
        Self {
            threshold_chars: 4096,
            block_lines: 1500,
            overlap_lines: 300,
            max_passes: 8,
            max_tokens: 500,
        }
    }
}

#[derive(Debug, Error)]
pub enum SummarizeError {
    #[error("summarization call failed: {0}")]
    Model(#[from] LlmError),

    #[error("summarization did not shrink the text ({before} -> {after} chars)")]
    NoProgress { before: usize, after: usize },

    #[error("text still {remaining} chars after {passes} summarization passes")]
    PassLimit { passes: usize, remaining: usize },
}

pub struct Summarizer {
    model: Arc<dyn CompletionModel>,
    retry: RetryPolicy,
    settings: SummarizerSettings,
}

impl Summarizer {
    pub fn new(
        model: Arc<dyn CompletionModel>,
        retry: RetryPolicy,
        settings: SummarizerSettings,
    ) -> Self {
        Self {
            model,
            retry,
            settings,
        }
    }

    /// Returns `text` unchanged when short enough, otherwise a summary no longer than
    /// the threshold.
    pub async fn reduce(&self, text: &str) -> Result<String, SummarizeError> {
        let threshold = self.settings.threshold_chars;
        let mut text = text.to_string();
        let mut passes = 0;

        while char_len(&text) > threshold {
            if passes == self.settings.max_passes {
                return Err(SummarizeError::PassLimit {
                    passes,
                    remaining: char_len(&text),
                });
            }
            passes += 1;

            let blocks =
                overlapping_blocks(&text, self.settings.block_lines, self.settings.overlap_lines);
            let mut summary = String::new();
            for block in &blocks {
                let part = self.summarize_block(block).await?;
                summary.push('\n');
                summary.push_str(part.trim());
            }
            let summary = summary.trim().to_string();

            let (before, after) = (char_len(&text), char_len(&summary));
            if after >= before {
                return Err(SummarizeError::NoProgress { before, after });
            }
            debug!(
                "summarization pass {passes}: {} blocks, {before} -> {after} chars",
                blocks.len()
            );
            text = summary;
        }

        Ok(text)
    }

    async fn summarize_block(&self, block: &str) -> Result<String, LlmError> {
        let model = &self.model;
        let max_tokens = self.settings.max_tokens;
        self.retry
            .run("summarization", move || async move {
                model
                    .complete(
                        Completion::new(SUMMARIZE_SYSTEM, block)
                            .tier(ModelTier::Fast)
                            .temperature(0.0)
                            .max_tokens(max_tokens),
                    )
                    .await
            })
            .await
    }
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// Splits `text` into blocks of `block_lines` lines where consecutive blocks share
/// `overlap_lines` lines. The last block always reaches the end of the text.
pub fn overlapping_blocks(text: &str, block_lines: usize, overlap_lines: usize) -> Vec<String> {
    let lines: Vec<&str> = text.split('\n').collect();
    let block = block_lines.max(1);
    let step = block.saturating_sub(overlap_lines).max(1);

    let mut blocks = Vec::new();
    let mut start = 0;
    while start < lines.len() {
        let end = (start + block).min(lines.len());
        blocks.push(lines[start..end].join("\n"));
        if end == lines.len() {
            break;
        }
        start += step;
    }
    blocks
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Answers every block with its first `keep` characters.
    struct Truncating {
        keep: usize,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl CompletionModel for Truncating {
        async fn complete(&self, request: Completion<'_>) -> Result<String, LlmError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            assert_eq!(request.tier, ModelTier::Fast);
            Ok(request.prompt.chars().take(self.keep).collect())
        }
    }

    /// Echoes the block back unchanged.
    struct Echo;

    #[async_trait]
    impl CompletionModel for Echo {
        async fn complete(&self, request: Completion<'_>) -> Result<String, LlmError> {
            Ok(format!("{} and more", request.prompt))
        }
    }

    struct Down {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl CompletionModel for Down {
        async fn complete(&self, _request: Completion<'_>) -> Result<String, LlmError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(LlmError::EmptyContent)
        }
    }

    fn policy() -> RetryPolicy {
        RetryPolicy::new(3, Duration::from_secs(2))
    }

    fn synthetic(len: usize) -> String {
        // 100-char lines
        let line = "x".repeat(99);
        let mut text = String::new();
        while text.len() < len {
            text.push_str(&line);
            text.push('\n');
        }
        text.truncate(len);
        text
    }

    #[test]
    fn test_blocks_overlap_and_cover_text() {
        let text = (0..10).map(|i| i.to_string()).collect::<Vec<_>>().join("\n");
        let blocks = overlapping_blocks(&text, 4, 1);
        assert_eq!(blocks, vec!["0\n1\n2\n3", "3\n4\n5\n6", "6\n7\n8\n9"]);
    }

    #[test]
    fn test_blocks_single_block_when_short() {
        assert_eq!(overlapping_blocks("a\nb", 1500, 300), vec!["a\nb"]);
    }

    #[test]
    fn test_blocks_overlap_not_smaller_than_block_still_advances() {
        let blocks = overlapping_blocks("a\nb\nc", 2, 5);
        assert_eq!(blocks, vec!["a\nb", "b\nc"]);
    }

    #[tokio::test]
    async fn test_short_text_is_untouched_and_makes_no_calls() {
        let model = Arc::new(Truncating {
            keep: 10,
            calls: AtomicUsize::new(0),
        });
        let summarizer = Summarizer::new(model.clone(), policy(), SummarizerSettings::default());

        let out = summarizer.reduce("short resume").await.unwrap();
        assert_eq!(out, "short resume");
        assert_eq!(model.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_long_text_reduces_below_threshold() {
        let model = Arc::new(Truncating {
            keep: 600,
            calls: AtomicUsize::new(0),
        });
        let settings = SummarizerSettings {
            block_lines: 20,
            overlap_lines: 5,
            ..SummarizerSettings::default()
        };
        let summarizer = Summarizer::new(model.clone(), policy(), settings);

        let out = summarizer.reduce(&synthetic(10_000)).await.unwrap();
        assert!(out.chars().count() <= 4096, "got {} chars", out.len());
        assert!(model.calls.load(Ordering::SeqCst) > 1);
    }

    #[tokio::test]
    async fn test_no_progress_terminates_with_error() {
        let summarizer = Summarizer::new(Arc::new(Echo), policy(), SummarizerSettings::default());

        let err = summarizer.reduce(&synthetic(10_000)).await.unwrap_err();
        assert!(matches!(err, SummarizeError::NoProgress { .. }));
    }

    #[tokio::test]
    async fn test_pass_limit_terminates_with_error() {
        // shrinks by a single character per block each pass
        struct Nibble;
        #[async_trait]
        impl CompletionModel for Nibble {
            async fn complete(&self, request: Completion<'_>) -> Result<String, LlmError> {
                let n = request.prompt.chars().count().saturating_sub(1);
                Ok(request.prompt.chars().take(n).collect())
            }
        }
        let settings = SummarizerSettings {
            max_passes: 3,
            ..SummarizerSettings::default()
        };
        let summarizer = Summarizer::new(Arc::new(Nibble), policy(), settings);

        let err = summarizer.reduce(&synthetic(10_000)).await.unwrap_err();
        assert!(matches!(err, SummarizeError::PassLimit { passes: 3, .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_model_failure_exhausts_retries_then_errors() {
        let model = Arc::new(Down {
            calls: AtomicUsize::new(0),
        });
        let summarizer = Summarizer::new(model.clone(), policy(), SummarizerSettings::default());

        let err = summarizer.reduce(&synthetic(10_000)).await.unwrap_err();
        assert!(matches!(err, SummarizeError::Model(_)));
        assert_eq!(model.calls.load(Ordering::SeqCst), 3);
    }
}
