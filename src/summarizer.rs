//! Transcript Summarization
//!
//! Long transcripts dilute the retrieval query, so transcripts past the
//! configured threshold are condensed before embedding. `Summarizer` is the
//! seam; `ProviderSummarizer` implements it on top of any
//! `GenerationProvider`. Summarization is best-effort: the engine falls
//! back to the raw transcript when it fails, and the conversation history
//! always records the raw transcript regardless.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;

use crate::generation::{GenerationError, GenerationProvider, GenerationResult};

/// Async trait for transcript condensation.
#[async_trait]
pub trait Summarizer: Send + Sync {
    /// Condense `transcript` into a short retrieval-friendly summary.
    async fn summarize(&self, transcript: &str) -> GenerationResult<String>;
}

const SUMMARY_PROMPT: &str = "\
Condense the following insurance consultation transcript into a short \
summary of at most five sentences. Keep the customer's questions, stated \
needs and emotional cues; drop greetings and filler. Respond as JSON in \
exactly this shape: {\"summary\": \"...\"}\n\n[transcript]\n";

#[derive(Debug, Deserialize)]
struct SummaryResponse {
    summary: String,
}

/// Summarizer backed by a generative provider.
pub struct ProviderSummarizer {
    provider: Arc<dyn GenerationProvider>,
}

impl ProviderSummarizer {
    pub fn new(provider: Arc<dyn GenerationProvider>) -> Self {
        Self { provider }
    }

    fn parse_summary(raw: &str) -> GenerationResult<String> {
        let parsed: SummaryResponse =
            serde_json::from_str(raw.trim()).map_err(|e| GenerationError::ParseError {
                message: format!("failed to parse summary response: {}", e),
            })?;
        if parsed.summary.trim().is_empty() {
            return Err(GenerationError::EmptyResponse);
        }
        Ok(parsed.summary)
    }
}

#[async_trait]
impl Summarizer for ProviderSummarizer {
    async fn summarize(&self, transcript: &str) -> GenerationResult<String> {
        let prompt = format!("{}{}", SUMMARY_PROMPT, transcript);
        let raw = self.provider.generate_structured(&prompt).await?;
        Self::parse_summary(&raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct CannedProvider {
        response: String,
    }

    #[async_trait]
    impl GenerationProvider for CannedProvider {
        async fn generate_structured(&self, _prompt: &str) -> GenerationResult<String> {
            Ok(self.response.clone())
        }
    }

    #[tokio::test]
    async fn summarize_extracts_summary_field() {
        let s = ProviderSummarizer::new(Arc::new(CannedProvider {
            response: r#"{"summary": "customer asked about premium cost"}"#.to_string(),
        }));
        let summary = s.summarize("long transcript ...").await.unwrap();
        assert_eq!(summary, "customer asked about premium cost");
    }

    #[tokio::test]
    async fn summarize_rejects_blank_summary() {
        let s = ProviderSummarizer::new(Arc::new(CannedProvider {
            response: r#"{"summary": "  "}"#.to_string(),
        }));
        let err = s.summarize("text").await.unwrap_err();
        assert!(matches!(err, GenerationError::EmptyResponse));
    }

    #[tokio::test]
    async fn summarize_rejects_non_json_output() {
        let s = ProviderSummarizer::new(Arc::new(CannedProvider {
            response: "here is your summary".to_string(),
        }));
        let err = s.summarize("text").await.unwrap_err();
        assert!(matches!(err, GenerationError::ParseError { .. }));
    }

    #[test]
    fn summary_prompt_embeds_transcript_last() {
        assert!(SUMMARY_PROMPT.ends_with("[transcript]\n"));
    }
}
