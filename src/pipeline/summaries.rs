//! Per-article summary extraction.

use anyhow::{Context, Result};
use chrono::Utc;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

use super::BatchExecutor;
use crate::ai::parse::truncate_to_char_boundary;
use crate::ai::{parse_json_response, ChatMessage, CompletionClient};
use crate::models::{Article, ArticleId, ArticleSummary, JobId};
use crate::publish::transform::html_to_plain_text;
use crate::store::Store;

/// What the stage needs to know about one article.
#[derive(Debug, Clone)]
pub struct SummaryInput {
    pub article_id: ArticleId,
    pub title: String,
    pub content: String,
}

impl From<&Article> for SummaryInput {
    fn from(article: &Article) -> Self {
        Self {
            article_id: article.id,
            title: article.title.clone(),
            content: article.content.clone(),
        }
    }
}

/// Expected model output.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SummaryPayload {
    summary: String,
    #[serde(default)]
    key_points: Vec<String>,
    #[serde(default)]
    keywords: Vec<String>,
    #[serde(default)]
    highlights: Vec<String>,
    #[serde(default = "default_content_type")]
    content_type: String,
}

fn default_content_type() -> String {
    "other".to_string()
}

/// Extracts structured digests, persisting each one as soon as it exists.
pub struct SummaryExtractionStage {
    ai: Arc<dyn CompletionClient>,
    store: Arc<dyn Store>,
    executor: BatchExecutor,
    max_content_bytes: usize,
}

impl SummaryExtractionStage {
    pub fn new(
        ai: Arc<dyn CompletionClient>,
        store: Arc<dyn Store>,
        concurrency: usize,
        max_content_bytes: usize,
    ) -> Self {
        Self {
            ai,
            store,
            executor: BatchExecutor::new(concurrency),
            max_content_bytes,
        }
    }

    /// Summarize every input. Slots of failed items are `None`.
    pub async fn run(&self, job_id: JobId, inputs: Vec<SummaryInput>) -> Vec<Option<ArticleSummary>> {
        let total = inputs.len();
        let results = self
            .executor
            .run(inputs, |input| self.summarize_one(job_id, input))
            .await;

        info!(
            job_id = %job_id,
            total,
            succeeded = results.iter().filter(|r| r.is_some()).count(),
            "Summary extraction finished"
        );

        results
    }

    async fn summarize_one(&self, job_id: JobId, input: SummaryInput) -> Result<ArticleSummary> {
        let text = html_to_plain_text(&input.content);
        let text = truncate_to_char_boundary(&text, self.max_content_bytes);

        let messages = vec![
            ChatMessage::system(SUMMARY_SYSTEM_PROMPT),
            ChatMessage::user(format!(
                "Title: {}\n\nContent:\n{}\n\nReturn the JSON object now.",
                input.title, text
            )),
        ];

        let response = self
            .ai
            .complete(messages)
            .await
            .with_context(|| format!("Summary request failed for '{}'", input.title))?;

        let payload: SummaryPayload = parse_json_response(&response)
            .with_context(|| format!("Unusable summary for '{}'", input.title))?;

        if payload.summary.trim().is_empty() {
            anyhow::bail!("Empty summary for '{}'", input.title);
        }

        let summary = ArticleSummary {
            id: Uuid::new_v4(),
            job_id,
            article_id: input.article_id,
            summary: payload.summary.trim().to_string(),
            key_points: payload.key_points,
            keywords: payload.keywords,
            highlights: payload.highlights,
            content_type: payload.content_type,
            created_at: Utc::now(),
        };

        self.store
            .insert_summary(summary.clone())
            .await
            .context("Failed to persist summary")?;

        debug!(article_id = %input.article_id, "Summary stored");
        Ok(summary)
    }
}

const SUMMARY_SYSTEM_PROMPT: &str = r#"You are an editor who digests articles for a content research team.
Read the article and answer with ONE JSON object, no markdown, no commentary:
{
  "summary": "2-3 sentence digest",
  "keyPoints": ["main point", "..."],
  "keywords": ["keyword", "..."],
  "highlights": ["notable quote or data point", "..."],
  "contentType": "tutorial | review | news | opinion | case_study | other"
}
Write in the same language as the article."#;
