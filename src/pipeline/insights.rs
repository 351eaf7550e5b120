//! Cross-article insight synthesis.

use anyhow::{Context, Result};
use chrono::Utc;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::ai::{parse_json_response, ChatMessage, CompletionClient};
use crate::models::{ArticleId, ArticleSummary, JobId, TopicInsight};
use crate::store::Store;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InsightPayload {
    title: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    evidence: String,
    #[serde(default)]
    suggested_topics: Vec<String>,
    #[serde(default)]
    related_articles: Vec<String>,
}

/// Models answer either `{"insights": [...]}` or a bare array.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum InsightsResponse {
    Wrapped { insights: Vec<InsightPayload> },
    Bare(Vec<InsightPayload>),
}

impl InsightsResponse {
    fn into_payloads(self) -> Vec<InsightPayload> {
        match self {
            InsightsResponse::Wrapped { insights } => insights,
            InsightsResponse::Bare(insights) => insights,
        }
    }
}

/// One AI call over every available summary of a job.
pub struct InsightSynthesisStage {
    ai: Arc<dyn CompletionClient>,
    store: Arc<dyn Store>,
}

impl InsightSynthesisStage {
    pub fn new(ai: Arc<dyn CompletionClient>, store: Arc<dyn Store>) -> Self {
        Self { ai, store }
    }

    /// Synthesize and persist insights, replacing any the job already has.
    ///
    /// An empty summary list yields no insights and makes no AI call.
    pub async fn run(
        &self,
        job_id: JobId,
        keyword: &str,
        summaries: &[ArticleSummary],
        titles: &HashMap<ArticleId, String>,
    ) -> Result<Vec<TopicInsight>> {
        if summaries.is_empty() {
            info!(job_id = %job_id, "No summaries available, skipping insight synthesis");
            return Ok(Vec::new());
        }

        let messages = vec![
            ChatMessage::system(INSIGHT_SYSTEM_PROMPT),
            ChatMessage::user(build_prompt(keyword, summaries, titles)),
        ];

        let response = self
            .ai
            .complete(messages)
            .await
            .context("Insight synthesis request failed")?;

        let payloads = parse_json_response::<InsightsResponse>(&response)
            .context("Unusable insight synthesis response")?
            .into_payloads();

        let now = Utc::now();
        let insights: Vec<TopicInsight> = payloads
            .into_iter()
            .filter(|p| !p.title.trim().is_empty())
            .map(|p| TopicInsight {
                id: Uuid::new_v4(),
                job_id,
                title: p.title.trim().to_string(),
                description: p.description,
                evidence: p.evidence,
                suggested_topics: p.suggested_topics,
                related_articles: p.related_articles,
                created_at: now,
            })
            .collect();

        self.store
            .replace_insights(job_id, insights.clone())
            .await
            .context("Failed to persist insights")?;

        info!(job_id = %job_id, count = insights.len(), "Insights stored");
        Ok(insights)
    }
}

fn build_prompt(
    keyword: &str,
    summaries: &[ArticleSummary],
    titles: &HashMap<ArticleId, String>,
) -> String {
    let mut prompt = String::new();
    prompt.push_str(&format!("Keyword: {}\n\n", keyword));
    prompt.push_str(&format!("=== {} ARTICLE DIGESTS ===\n\n", summaries.len()));

    for (i, summary) in summaries.iter().enumerate() {
        let title = titles
            .get(&summary.article_id)
            .map(String::as_str)
            .unwrap_or("(untitled)");
        prompt.push_str(&format!("### {}. {}\n", i + 1, title));
        prompt.push_str(&format!("Type: {}\n", summary.content_type));
        prompt.push_str(&format!("Summary: {}\n", summary.summary));
        if !summary.key_points.is_empty() {
            prompt.push_str(&format!("Key points: {}\n", summary.key_points.join("; ")));
        }
        if !summary.keywords.is_empty() {
            prompt.push_str(&format!("Keywords: {}\n", summary.keywords.join(", ")));
        }
        prompt.push('\n');
    }

    prompt.push_str("=== END OF DIGESTS ===\n\nReturn the JSON object now.");
    prompt
}

const INSIGHT_SYSTEM_PROMPT: &str = r#"You are a content strategist. From the article digests, find the
recurring themes, gaps and opportunities around the keyword.
Answer with ONE JSON object, no markdown, no commentary:
{
  "insights": [
    {
      "title": "short finding",
      "description": "what the finding means",
      "evidence": "which digests support it and how",
      "suggestedTopics": ["article idea", "..."],
      "relatedArticles": ["title of a supporting article", "..."]
    }
  ]
}
Return 3 to 5 insights, written in the same language as the digests."#;
