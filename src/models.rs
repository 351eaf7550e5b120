//! Data models for the analysis pipeline and publishing.
//!
//! This module contains the persisted rows (jobs, articles, summaries,
//! insights) and the documents handed back to callers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::PipelineError;

pub type JobId = Uuid;
pub type ArticleId = Uuid;

/// Lifecycle of a search job.
///
/// Ordering follows the lifecycle, so a transition is legal only when it
/// moves strictly forward out of a non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    Error,
}

impl JobStatus {
    /// Terminal states are never left again.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Error)
    }

    /// Whether moving from `self` to `next` keeps the status monotonic.
    pub fn can_transition_to(&self, next: JobStatus) -> bool {
        match (self, next) {
            (JobStatus::Pending, JobStatus::Processing) => true,
            // A worker can fail before it ever flips to processing.
            (JobStatus::Pending, JobStatus::Error) => true,
            (JobStatus::Processing, JobStatus::Completed | JobStatus::Error) => true,
            _ => false,
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobStatus::Pending => write!(f, "pending"),
            JobStatus::Processing => write!(f, "processing"),
            JobStatus::Completed => write!(f, "completed"),
            JobStatus::Error => write!(f, "error"),
        }
    }
}

/// How the keyword is interpreted by the scrape source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchType {
    /// Full-text article search.
    #[default]
    Keyword,
    /// Articles published by a named account.
    Account,
}

impl SearchType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchType::Keyword => "keyword",
            SearchType::Account => "account",
        }
    }
}

impl fmt::Display for SearchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SearchType {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "keyword" => Ok(SearchType::Keyword),
            "account" => Ok(SearchType::Account),
            other => Err(PipelineError::Validation(format!(
                "unsupported search type '{}' (expected keyword or account)",
                other
            ))),
        }
    }
}

/// One keyword-driven analysis run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchJob {
    pub id: JobId,
    pub keyword: String,
    pub search_type: SearchType,
    pub owner_id: String,
    pub status: JobStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Failure detail recorded when the job ends in `error`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SearchJob {
    /// Creates a job in the `pending` state.
    pub fn new(keyword: impl Into<String>, search_type: SearchType, owner_id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            keyword: keyword.into(),
            search_type,
            owner_id: owner_id.into(),
            status: JobStatus::Pending,
            created_at: now,
            updated_at: now,
            error: None,
        }
    }
}

/// Editorial state of an article. A single global field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArticleStatus {
    #[default]
    Draft,
    PendingReview,
    Approved,
    Published,
    Failed,
}

impl fmt::Display for ArticleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArticleStatus::Draft => write!(f, "draft"),
            ArticleStatus::PendingReview => write!(f, "pending_review"),
            ArticleStatus::Approved => write!(f, "approved"),
            ArticleStatus::Published => write!(f, "published"),
            ArticleStatus::Failed => write!(f, "failed"),
        }
    }
}

/// Outcome recorded for one platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlatformPublishStatus {
    Success,
    Failed,
}

/// Stored result of the most recent publish attempt to one platform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlatformResult {
    pub status: PlatformPublishStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub published_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_ref: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Engagement numbers reported by the scrape source.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngagementStats {
    #[serde(default)]
    pub reads: u64,
    #[serde(default)]
    pub likes: u64,
}

/// An article, either scraped for a job or created manually as a draft.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    pub id: ArticleId,
    /// Owning job; `None` for manually created drafts.
    pub job_id: Option<JobId>,
    pub title: String,
    /// Canonical HTML body.
    pub content: String,
    #[serde(default)]
    pub digest: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cover_image: Option<String>,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default)]
    pub stats: EngagementStats,
    pub status: ArticleStatus,
    /// Keyed by platform name.
    #[serde(default)]
    pub published_platforms: HashMap<String, PlatformResult>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Article {
    /// Creates a manual draft with no owning job.
    pub fn draft(title: impl Into<String>, content: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            job_id: None,
            title: title.into(),
            content: content.into(),
            digest: String::new(),
            cover_image: None,
            images: Vec::new(),
            source_url: None,
            author: None,
            stats: EngagementStats::default(),
            status: ArticleStatus::Draft,
            published_platforms: HashMap::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Builds the persisted row for a scraped article.
    pub fn from_raw(job_id: JobId, raw: RawArticle) -> Self {
        let mut article = Self::draft(raw.title, raw.content);
        article.job_id = Some(job_id);
        article.digest = raw.digest;
        article.images = raw.cover_image.iter().cloned().collect();
        article.cover_image = raw.cover_image;
        article.source_url = Some(raw.url);
        article.author = raw.author;
        article.stats = raw.stats;
        article
    }
}

/// An article as returned by the scrape collaborator, before persistence.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawArticle {
    pub title: String,
    pub url: String,
    #[serde(default)]
    pub digest: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub cover_image: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub stats: EngagementStats,
}

/// AI-extracted digest of one article within a job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticleSummary {
    pub id: Uuid,
    pub job_id: JobId,
    pub article_id: ArticleId,
    pub summary: String,
    pub key_points: Vec<String>,
    pub keywords: Vec<String>,
    pub highlights: Vec<String>,
    pub content_type: String,
    pub created_at: DateTime<Utc>,
}

/// AI-synthesized cross-article finding for a job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopicInsight {
    pub id: Uuid,
    pub job_id: JobId,
    pub title: String,
    pub description: String,
    pub evidence: String,
    pub suggested_topics: Vec<String>,
    pub related_articles: Vec<String>,
    pub created_at: DateTime<Utc>,
}

/// One entry of the derived keyword-frequency summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordCloudEntry {
    pub word: String,
    pub count: usize,
}

/// What a poller sees for a job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusDocument {
    pub job_id: JobId,
    pub keyword: String,
    pub status: JobStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub articles: Option<Vec<Article>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub insights: Option<Vec<TopicInsight>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub word_cloud: Option<Vec<WordCloudEntry>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_transitions_are_forward_only() {
        assert!(JobStatus::Pending.can_transition_to(JobStatus::Processing));
        assert!(JobStatus::Processing.can_transition_to(JobStatus::Completed));
        assert!(JobStatus::Processing.can_transition_to(JobStatus::Error));

        assert!(!JobStatus::Completed.can_transition_to(JobStatus::Processing));
        assert!(!JobStatus::Error.can_transition_to(JobStatus::Processing));
        assert!(!JobStatus::Processing.can_transition_to(JobStatus::Pending));
        assert!(!JobStatus::Completed.can_transition_to(JobStatus::Error));
        assert!(!JobStatus::Pending.can_transition_to(JobStatus::Completed));
    }

    #[test]
    fn test_search_type_from_str() {
        assert_eq!("keyword".parse::<SearchType>().unwrap(), SearchType::Keyword);
        assert_eq!(" Account ".parse::<SearchType>().unwrap(), SearchType::Account);
        assert!(matches!(
            "hashtag".parse::<SearchType>(),
            Err(PipelineError::Validation(_))
        ));
    }

    #[test]
    fn test_article_from_raw() {
        let job_id = Uuid::new_v4();
        let raw = RawArticle {
            title: "Title".to_string(),
            url: "https://example.com/a".to_string(),
            digest: "Digest".to_string(),
            content: "<p>Body</p>".to_string(),
            cover_image: Some("https://example.com/c.png".to_string()),
            ..RawArticle::default()
        };

        let article = Article::from_raw(job_id, raw);
        assert_eq!(article.job_id, Some(job_id));
        assert_eq!(article.status, ArticleStatus::Draft);
        assert_eq!(article.images, vec!["https://example.com/c.png".to_string()]);
        assert_eq!(article.source_url.as_deref(), Some("https://example.com/a"));
    }

    #[test]
    fn test_status_document_skips_absent_sections() {
        let doc = StatusDocument {
            job_id: Uuid::new_v4(),
            keyword: "ai".to_string(),
            status: JobStatus::Error,
            articles: None,
            insights: None,
            word_cloud: None,
        };

        let json = serde_json::to_string(&doc).unwrap();
        assert!(json.contains("\"status\":\"error\""));
        assert!(!json.contains("articles"));
        assert!(!json.contains("wordCloud"));
    }
}
