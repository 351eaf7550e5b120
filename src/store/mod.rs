//! Persistence seam.
//!
//! The store is the only synchronization point between detached workers
//! and pollers, so every method is a single atomic row-level operation.

mod memory;

pub use memory::MemoryStore;

use async_trait::async_trait;
use thiserror::Error;

use crate::error::PipelineError;
use crate::models::{
    Article, ArticleId, ArticleSummary, JobId, JobStatus, PlatformResult, SearchJob,
    TopicInsight,
};

/// Errors raised by a store implementation.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("job not found: {0}")]
    JobNotFound(JobId),

    #[error("article not found: {0}")]
    ArticleNotFound(ArticleId),

    #[error("job {id} cannot move from {from} to {to}")]
    InvalidTransition {
        id: JobId,
        from: JobStatus,
        to: JobStatus,
    },

    #[error("job already exists: {0}")]
    DuplicateJob(JobId),

    #[error("persistence failure: {0:#}")]
    Persistence(#[from] anyhow::Error),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

impl From<StoreError> for PipelineError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::JobNotFound(id) => PipelineError::not_found("job", id),
            StoreError::ArticleNotFound(id) => PipelineError::not_found("article", id),
            other => PipelineError::Internal(anyhow::Error::new(other)),
        }
    }
}

/// Durable keyed store for jobs, articles, summaries and insights.
#[async_trait]
pub trait Store: Send + Sync {
    async fn create_job(&self, job: SearchJob) -> StoreResult<()>;

    async fn get_job(&self, id: JobId) -> StoreResult<Option<SearchJob>>;

    /// Move a job forward. Backward or out-of-terminal moves are rejected.
    async fn transition_job(
        &self,
        id: JobId,
        next: JobStatus,
        error: Option<String>,
    ) -> StoreResult<SearchJob>;

    async fn insert_articles(&self, articles: Vec<Article>) -> StoreResult<()>;

    /// Articles owned by a job, in insertion order.
    async fn list_job_articles(&self, job_id: JobId) -> StoreResult<Vec<Article>>;

    async fn get_article(&self, id: ArticleId) -> StoreResult<Option<Article>>;

    /// Insert or replace an article row.
    async fn save_article(&self, article: Article) -> StoreResult<()>;

    /// Set one platform's publish result on an article.
    ///
    /// Only that platform's entry changes, plus `updated_at` and, when
    /// `mark_published` is set, the global status.
    async fn record_publish(
        &self,
        id: ArticleId,
        platform: &str,
        result: PlatformResult,
        mark_published: bool,
    ) -> StoreResult<Article>;

    /// Insert a summary, replacing any existing one for the same article in the same job.
    async fn insert_summary(&self, summary: ArticleSummary) -> StoreResult<()>;

    async fn list_summaries(&self, job_id: JobId) -> StoreResult<Vec<ArticleSummary>>;

    /// Replace every insight of a job with `insights`.
    async fn replace_insights(&self, job_id: JobId, insights: Vec<TopicInsight>) -> StoreResult<()>;

    async fn list_insights(&self, job_id: JobId) -> StoreResult<Vec<TopicInsight>>;

    /// Delete every summary and insight of a job in one step.
    async fn clear_analysis(&self, job_id: JobId) -> StoreResult<()>;
}
