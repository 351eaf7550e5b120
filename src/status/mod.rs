//! Read path for job progress.
//!
//! Polling only reads the store. Unknown jobs, jobs owned by someone else
//! and jobs not yet picked up all look the same to the caller: not found.

mod word_cloud;

pub use word_cloud::{tokenize, word_cloud, WORD_CLOUD_LIMIT};

use std::sync::Arc;
use tracing::debug;

use crate::error::{PipelineError, PipelineResult};
use crate::models::{JobId, JobStatus, StatusDocument};
use crate::store::Store;

pub struct StatusPoller {
    store: Arc<dyn Store>,
}

impl StatusPoller {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub async fn get_status(&self, job_id: JobId, owner_id: &str) -> PipelineResult<StatusDocument> {
        let job = match self.store.get_job(job_id).await? {
            Some(job) if job.owner_id == owner_id && job.status != JobStatus::Pending => job,
            _ => return Err(PipelineError::not_found("job", job_id)),
        };

        debug!(job_id = %job_id, status = %job.status, "Status requested");

        let mut doc = StatusDocument {
            job_id,
            keyword: job.keyword,
            status: job.status,
            articles: None,
            insights: None,
            word_cloud: None,
        };

        match job.status {
            JobStatus::Completed => {
                let articles = self.store.list_job_articles(job_id).await?;
                doc.word_cloud = Some(word_cloud(&articles));
                doc.insights = Some(self.store.list_insights(job_id).await?);
                doc.articles = Some(articles);
            }
            JobStatus::Processing => {
                let articles = self.store.list_job_articles(job_id).await?;
                if !articles.is_empty() {
                    doc.articles = Some(articles);
                }
            }
            JobStatus::Error | JobStatus::Pending => {}
        }

        Ok(doc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Article, SearchJob, SearchType};
    use crate::store::MemoryStore;

    async fn job_in(store: &MemoryStore, path: &[JobStatus]) -> SearchJob {
        let job = SearchJob::new("AI写作", SearchType::Keyword, "owner-1");
        store.create_job(job.clone()).await.unwrap();
        for status in path {
            store.transition_job(job.id, *status, None).await.unwrap();
        }
        job
    }

    fn scraped(job: &SearchJob, title: &str, digest: &str) -> Article {
        let mut article = Article::draft(title, "<p>x</p>");
        article.job_id = Some(job.id);
        article.digest = digest.to_string();
        article
    }

    #[tokio::test]
    async fn test_owner_mismatch_is_not_found() {
        let store = Arc::new(MemoryStore::new());
        let job = job_in(&store, &[JobStatus::Processing, JobStatus::Completed]).await;
        let poller = StatusPoller::new(store);

        let err = poller.get_status(job.id, "intruder").await.unwrap_err();
        assert!(matches!(err, PipelineError::NotFound { .. }));
        assert!(poller.get_status(job.id, "owner-1").await.is_ok());
    }

    #[tokio::test]
    async fn test_unknown_and_pending_are_not_found() {
        let store = Arc::new(MemoryStore::new());
        let pending = job_in(&store, &[]).await;
        let poller = StatusPoller::new(store);

        assert!(matches!(
            poller.get_status(uuid::Uuid::new_v4(), "owner-1").await,
            Err(PipelineError::NotFound { .. })
        ));
        assert!(matches!(
            poller.get_status(pending.id, "owner-1").await,
            Err(PipelineError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_processing_shows_partial_articles() {
        let store = Arc::new(MemoryStore::new());
        let job = job_in(&store, &[JobStatus::Processing]).await;
        let poller = StatusPoller::new(store.clone());

        let doc = poller.get_status(job.id, "owner-1").await.unwrap();
        assert_eq!(doc.status, JobStatus::Processing);
        assert!(doc.articles.is_none());

        store
            .insert_articles(vec![scraped(&job, "First", "")])
            .await
            .unwrap();
        let doc = poller.get_status(job.id, "owner-1").await.unwrap();
        assert_eq!(doc.articles.map(|a| a.len()), Some(1));
        assert!(doc.insights.is_none());
        assert!(doc.word_cloud.is_none());
    }

    #[tokio::test]
    async fn test_completed_includes_everything() {
        let store = Arc::new(MemoryStore::new());
        let job = job_in(&store, &[JobStatus::Processing]).await;
        store
            .insert_articles(vec![scraped(&job, "AI写作工具测评", "AI工具测评分享")])
            .await
            .unwrap();
        store
            .transition_job(job.id, JobStatus::Completed, None)
            .await
            .unwrap();
        let poller = StatusPoller::new(store);

        let doc = poller.get_status(job.id, "owner-1").await.unwrap();
        assert_eq!(doc.status, JobStatus::Completed);
        assert_eq!(doc.articles.unwrap().len(), 1);
        assert!(doc.insights.unwrap().is_empty());
        let cloud = doc.word_cloud.unwrap();
        assert_eq!(cloud[0].word, "AI");
        assert_eq!(cloud[0].count, 2);
    }

    #[tokio::test]
    async fn test_error_job_has_status_only() {
        let store = Arc::new(MemoryStore::new());
        let job = job_in(&store, &[JobStatus::Processing]).await;
        store
            .insert_articles(vec![scraped(&job, "Scraped", "")])
            .await
            .unwrap();
        store
            .transition_job(job.id, JobStatus::Error, Some("insights failed".to_string()))
            .await
            .unwrap();
        let poller = StatusPoller::new(store);

        let doc = poller.get_status(job.id, "owner-1").await.unwrap();
        assert_eq!(doc.status, JobStatus::Error);
        assert!(doc.articles.is_none());
        assert!(doc.insights.is_none());
        assert!(doc.word_cloud.is_none());
    }
}
