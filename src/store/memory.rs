//! In-process store with optional JSON snapshot persistence.

use anyhow::Context;
use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;
use tracing::debug;

use super::{Store, StoreError, StoreResult};
use crate::models::{
    Article, ArticleId, ArticleStatus, ArticleSummary, JobId, JobStatus, PlatformResult,
    SearchJob, TopicInsight,
};

#[derive(Debug, Default, Serialize, Deserialize)]
struct State {
    jobs: HashMap<JobId, SearchJob>,
    articles: Vec<Article>,
    summaries: Vec<ArticleSummary>,
    insights: Vec<TopicInsight>,
}

/// Store holding every table behind one lock.
///
/// With a snapshot path, the whole state is rewritten after each mutation
/// (temp file, then rename) so a restarted process sees the last status.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<State>,
    snapshot: Option<PathBuf>,
}

impl MemoryStore {
    /// A store that lives only as long as the process.
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a snapshot-backed store, loading the file if it exists.
    pub fn open(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let state = if path.exists() {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read store snapshot: {}", path.display()))?;
            serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse store snapshot: {}", path.display()))?
        } else {
            State::default()
        };

        Ok(Self {
            state: RwLock::new(state),
            snapshot: Some(path),
        })
    }

    async fn persist(&self, state: &State) -> StoreResult<()> {
        let Some(ref path) = self.snapshot else {
            return Ok(());
        };

        let json = serde_json::to_vec_pretty(state).context("Failed to serialize store")?;
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json)
            .await
            .with_context(|| format!("Failed to write {}", tmp.display()))?;
        tokio::fs::rename(&tmp, path)
            .await
            .with_context(|| format!("Failed to replace {}", path.display()))?;

        debug!("Store snapshot written to {}", path.display());
        Ok(())
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn create_job(&self, job: SearchJob) -> StoreResult<()> {
        let mut state = self.state.write().await;
        if state.jobs.contains_key(&job.id) {
            return Err(StoreError::DuplicateJob(job.id));
        }
        state.jobs.insert(job.id, job);
        self.persist(&state).await
    }

    async fn get_job(&self, id: JobId) -> StoreResult<Option<SearchJob>> {
        Ok(self.state.read().await.jobs.get(&id).cloned())
    }

    async fn transition_job(
        &self,
        id: JobId,
        next: JobStatus,
        error: Option<String>,
    ) -> StoreResult<SearchJob> {
        let mut state = self.state.write().await;
        let job = state.jobs.get_mut(&id).ok_or(StoreError::JobNotFound(id))?;

        if !job.status.can_transition_to(next) {
            return Err(StoreError::InvalidTransition {
                id,
                from: job.status,
                to: next,
            });
        }

        job.status = next;
        job.updated_at = Utc::now();
        if next == JobStatus::Error {
            job.error = error;
        }
        let updated = job.clone();

        self.persist(&state).await?;
        Ok(updated)
    }

    async fn insert_articles(&self, articles: Vec<Article>) -> StoreResult<()> {
        let mut state = self.state.write().await;
        state.articles.extend(articles);
        self.persist(&state).await
    }

    async fn list_job_articles(&self, job_id: JobId) -> StoreResult<Vec<Article>> {
        let state = self.state.read().await;
        Ok(state
            .articles
            .iter()
            .filter(|a| a.job_id == Some(job_id))
            .cloned()
            .collect())
    }

    async fn get_article(&self, id: ArticleId) -> StoreResult<Option<Article>> {
        let state = self.state.read().await;
        Ok(state.articles.iter().find(|a| a.id == id).cloned())
    }

    async fn save_article(&self, article: Article) -> StoreResult<()> {
        let mut state = self.state.write().await;
        match state.articles.iter_mut().find(|a| a.id == article.id) {
            Some(existing) => *existing = article,
            None => state.articles.push(article),
        }
        self.persist(&state).await
    }

    async fn record_publish(
        &self,
        id: ArticleId,
        platform: &str,
        result: PlatformResult,
        mark_published: bool,
    ) -> StoreResult<Article> {
        let mut state = self.state.write().await;
        let article = state
            .articles
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or(StoreError::ArticleNotFound(id))?;

        article.published_platforms.insert(platform.to_string(), result);
        if mark_published {
            article.status = ArticleStatus::Published;
        }
        article.updated_at = Utc::now();
        let updated = article.clone();

        self.persist(&state).await?;
        Ok(updated)
    }

    async fn insert_summary(&self, summary: ArticleSummary) -> StoreResult<()> {
        let mut state = self.state.write().await;
        state
            .summaries
            .retain(|s| !(s.job_id == summary.job_id && s.article_id == summary.article_id));
        state.summaries.push(summary);
        self.persist(&state).await
    }

    async fn list_summaries(&self, job_id: JobId) -> StoreResult<Vec<ArticleSummary>> {
        let state = self.state.read().await;
        Ok(state
            .summaries
            .iter()
            .filter(|s| s.job_id == job_id)
            .cloned()
            .collect())
    }

    async fn replace_insights(&self, job_id: JobId, insights: Vec<TopicInsight>) -> StoreResult<()> {
        let mut state = self.state.write().await;
        state.insights.retain(|i| i.job_id != job_id);
        state
            .insights
            .extend(insights.into_iter().filter(|i| i.job_id == job_id));
        self.persist(&state).await
    }

    async fn list_insights(&self, job_id: JobId) -> StoreResult<Vec<TopicInsight>> {
        let state = self.state.read().await;
        Ok(state
            .insights
            .iter()
            .filter(|i| i.job_id == job_id)
            .cloned()
            .collect())
    }

    async fn clear_analysis(&self, job_id: JobId) -> StoreResult<()> {
        let mut state = self.state.write().await;
        state.summaries.retain(|s| s.job_id != job_id);
        state.insights.retain(|i| i.job_id != job_id);
        self.persist(&state).await
    }
}
