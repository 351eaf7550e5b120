//! The analysis state machine: scrape, summarize, synthesize.
//!
//! ```text
//! PENDING ──► PROCESSING ──► COMPLETED
//!                  │
//!                  └───────► ERROR
//! ```

use anyhow::{Context, Result};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{error, info, warn};

use super::insights::InsightSynthesisStage;
use super::summaries::{SummaryExtractionStage, SummaryInput};
use crate::models::{Article, ArticleSummary, JobId, JobStatus, SearchJob, TopicInsight};
use crate::scrape::{collect_articles, ArticleSource, SearchQuery};
use crate::store::Store;

/// Summaries and insights of a job, and whether they came from the store.
#[derive(Debug, Clone)]
pub struct AnalysisOutcome {
    pub summaries: Vec<ArticleSummary>,
    pub insights: Vec<TopicInsight>,
    pub cached: bool,
}

/// Drives one job from `pending` to a terminal state.
pub struct AnalysisWorker {
    store: Arc<dyn Store>,
    source: Arc<dyn ArticleSource>,
    summaries: SummaryExtractionStage,
    insights: InsightSynthesisStage,
    max_pages: u32,
}

impl AnalysisWorker {
    pub fn new(
        store: Arc<dyn Store>,
        source: Arc<dyn ArticleSource>,
        summaries: SummaryExtractionStage,
        insights: InsightSynthesisStage,
        max_pages: u32,
    ) -> Self {
        Self {
            store,
            source,
            summaries,
            insights,
            max_pages,
        }
    }

    /// Run a pending job to completion.
    ///
    /// Failures are written to the job as `error` before being returned.
    pub async fn run(&self, job_id: JobId) -> Result<()> {
        let job = self
            .store
            .transition_job(job_id, JobStatus::Processing, None)
            .await
            .with_context(|| format!("Job {} could not start", job_id))?;

        info!(job_id = %job_id, keyword = %job.keyword, "Analysis started");

        match self.process(&job).await {
            Ok(outcome) => {
                self.store
                    .transition_job(job_id, JobStatus::Completed, None)
                    .await
                    .context("Failed to mark job completed")?;
                info!(
                    job_id = %job_id,
                    summaries = outcome.summaries.len(),
                    insights = outcome.insights.len(),
                    "Analysis completed"
                );
                Ok(())
            }
            Err(e) => {
                error!(job_id = %job_id, "Analysis failed: {:#}", e);
                if let Err(mark_err) = self
                    .store
                    .transition_job(job_id, JobStatus::Error, Some(format!("{:#}", e)))
                    .await
                {
                    warn!(job_id = %job_id, error = %mark_err, "Failed to record job error");
                }
                Err(e)
            }
        }
    }

    async fn process(&self, job: &SearchJob) -> Result<AnalysisOutcome> {
        let query = SearchQuery {
            keyword: job.keyword.clone(),
            search_type: job.search_type,
        };

        let raw = collect_articles(self.source.as_ref(), &query, self.max_pages)
            .await
            .context("Scrape failed")?;

        let articles: Vec<Article> = raw
            .into_iter()
            .map(|r| Article::from_raw(job.id, r))
            .collect();
        self.store
            .insert_articles(articles)
            .await
            .context("Failed to persist scraped articles")?;

        self.analyze(job, false).await
    }

    /// Produce summaries and insights for a job whose articles are stored.
    ///
    /// Cached results are returned untouched unless `force_regenerate` is
    /// set, in which case the previous rows are cleared in one step first.
    pub async fn analyze(&self, job: &SearchJob, force_regenerate: bool) -> Result<AnalysisOutcome> {
        if force_regenerate {
            self.store
                .clear_analysis(job.id)
                .await
                .context("Failed to clear previous analysis")?;
            info!(job_id = %job.id, "Cleared previous analysis for regeneration");
        } else {
            let cached = self.store.list_insights(job.id).await?;
            if !cached.is_empty() {
                info!(job_id = %job.id, insights = cached.len(), "Using cached analysis");
                return Ok(AnalysisOutcome {
                    summaries: self.store.list_summaries(job.id).await?,
                    insights: cached,
                    cached: true,
                });
            }
        }

        let articles = self.store.list_job_articles(job.id).await?;
        let inputs: Vec<SummaryInput> = articles.iter().map(SummaryInput::from).collect();
        self.summaries.run(job.id, inputs).await;

        // Everything that made it into the store, including rows from an
        // earlier partial run of the same job.
        let summaries = self.store.list_summaries(job.id).await?;
        let titles: HashMap<_, _> = articles.into_iter().map(|a| (a.id, a.title)).collect();

        let insights = self
            .insights
            .run(job.id, &job.keyword, &summaries, &titles)
            .await?;

        Ok(AnalysisOutcome {
            summaries,
            insights,
            cached: false,
        })
    }
}
