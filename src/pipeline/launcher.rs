//! Job creation and detached dispatch.

use std::sync::Arc;
use tracing::{error, info, warn};

use super::worker::{AnalysisOutcome, AnalysisWorker};
use crate::error::{PipelineError, PipelineResult};
use crate::models::{JobId, JobStatus, SearchJob, SearchType};
use crate::store::{Store, StoreError};

/// Creates jobs and hands them to a detached worker task.
#[derive(Clone)]
pub struct JobLauncher {
    store: Arc<dyn Store>,
    worker: Arc<AnalysisWorker>,
}

impl JobLauncher {
    pub fn new(store: Arc<dyn Store>, worker: Arc<AnalysisWorker>) -> Self {
        Self { store, worker }
    }

    /// Persist a pending job and dispatch its analysis.
    ///
    /// Returns as soon as the job row exists; the outcome of the analysis
    /// is only ever visible through the job's stored status.
    pub async fn start(
        &self,
        keyword: &str,
        search_type: &str,
        owner_id: &str,
    ) -> PipelineResult<JobId> {
        let keyword = keyword.trim();
        if keyword.is_empty() {
            return Err(PipelineError::Validation("keyword must not be empty".to_string()));
        }
        if owner_id.trim().is_empty() {
            return Err(PipelineError::Validation("owner id must not be empty".to_string()));
        }
        let search_type: SearchType = search_type.parse()?;

        let job = SearchJob::new(keyword, search_type, owner_id);
        let job_id = job.id;
        self.store.create_job(job).await?;

        info!(job_id = %job_id, keyword, search_type = %search_type, "Job created");

        self.dispatch(job_id);
        Ok(job_id)
    }

    /// Re-run the AI stages for a completed job.
    pub async fn regenerate(
        &self,
        job_id: JobId,
        owner_id: &str,
        force_regenerate: bool,
    ) -> PipelineResult<AnalysisOutcome> {
        let job = match self.store.get_job(job_id).await? {
            Some(job) if job.owner_id == owner_id => job,
            _ => return Err(PipelineError::not_found("job", job_id)),
        };

        if job.status != JobStatus::Completed {
            return Err(PipelineError::Validation(format!(
                "job {} is {}, only completed jobs can be regenerated",
                job_id, job.status
            )));
        }

        self.worker
            .analyze(&job, force_regenerate)
            .await
            .map_err(|e| PipelineError::upstream("analysis_failed", format!("{:#}", e)))
    }

    /// Spawn the worker behind its own error boundary.
    ///
    /// The inner task runs the analysis; the outer task waits on it so that
    /// errors and panics both end up as a stored `error` status.
    fn dispatch(&self, job_id: JobId) {
        let store = self.store.clone();
        let worker = self.worker.clone();

        tokio::spawn(async move {
            let handle = tokio::spawn(async move { worker.run(job_id).await });

            let failure = match handle.await {
                Ok(Ok(())) => return,
                Ok(Err(e)) => format!("{:#}", e),
                Err(join_err) if join_err.is_panic() => "analysis worker panicked".to_string(),
                Err(join_err) => format!("analysis worker stopped: {}", join_err),
            };

            error!(job_id = %job_id, "Job failed: {}", failure);
            mark_failed(store.as_ref(), job_id, failure).await;
        });
    }
}

/// Record a failure unless the job already reached a terminal state.
async fn mark_failed(store: &dyn Store, job_id: JobId, message: String) {
    match store.transition_job(job_id, JobStatus::Error, Some(message)).await {
        Ok(_) => {}
        Err(StoreError::InvalidTransition { from, .. }) if from.is_terminal() => {}
        Err(e) => warn!(job_id = %job_id, error = %e, "Failed to record job failure"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::{InsightSynthesisStage, SummaryExtractionStage};
    use crate::scrape::ArticleSource;
    use crate::store::MemoryStore;
    use crate::testing::{failing_source, fixed_source, insights_json, summary_json, ScriptedAi};
    use std::collections::HashSet;
    use std::time::Duration;

    fn launcher_with(
        store: Arc<MemoryStore>,
        source: Arc<dyn ArticleSource>,
        ai: Arc<ScriptedAi>,
    ) -> JobLauncher {
        let worker = AnalysisWorker::new(
            store.clone(),
            source,
            SummaryExtractionStage::new(ai.clone(), store.clone(), 3, 4_000),
            InsightSynthesisStage::new(ai, store.clone()),
            1,
        );
        JobLauncher::new(store, Arc::new(worker))
    }

    fn pipeline_ai() -> Arc<ScriptedAi> {
        Arc::new(ScriptedAi::new(|messages| {
            if messages[0].content.contains("content strategist") {
                Ok(insights_json(&["Trend", "Gap"]))
            } else {
                Ok(summary_json("digest"))
            }
        }))
    }

    /// Poll the store, recording every distinct status seen, until terminal.
    async fn observe_until_terminal(store: &MemoryStore, job_id: JobId) -> Vec<JobStatus> {
        let mut seen = Vec::new();
        for _ in 0..500 {
            let status = store.get_job(job_id).await.unwrap().unwrap().status;
            if seen.last() != Some(&status) {
                seen.push(status);
            }
            if status.is_terminal() {
                return seen;
            }
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
        panic!("job {} never reached a terminal state", job_id);
    }

    #[tokio::test]
    async fn test_start_returns_before_completion_and_is_monotonic() {
        let store = Arc::new(MemoryStore::new());
        let launcher = launcher_with(store.clone(), fixed_source(&["a", "b", "c"]), pipeline_ai());

        let job_id = launcher.start("AI写作", "keyword", "owner-1").await.unwrap();

        let seen = observe_until_terminal(&store, job_id).await;
        assert_eq!(seen.last(), Some(&JobStatus::Completed));
        // Statuses only ever move forward.
        assert!(seen.windows(2).all(|w| w[0] < w[1]));

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(
            store.get_job(job_id).await.unwrap().unwrap().status,
            JobStatus::Completed
        );
    }

    #[tokio::test]
    async fn test_validation_errors() {
        let store = Arc::new(MemoryStore::new());
        let launcher = launcher_with(store, fixed_source(&[]), pipeline_ai());

        assert!(matches!(
            launcher.start("   ", "keyword", "owner-1").await,
            Err(PipelineError::Validation(_))
        ));
        assert!(matches!(
            launcher.start("rust", "hashtag", "owner-1").await,
            Err(PipelineError::Validation(_))
        ));
        assert!(matches!(
            launcher.start("rust", "keyword", "").await,
            Err(PipelineError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_worker_failure_never_reaches_caller() {
        let store = Arc::new(MemoryStore::new());
        let launcher = launcher_with(store.clone(), failing_source("search down"), pipeline_ai());

        let job_id = launcher.start("rust", "account", "owner-1").await.unwrap();

        let seen = observe_until_terminal(&store, job_id).await;
        assert_eq!(seen.last(), Some(&JobStatus::Error));
    }

    #[tokio::test]
    async fn test_worker_panic_is_recorded_as_error() {
        let store = Arc::new(MemoryStore::new());
        let ai = Arc::new(ScriptedAi::new(|messages| {
            if messages[0].content.contains("content strategist") {
                panic!("insight parser exploded");
            }
            Ok(summary_json("digest"))
        }));
        let launcher = launcher_with(store.clone(), fixed_source(&["a"]), ai);

        let job_id = launcher.start("rust", "keyword", "owner-1").await.unwrap();

        let seen = observe_until_terminal(&store, job_id).await;
        assert_eq!(seen.last(), Some(&JobStatus::Error));
        let job = store.get_job(job_id).await.unwrap().unwrap();
        assert_eq!(job.error.as_deref(), Some("analysis worker panicked"));
    }

    #[tokio::test]
    async fn test_concurrent_jobs_are_independent() {
        let store = Arc::new(MemoryStore::new());
        let ok = launcher_with(store.clone(), fixed_source(&["a", "b"]), pipeline_ai());
        let broken = launcher_with(store.clone(), failing_source("down"), pipeline_ai());

        let first = ok.start("rust", "keyword", "owner-1").await.unwrap();
        let second = broken.start("rust", "keyword", "owner-1").await.unwrap();

        assert_eq!(
            observe_until_terminal(&store, first).await.last(),
            Some(&JobStatus::Completed)
        );
        assert_eq!(
            observe_until_terminal(&store, second).await.last(),
            Some(&JobStatus::Error)
        );
    }

    #[tokio::test]
    async fn test_regenerate_requires_ownership_and_completion() {
        let store = Arc::new(MemoryStore::new());
        let launcher = launcher_with(store.clone(), fixed_source(&["a", "b"]), pipeline_ai());
        let job_id = launcher.start("rust", "keyword", "owner-1").await.unwrap();
        observe_until_terminal(&store, job_id).await;

        assert!(matches!(
            launcher.regenerate(job_id, "someone-else", true).await,
            Err(PipelineError::NotFound { .. })
        ));

        let cached = launcher.regenerate(job_id, "owner-1", false).await.unwrap();
        assert!(cached.cached);

        let first = launcher.regenerate(job_id, "owner-1", true).await.unwrap();
        let second = launcher.regenerate(job_id, "owner-1", true).await.unwrap();
        assert!(!second.cached);

        let first_ids: HashSet<_> = first.insights.iter().map(|i| i.id).collect();
        let second_ids: HashSet<_> = second.insights.iter().map(|i| i.id).collect();
        assert!(first_ids.is_disjoint(&second_ids));
        assert_eq!(store.list_insights(job_id).await.unwrap().len(), 2);
        assert_eq!(store.list_summaries(job_id).await.unwrap().len(), 2);

        // Regeneration never moves the job out of completed.
        assert_eq!(
            store.get_job(job_id).await.unwrap().unwrap().status,
            JobStatus::Completed
        );
    }

    #[tokio::test]
    async fn test_overlapping_forced_regenerations_leave_one_set() {
        let store = Arc::new(MemoryStore::new());
        let launcher = launcher_with(store.clone(), fixed_source(&["a", "b"]), pipeline_ai());
        let job_id = launcher.start("rust", "keyword", "owner-1").await.unwrap();
        observe_until_terminal(&store, job_id).await;

        let (first, second) = tokio::join!(
            launcher.regenerate(job_id, "owner-1", true),
            launcher.regenerate(job_id, "owner-1", true),
        );
        assert_eq!(first.unwrap().insights.len(), 2);
        assert_eq!(second.unwrap().insights.len(), 2);

        assert_eq!(store.list_insights(job_id).await.unwrap().len(), 2);
        assert_eq!(store.list_summaries(job_id).await.unwrap().len(), 2);
    }
}
