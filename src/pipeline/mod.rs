//! The asynchronous analysis pipeline.
//!
//! `JobLauncher` creates a job and dispatches an `AnalysisWorker`, which
//! scrapes articles and runs them through the summary and insight stages.
//! The batch executor bounds how many AI calls a stage has in flight.

pub mod executor;
pub mod insights;
pub mod launcher;
pub mod summaries;
pub mod worker;

pub use executor::BatchExecutor;
pub use insights::InsightSynthesisStage;
pub use launcher::JobLauncher;
pub use summaries::{SummaryExtractionStage, SummaryInput};
pub use worker::{AnalysisOutcome, AnalysisWorker};
