//! TopicPress - keyword analysis and multi-platform publishing.
//!
//! A keyword search becomes a job: articles are scraped, summarized one by
//! one with a bounded number of AI calls in flight, and synthesized into
//! topic insights. Pollers read progress from the store. Articles, scraped
//! or drafted by hand, are published to content platforms through a
//! per-platform state machine.

pub mod ai;
pub mod cli;
pub mod config;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod publish;
pub mod report;
pub mod scrape;
pub mod status;
pub mod store;

#[cfg(test)]
mod testing;

pub use error::{ErrorKind, PipelineError, PipelineResult};
