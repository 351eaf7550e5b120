//! Typed errors surfaced to callers of the pipeline and the publisher.

use thiserror::Error;

/// The four classes callers can react to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Upstream,
    NotFound,
    Internal,
}

/// Errors returned by job control, status polling and publishing.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Bad input; never retried.
    #[error("validation error: {0}")]
    Validation(String),

    /// A publish precondition failed before any adapter call was made.
    #[error("precondition failed for {platform}: {reason}")]
    Precondition { platform: String, reason: String },

    /// An AI, scrape or platform collaborator failed.
    #[error("upstream error [{code}]: {message}")]
    Upstream { code: String, message: String },

    /// Unknown id, or an id the caller does not own.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// Anything unexpected. Details are logged, not shown.
    #[error("internal error: {0:#}")]
    Internal(#[from] anyhow::Error),
}

pub type PipelineResult<T> = std::result::Result<T, PipelineError>;

impl PipelineError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        PipelineError::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn upstream(code: impl Into<String>, message: impl Into<String>) -> Self {
        PipelineError::Upstream {
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            PipelineError::Validation(_) | PipelineError::Precondition { .. } => {
                ErrorKind::Validation
            }
            PipelineError::Upstream { .. } => ErrorKind::Upstream,
            PipelineError::NotFound { .. } => ErrorKind::NotFound,
            PipelineError::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Message safe to show to an end user.
    pub fn public_message(&self) -> String {
        match self {
            PipelineError::Internal(e) => {
                tracing::error!(error = ?e, "internal error");
                "internal error".to_string()
            }
            other => other.to_string(),
        }
    }
}
