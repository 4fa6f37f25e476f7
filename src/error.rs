//! Error types for the conversational finance pipeline

use thiserror::Error;

use crate::models::FieldKind;

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, PipelineError>;

#[derive(Error, Debug)]
pub enum PipelineError {

    // =============================
    // Core Pipeline Errors
    // =============================

    /// Field extraction failed; recovered locally by re-asking the same question.
    #[error("Parse error: {0}")]
    Parse(String),

    /// Type/range/referential check failed. When `field` is set the
    /// orchestrator re-enters AWAITING_FIELD for exactly that field.
    #[error("Validation error: {reason}")]
    Validation {
        reason: String,
        field: Option<FieldKind>,
    },

    /// Ledger mutation failed. Retryable failures (stale references) get one
    /// automatic re-validate-and-retry; the rest clear the conversation.
    #[error("Execution error: {reason}")]
    Execution { reason: String, retryable: bool },

    /// Referenced transaction/goal does not exist or belongs to another user.
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("LLM provider timed out")]
    ProviderTimeout,

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("Conversation state error: {0}")]
    State(String),

    /// Concurrent turn modified the conversation state underneath us.
    #[error("Conversation state conflict for session {0}")]
    StateConflict(uuid::Uuid),

    #[error("Database error: {0}")]
    Database(String),

    // =============================
    // External Library Conversions
    // =============================

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("UUID parse error: {0}")]
    Uuid(#[from] uuid::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl PipelineError {
    pub fn validation(reason: impl Into<String>, field: Option<FieldKind>) -> Self {
        Self::Validation {
            reason: reason.into(),
            field,
        }
    }

    pub fn execution(reason: impl Into<String>, retryable: bool) -> Self {
        Self::Execution {
            reason: reason.into(),
            retryable,
        }
    }
}

impl From<sqlx::Error> for PipelineError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::RowNotFound => Self::NotFound("row not found".to_string()),
            other => Self::Database(other.to_string()),
        }
    }
}
