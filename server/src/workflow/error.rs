//! Workflow Error Types

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::auth::ErrorResponse;
use crate::email::EmailError;

#[derive(Debug, Error)]
pub enum WorkflowError {
    /// A step failed in a way another attempt may fix.
    #[error("{0}")]
    Step(String),

    /// A step failed in a way no retry can fix.
    #[error("{0}")]
    Fatal(String),

    #[error("Invalid event payload: {0}")]
    Payload(#[from] serde_json::Error),

    #[error("Event queue error: {0}")]
    Queue(String),

    #[error(transparent)]
    Email(#[from] EmailError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Invalid event signature")]
    InvalidSignature,

    #[error("Event ingestion is not configured")]
    NotConfigured,
}

impl WorkflowError {
    /// Whether the runtime should schedule another attempt.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Step(_) | Self::Queue(_) | Self::Database(_) => true,
            Self::Email(e) => e.is_retryable(),
            Self::Fatal(_) | Self::Payload(_) | Self::InvalidSignature | Self::NotConfigured => {
                false
            }
        }
    }
}

impl From<fred::error::Error> for WorkflowError {
    fn from(e: fred::error::Error) -> Self {
        Self::Queue(e.to_string())
    }
}

impl IntoResponse for WorkflowError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            Self::InvalidSignature => (StatusCode::UNAUTHORIZED, "INVALID_SIGNATURE"),
            Self::Payload(_) => (StatusCode::BAD_REQUEST, "INVALID_EVENT"),
            Self::Queue(_) => (StatusCode::SERVICE_UNAVAILABLE, "QUEUE_UNAVAILABLE"),
            Self::NotConfigured => (StatusCode::SERVICE_UNAVAILABLE, "NOT_CONFIGURED"),
            _ => (StatusCode::INTERNAL_SERVER_ERROR, "WORKFLOW_ERROR"),
        };

        let body = ErrorResponse {
            error: code.to_string(),
            message: self.to_string(),
        };

        (status, Json(body)).into_response()
    }
}
