//! Dashboard action results and errors.
//!
//! Reads fail with an [`ActionError`] carrying a fixed, user-facing message;
//! the underlying cause is logged where it happens. Writes answer with an
//! [`ActionResult`] so form posts can show inline errors.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::auth::ErrorResponse;

/// Errors raised by guarded dashboard actions.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ActionError {
    /// No valid session.
    #[error("Not authenticated")]
    NotAuthenticated,

    /// Session valid but none of the required roles held.
    #[error("Access denied. Required roles: {0}")]
    AccessDenied(String),

    /// Caller is authenticated but not allowed to see this data.
    #[error("{0}")]
    Forbidden(&'static str),

    /// Bad caller input.
    #[error("{0}")]
    Invalid(String),

    /// Requested record does not exist.
    #[error("{0}")]
    NotFound(&'static str),

    /// Storage failure, reported with a generic message.
    #[error("{0}")]
    Failed(&'static str),
}

impl IntoResponse for ActionError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            Self::NotAuthenticated => (StatusCode::UNAUTHORIZED, "NOT_AUTHENTICATED"),
            Self::AccessDenied(_) => (StatusCode::FORBIDDEN, "ACCESS_DENIED"),
            Self::Forbidden(_) => (StatusCode::FORBIDDEN, "FORBIDDEN"),
            Self::Invalid(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
            Self::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            Self::Failed(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        };

        let body = Json(ErrorResponse {
            error: code.to_string(),
            message: self.to_string(),
        });

        (status, body).into_response()
    }
}

/// Outcome of a form-style write action.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

impl ActionResult {
    #[must_use]
    pub fn ok() -> Self {
        Self {
            success: true,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn ok_with_message(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn fail(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_id(mut self, id: impl ToString) -> Self {
        self.id = Some(id.to_string());
        self
    }
}

impl IntoResponse for ActionResult {
    fn into_response(self) -> Response {
        Json(self).into_response()
    }
}
