//! # API Error Types
//!
//! Structured error type implementing `axum::response::IntoResponse`.
//! Maps [`JuryError`] variants to HTTP status codes and returns JSON bodies
//! of the form `{"error": {"code", "message"}}`. Ledger failure details are
//! logged, never returned.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use jury_core::JuryError;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

/// Structured JSON error response body.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

/// Inner error detail.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorDetail {
    /// Machine-readable error code (e.g., "DUPLICATE_VOTE").
    pub code: String,
    /// Human-readable error message.
    pub message: String,
    /// Additional context for some client errors.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// Application-level error type that implements [`IntoResponse`] for Axum.
#[derive(Error, Debug)]
pub enum AppError {
    /// A domain error from the dispute service.
    #[error(transparent)]
    Domain(#[from] JuryError),

    /// Request body is not valid JSON for the endpoint (400).
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Request is well-formed but its values are not acceptable (422).
    #[error("validation error: {0}")]
    Validation(String),

    /// Missing or invalid bearer token (401).
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Internal server error (500). Message is logged but not returned to client.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Return the HTTP status code and machine-readable error code for this error.
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            Self::Domain(err) => (domain_status(err), err.code()),
            Self::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            Self::Validation(_) => (StatusCode::UNPROCESSABLE_ENTITY, "VALIDATION_ERROR"),
            Self::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            Self::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }

    /// Client-safe message.
    fn public_message(&self) -> String {
        match self {
            Self::Internal(_) => "An internal error occurred".to_string(),
            Self::Domain(JuryError::LedgerUnavailable(_)) => {
                "The policy ledger is unavailable".to_string()
            }
            Self::Domain(JuryError::SettlementFailed {
                dispute_id,
                attempts,
                ..
            }) => format!(
                "settlement of {dispute_id} failed after {attempts} attempt(s); \
                 an operator retry is required"
            ),
            Self::Domain(err) => err.to_string(),
            other => other.to_string(),
        }
    }

    fn details(&self) -> Option<serde_json::Value> {
        match self {
            Self::Domain(JuryError::InsufficientJurors {
                required,
                available,
            }) => Some(serde_json::json!({
                "required": required,
                "available": available,
            })),
            Self::Domain(JuryError::DuplicateDispute { dispute_id, .. }) => {
                Some(serde_json::json!({ "open_dispute_id": dispute_id.value() }))
            }
            _ => None,
        }
    }
}

fn domain_status(err: &JuryError) -> StatusCode {
    match err {
        JuryError::NotFound { .. } | JuryError::PolicyNotFound(_) => StatusCode::NOT_FOUND,
        JuryError::InvalidAddress(_) | JuryError::InvalidReason(_) => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        JuryError::AlreadyRegistered(_)
        | JuryError::DuplicateDispute { .. }
        | JuryError::DuplicateVote { .. }
        | JuryError::AlreadyResolved { .. }
        | JuryError::NotResolved { .. }
        | JuryError::SettlementInProgress(_)
        | JuryError::PolicyAlreadySettled(_) => StatusCode::CONFLICT,
        JuryError::NotAssigned { .. } | JuryError::InvalidClaimant { .. } => StatusCode::FORBIDDEN,
        JuryError::DeadlineExpired { .. } => StatusCode::GONE,
        JuryError::VoteCooldown { .. } => StatusCode::TOO_MANY_REQUESTS,
        JuryError::InsufficientJurors { .. } => StatusCode::SERVICE_UNAVAILABLE,
        JuryError::LedgerUnavailable(_) | JuryError::SettlementFailed { .. } => {
            StatusCode::BAD_GATEWAY
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        match &self {
            Self::Internal(_) => tracing::error!(error = %self, "internal server error"),
            Self::Domain(JuryError::LedgerUnavailable(_) | JuryError::SettlementFailed { .. }) => {
                tracing::error!(error = %self, "policy ledger error")
            }
            Self::Domain(JuryError::InsufficientJurors { .. }) => {
                tracing::warn!(error = %self, "service unavailable")
            }
            _ => tracing::debug!(error = %self, %status, "request rejected"),
        }

        let body = ErrorBody {
            error: ErrorDetail {
                code: code.to_string(),
                message: self.public_message(),
                details: self.details(),
            },
        };
        (status, Json(body)).into_response()
    }
}
