//! # Settlement Routes
//!
//! Operator view of settlement dispatch: the resolutions the policy ledger
//! has not yet accepted, and the explicit retry that re-drives one of them.

use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use jury_core::DisputeId;
use jury_engine::{SettlementRecord, SettlementStatus};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::AppError;
use crate::state::AppState;

/// Settlement state of one resolved dispute.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SettlementResponse {
    pub dispute_id: u64,
    pub policy_id: u64,
    /// `approved` or `rejected`.
    pub outcome: String,
    /// `in_flight`, `settled` or `failed`.
    pub state: String,
    /// Ledger calls made so far, across retries.
    pub attempts: u32,
    /// Key sent with every settle call for this dispute.
    pub idempotency_key: String,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payout_amount: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub settled_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed_at: Option<DateTime<Utc>>,
}

pub(crate) fn settlement_to_response(record: &SettlementRecord) -> SettlementResponse {
    let mut response = SettlementResponse {
        dispute_id: record.dispute_id.value(),
        policy_id: record.policy_id.value(),
        outcome: record.outcome.as_str().to_string(),
        state: String::new(),
        attempts: record.attempts,
        idempotency_key: record.idempotency_key(),
        updated_at: record.updated_at,
        payout_amount: None,
        settled_at: None,
        last_error: None,
        failed_at: None,
    };
    response.state = match &record.status {
        SettlementStatus::InFlight => "in_flight",
        SettlementStatus::Settled {
            payout_amount,
            settled_at,
        } => {
            response.payout_amount = Some(*payout_amount);
            response.settled_at = Some(*settled_at);
            "settled"
        }
        SettlementStatus::Failed {
            last_error,
            failed_at,
        } => {
            response.last_error = Some(last_error.clone());
            response.failed_at = Some(*failed_at);
            "failed"
        }
    }
    .to_string();
    response
}

/// Build the settlement router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/settlements/failed", get(list_failed))
        .route("/v1/disputes/:id/settlement/retry", post(retry_settlement))
}

/// GET /v1/settlements/failed - Resolutions waiting for an operator retry.
#[utoipa::path(
    get,
    path = "/v1/settlements/failed",
    responses(
        (status = 200, description = "Failed settlements, oldest dispute first", body = Vec<SettlementResponse>),
    ),
    tag = "settlements"
)]
async fn list_failed(State(state): State<AppState>) -> Json<Vec<SettlementResponse>> {
    Json(
        state
            .service
            .failed_settlements()
            .iter()
            .map(settlement_to_response)
            .collect(),
    )
}

/// POST /v1/disputes/:id/settlement/retry - Re-run a failed settlement.
///
/// Returns the settled record. A dispute that is already settled returns its
/// record unchanged without calling the ledger again.
#[utoipa::path(
    post,
    path = "/v1/disputes/{id}/settlement/retry",
    params(("id" = u64, Path, description = "Dispute id")),
    responses(
        (status = 200, description = "Settlement record after the retry", body = SettlementResponse),
        (status = 404, description = "Dispute not found", body = crate::error::ErrorBody),
        (status = 409, description = "Dispute still active or a settlement is in flight", body = crate::error::ErrorBody),
        (status = 502, description = "The ledger rejected or could not be reached", body = crate::error::ErrorBody),
    ),
    tag = "settlements"
)]
async fn retry_settlement(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<Json<SettlementResponse>, AppError> {
    let record = state.service.retry_settlement(DisputeId::new(id)).await?;
    Ok(Json(settlement_to_response(&record)))
}
