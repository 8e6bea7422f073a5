//! # Dispute Routes
//!
//! HTTP surface for the dispute lifecycle: open a dispute on a rejected
//! claim, cast ballots, force expiry of overdue disputes, and archive
//! resolved ones.
//!
//! ## Lifecycle
//!
//! ```text
//! Active ──quorum or expiry──▶ Approved | Rejected ──settle──▶ (processed)
//! ```
//!
//! The ballot that reaches quorum finalizes the dispute and triggers
//! settlement; its response carries both the resolution and the
//! settlement record.

use std::str::FromStr;

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use jury_core::{DisputeId, JurorAddress, PolicyId};
use jury_engine::{
    Dispute, DisputeStatus, ExpiredDispute, Resolution, SettlementRecord, VoteChoice, VoteReceipt,
};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::error::AppError;
use crate::extractors::{extract_json, extract_query, extract_validated_json, Validate};
use crate::routes::settlements::{settlement_to_response, SettlementResponse};
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / Response types
// ---------------------------------------------------------------------------

/// Request to open a dispute on a rejected claim.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateDisputeRequest {
    /// Policy whose claim was rejected.
    pub policy_id: u64,
    /// Policy owner opening the dispute.
    pub claimant: String,
    /// Claimant's statement. 1-1024 characters.
    pub reason: String,
}

/// A ballot.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CastVoteRequest {
    /// Voting juror's address.
    pub juror: String,
    /// `yes` to pay the claim, `no` to deny it.
    pub choice: String,
}

impl Validate for CastVoteRequest {
    fn validate(&self) -> Result<(), String> {
        VoteChoice::from_str(&self.choice).map(|_| ())
    }
}

/// Query parameters for listing disputes.
#[derive(Debug, Deserialize, IntoParams)]
pub struct ListDisputesQuery {
    /// Filter by status: `active`, `approved` or `rejected`.
    pub status: Option<String>,
}

/// A recorded ballot.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct VoteResponse {
    pub juror: String,
    pub choice: String,
    pub cast_at: DateTime<Utc>,
}

/// How a dispute was finalized.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ResolutionResponse {
    /// `approved` or `rejected`.
    pub outcome: String,
    /// `quorum_reached` or `deadline_expired`.
    pub reason: String,
    pub resolved_at: DateTime<Utc>,
}

/// Full dispute state.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DisputeResponse {
    pub id: u64,
    pub policy_id: u64,
    pub claimant: String,
    pub reason: String,
    pub created_at: DateTime<Utc>,
    /// `active`, `approved` or `rejected`.
    pub status: String,
    pub yes_votes: usize,
    pub no_votes: usize,
    pub total_votes: usize,
    pub voting_deadline: DateTime<Utc>,
    pub assigned_jurors: Vec<String>,
    /// Hex of the seed that drew the panel.
    pub selection_seed: String,
    pub votes: Vec<VoteResponse>,
    pub resolution: Option<ResolutionResponse>,
    pub processed: bool,
    /// Present once settlement dispatch started.
    pub settlement: Option<SettlementResponse>,
}

/// Result of an accepted ballot.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct VoteReceiptResponse {
    pub dispute_id: u64,
    pub juror: String,
    pub choice: String,
    pub yes_votes: usize,
    pub no_votes: usize,
    pub total_votes: usize,
    pub status: String,
    /// Present when this ballot finalized the dispute.
    pub resolution: Option<ResolutionResponse>,
    /// Present when this ballot triggered settlement.
    pub settlement: Option<SettlementResponse>,
}

/// One dispute force-resolved by expiry.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ExpiredDisputeResponse {
    pub dispute_id: u64,
    pub outcome: String,
    pub total_votes: usize,
    pub settlement: SettlementResponse,
}

/// Result of an expiry sweep.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ExpireResponse {
    pub expired: Vec<ExpiredDisputeResponse>,
}

fn resolution_to_response(resolution: &Resolution) -> ResolutionResponse {
    ResolutionResponse {
        outcome: resolution.outcome.as_str().to_string(),
        reason: resolution.reason.as_str().to_string(),
        resolved_at: resolution.resolved_at,
    }
}

pub(crate) fn dispute_to_response(
    dispute: &Dispute,
    settlement: Option<&SettlementRecord>,
) -> DisputeResponse {
    DisputeResponse {
        id: dispute.id.value(),
        policy_id: dispute.policy_id.value(),
        claimant: dispute.claimant.to_string(),
        reason: dispute.reason.clone(),
        created_at: dispute.created_at,
        status: dispute.status.as_str().to_string(),
        yes_votes: dispute.yes_votes,
        no_votes: dispute.no_votes,
        total_votes: dispute.total_votes,
        voting_deadline: dispute.voting_deadline,
        assigned_jurors: dispute
            .assigned_jurors
            .iter()
            .map(ToString::to_string)
            .collect(),
        selection_seed: dispute.selection_seed.clone(),
        votes: dispute
            .votes
            .iter()
            .map(|v| VoteResponse {
                juror: v.juror.to_string(),
                choice: v.choice.as_str().to_string(),
                cast_at: v.cast_at,
            })
            .collect(),
        resolution: dispute.resolution.as_ref().map(resolution_to_response),
        processed: dispute.processed,
        settlement: settlement.map(settlement_to_response),
    }
}

fn receipt_to_response(receipt: &VoteReceipt) -> VoteReceiptResponse {
    VoteReceiptResponse {
        dispute_id: receipt.dispute_id.value(),
        juror: receipt.juror.to_string(),
        choice: receipt.choice.as_str().to_string(),
        yes_votes: receipt.yes_votes,
        no_votes: receipt.no_votes,
        total_votes: receipt.total_votes,
        status: receipt.status.as_str().to_string(),
        resolution: receipt.resolution.as_ref().map(resolution_to_response),
        settlement: receipt.settlement.as_ref().map(settlement_to_response),
    }
}

fn expired_to_response(expired: &ExpiredDispute) -> ExpiredDisputeResponse {
    ExpiredDisputeResponse {
        dispute_id: expired.dispute_id.value(),
        outcome: expired.outcome.as_str().to_string(),
        total_votes: expired.total_votes,
        settlement: settlement_to_response(&expired.settlement),
    }
}

/// Build the dispute router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/disputes", post(create_dispute).get(list_disputes))
        .route("/v1/disputes/expire", post(expire_disputes))
        .route("/v1/disputes/:id", get(get_dispute))
        .route("/v1/disputes/:id/votes", post(cast_vote))
        .route("/v1/disputes/:id/processed", post(mark_processed))
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /v1/disputes - Open a dispute and draw its panel.
#[utoipa::path(
    post,
    path = "/v1/disputes",
    request_body = CreateDisputeRequest,
    responses(
        (status = 201, description = "Dispute opened with its panel", body = DisputeResponse),
        (status = 403, description = "Claimant does not own the policy", body = crate::error::ErrorBody),
        (status = 404, description = "Policy not on the ledger", body = crate::error::ErrorBody),
        (status = 409, description = "Policy already settled or already disputed", body = crate::error::ErrorBody),
        (status = 422, description = "Malformed claimant or reason", body = crate::error::ErrorBody),
        (status = 502, description = "Policy ledger unavailable", body = crate::error::ErrorBody),
        (status = 503, description = "Not enough eligible jurors", body = crate::error::ErrorBody),
    ),
    tag = "disputes"
)]
async fn create_dispute(
    State(state): State<AppState>,
    body: Result<Json<CreateDisputeRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<DisputeResponse>), AppError> {
    let req = extract_json(body)?;
    let claimant = JurorAddress::new(req.claimant)?;
    let dispute = state
        .service
        .create_dispute(PolicyId::new(req.policy_id), claimant, req.reason)
        .await?;
    Ok((StatusCode::CREATED, Json(dispute_to_response(&dispute, None))))
}

/// GET /v1/disputes - List disputes by id, optionally filtered by status.
#[utoipa::path(
    get,
    path = "/v1/disputes",
    params(ListDisputesQuery),
    responses(
        (status = 200, description = "Disputes ordered by id", body = Vec<DisputeResponse>),
        (status = 422, description = "Unknown status filter", body = crate::error::ErrorBody),
    ),
    tag = "disputes"
)]
async fn list_disputes(
    State(state): State<AppState>,
    query: Result<Query<ListDisputesQuery>, QueryRejection>,
) -> Result<Json<Vec<DisputeResponse>>, AppError> {
    let status = extract_query(query)?
        .status
        .as_deref()
        .map(DisputeStatus::from_str)
        .transpose()
        .map_err(AppError::Validation)?;
    let responses = state
        .service
        .disputes(status)
        .iter()
        .map(|d| dispute_to_response(d, state.service.settlement(d.id).as_ref()))
        .collect();
    Ok(Json(responses))
}

/// GET /v1/disputes/:id - Dispute state with its settlement record.
#[utoipa::path(
    get,
    path = "/v1/disputes/{id}",
    params(("id" = u64, Path, description = "Dispute id")),
    responses(
        (status = 200, description = "Dispute details", body = DisputeResponse),
        (status = 404, description = "Dispute not found", body = crate::error::ErrorBody),
    ),
    tag = "disputes"
)]
async fn get_dispute(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<Json<DisputeResponse>, AppError> {
    let id = DisputeId::new(id);
    let dispute = state.service.dispute(id)?;
    let settlement = state.service.settlement(id);
    Ok(Json(dispute_to_response(&dispute, settlement.as_ref())))
}

/// POST /v1/disputes/:id/votes - Cast a ballot.
#[utoipa::path(
    post,
    path = "/v1/disputes/{id}/votes",
    params(("id" = u64, Path, description = "Dispute id")),
    request_body = CastVoteRequest,
    responses(
        (status = 200, description = "Ballot accepted", body = VoteReceiptResponse),
        (status = 403, description = "Juror not on the panel", body = crate::error::ErrorBody),
        (status = 404, description = "Dispute not found", body = crate::error::ErrorBody),
        (status = 409, description = "Duplicate ballot or dispute already resolved", body = crate::error::ErrorBody),
        (status = 410, description = "Voting window closed", body = crate::error::ErrorBody),
        (status = 422, description = "Malformed juror or choice", body = crate::error::ErrorBody),
        (status = 429, description = "Juror voted too recently", body = crate::error::ErrorBody),
    ),
    tag = "disputes"
)]
async fn cast_vote(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    body: Result<Json<CastVoteRequest>, JsonRejection>,
) -> Result<Json<VoteReceiptResponse>, AppError> {
    let req = extract_validated_json(body)?;
    let choice = VoteChoice::from_str(&req.choice).map_err(AppError::Validation)?;
    let juror = JurorAddress::new(req.juror)?;
    let receipt = state
        .service
        .vote(DisputeId::new(id), juror, choice)
        .await?;
    Ok(Json(receipt_to_response(&receipt)))
}

/// POST /v1/disputes/:id/processed - Archive a resolved dispute.
#[utoipa::path(
    post,
    path = "/v1/disputes/{id}/processed",
    params(("id" = u64, Path, description = "Dispute id")),
    responses(
        (status = 200, description = "Dispute marked processed", body = DisputeResponse),
        (status = 404, description = "Dispute not found", body = crate::error::ErrorBody),
        (status = 409, description = "Dispute still active", body = crate::error::ErrorBody),
    ),
    tag = "disputes"
)]
async fn mark_processed(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<Json<DisputeResponse>, AppError> {
    let id = DisputeId::new(id);
    let dispute = state.service.mark_processed(id)?;
    let settlement = state.service.settlement(id);
    Ok(Json(dispute_to_response(&dispute, settlement.as_ref())))
}

/// POST /v1/disputes/expire - Resolve every overdue dispute now.
///
/// The background sweeper does the same on its interval; calling this is
/// safe at any time because each dispute expires exactly once.
#[utoipa::path(
    post,
    path = "/v1/disputes/expire",
    responses(
        (status = 200, description = "Disputes resolved by this sweep", body = ExpireResponse),
    ),
    tag = "disputes"
)]
async fn expire_disputes(State(state): State<AppState>) -> Json<ExpireResponse> {
    let expired = state.service.expire_overdue().await;
    Json(ExpireResponse {
        expired: expired.iter().map(expired_to_response).collect(),
    })
}
