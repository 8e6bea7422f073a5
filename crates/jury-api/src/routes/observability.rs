//! # Event Log & Statistics Routes

use axum::extract::rejection::QueryRejection;
use axum::extract::{Path, Query, State};
use axum::routing::get;
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use jury_core::DisputeId;
use jury_engine::{DisputeEvent, DisputeStats};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::error::AppError;
use crate::extractors::{extract_validated_query, Validate};
use crate::state::AppState;

/// Events returned when no limit is given.
pub const DEFAULT_EVENT_LIMIT: usize = 100;
/// Upper bound on `limit`.
pub const MAX_EVENT_LIMIT: usize = 1_000;

#[derive(Debug, Deserialize, IntoParams)]
pub struct EventsQuery {
    /// Number of most recent events, 1-1000. Defaults to 100.
    pub limit: Option<usize>,
}

impl EventsQuery {
    fn effective_limit(&self) -> usize {
        self.limit.unwrap_or(DEFAULT_EVENT_LIMIT)
    }
}

impl Validate for EventsQuery {
    fn validate(&self) -> Result<(), String> {
        let limit = self.effective_limit();
        if limit == 0 || limit > MAX_EVENT_LIMIT {
            return Err(format!(
                "limit must be between 1 and {MAX_EVENT_LIMIT}, got {limit}"
            ));
        }
        Ok(())
    }
}

/// One lifecycle event.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct EventResponse {
    pub id: u64,
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dispute_id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub juror: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub choice: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    pub at: DateTime<Utc>,
}

/// Aggregate counters.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct StatsResponse {
    pub total_disputes: usize,
    pub active_disputes: usize,
    pub approved_disputes: usize,
    pub rejected_disputes: usize,
    pub total_votes_cast: usize,
    pub registered_jurors: usize,
    pub active_jurors: usize,
    pub settlements_completed: usize,
    pub settlements_failed: usize,
}

fn event_to_response(event: &DisputeEvent) -> EventResponse {
    EventResponse {
        id: event.id,
        kind: event.kind.as_str().to_string(),
        dispute_id: event.dispute_id.map(|id| id.value()),
        juror: event.juror.as_ref().map(ToString::to_string),
        choice: event.choice.map(|c| c.as_str().to_string()),
        outcome: event.outcome.map(|o| o.as_str().to_string()),
        detail: event.detail.clone(),
        at: event.at,
    }
}

fn stats_to_response(stats: DisputeStats) -> StatsResponse {
    StatsResponse {
        total_disputes: stats.total_disputes,
        active_disputes: stats.active_disputes,
        approved_disputes: stats.approved_disputes,
        rejected_disputes: stats.rejected_disputes,
        total_votes_cast: stats.total_votes_cast,
        registered_jurors: stats.registered_jurors,
        active_jurors: stats.active_jurors,
        settlements_completed: stats.settlements_completed,
        settlements_failed: stats.settlements_failed,
    }
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/events", get(recent_events))
        .route("/v1/disputes/:id/events", get(dispute_events))
        .route("/v1/stats", get(stats))
}

/// GET /v1/events - Most recent lifecycle events, newest last.
#[utoipa::path(
    get,
    path = "/v1/events",
    params(EventsQuery),
    responses(
        (status = 200, description = "Recent events", body = Vec<EventResponse>),
        (status = 422, description = "Limit out of range", body = crate::error::ErrorBody),
    ),
    tag = "observability"
)]
async fn recent_events(
    State(state): State<AppState>,
    query: Result<Query<EventsQuery>, QueryRejection>,
) -> Result<Json<Vec<EventResponse>>, AppError> {
    let limit = extract_validated_query(query)?.effective_limit();
    Ok(Json(
        state
            .service
            .recent_events(limit)
            .iter()
            .map(event_to_response)
            .collect(),
    ))
}

/// GET /v1/disputes/:id/events - Every retained event of one dispute.
#[utoipa::path(
    get,
    path = "/v1/disputes/{id}/events",
    params(("id" = u64, Path, description = "Dispute id")),
    responses(
        (status = 200, description = "Events of the dispute", body = Vec<EventResponse>),
        (status = 404, description = "Dispute not found", body = crate::error::ErrorBody),
    ),
    tag = "observability"
)]
async fn dispute_events(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<Json<Vec<EventResponse>>, AppError> {
    let id = DisputeId::new(id);
    state.service.dispute(id)?;
    Ok(Json(
        state
            .service
            .dispute_events(id)
            .iter()
            .map(event_to_response)
            .collect(),
    ))
}

/// GET /v1/stats - Aggregate dispute, juror and settlement counters.
#[utoipa::path(
    get,
    path = "/v1/stats",
    responses(
        (status = 200, description = "Current counters", body = StatsResponse),
    ),
    tag = "observability"
)]
async fn stats(State(state): State<AppState>) -> Json<StatsResponse> {
    Json(stats_to_response(state.service.stats()))
}
