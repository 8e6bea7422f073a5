//! # Juror Registry Routes
//!
//! Registration, lookup, eligibility and operator activation controls.
//! Deactivated jurors keep their record and their seats on panels they
//! already sit on; they are only excluded from future draws.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use jury_core::JurorAddress;
use jury_engine::{Eligibility, Juror};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::AppError;
use crate::extractors::extract_json;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / Response types
// ---------------------------------------------------------------------------

/// Request to register a juror.
#[derive(Debug, Deserialize, ToSchema)]
pub struct RegisterJurorRequest {
    /// Account address. 1-128 characters: letters, digits, `-`, `_`, `:` or `.`.
    pub address: String,
}

/// A registered juror.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct JurorResponse {
    pub address: String,
    pub reputation: u64,
    pub total_votes: u64,
    pub correct_votes: u64,
    /// Stake in micro-units.
    pub staked_amount: u64,
    pub registered_at: DateTime<Utc>,
    pub last_vote_at: Option<DateTime<Utc>>,
    pub active: bool,
}

/// Whether a juror can be drawn onto new panels.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct EligibilityResponse {
    pub address: String,
    /// One of `eligible`, `not_registered`, `inactive`, `cooling_down`, `low_reputation`.
    pub status: String,
    pub eligible: bool,
    /// Set when `status` is `cooling_down`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub eligible_at: Option<DateTime<Utc>>,
    /// Set when `status` is `low_reputation`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reputation: Option<u64>,
    /// Set when `status` is `low_reputation`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minimum: Option<u64>,
}

pub(crate) fn juror_to_response(juror: &Juror) -> JurorResponse {
    JurorResponse {
        address: juror.address.to_string(),
        reputation: juror.reputation,
        total_votes: juror.total_votes,
        correct_votes: juror.correct_votes,
        staked_amount: juror.staked_amount,
        registered_at: juror.registered_at,
        last_vote_at: juror.last_vote_at,
        active: juror.active,
    }
}

fn eligibility_to_response(address: &JurorAddress, eligibility: &Eligibility) -> EligibilityResponse {
    let mut response = EligibilityResponse {
        address: address.to_string(),
        status: String::new(),
        eligible: eligibility.is_eligible(),
        eligible_at: None,
        reputation: None,
        minimum: None,
    };
    response.status = match eligibility {
        Eligibility::NotRegistered => "not_registered",
        Eligibility::Inactive => "inactive",
        Eligibility::CoolingDown { eligible_at } => {
            response.eligible_at = Some(*eligible_at);
            "cooling_down"
        }
        Eligibility::LowReputation {
            reputation,
            minimum,
        } => {
            response.reputation = Some(*reputation);
            response.minimum = Some(*minimum);
            "low_reputation"
        }
        Eligibility::Eligible => "eligible",
    }
    .to_string();
    response
}

/// Build the juror router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/jurors", post(register_juror).get(list_jurors))
        .route("/v1/jurors/:address", get(get_juror))
        .route("/v1/jurors/:address/eligibility", get(juror_eligibility))
        .route("/v1/jurors/:address/deactivate", post(deactivate_juror))
        .route("/v1/jurors/:address/reactivate", post(reactivate_juror))
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /v1/jurors - Register a juror.
#[utoipa::path(
    post,
    path = "/v1/jurors",
    request_body = RegisterJurorRequest,
    responses(
        (status = 201, description = "Juror registered", body = JurorResponse),
        (status = 409, description = "Address already registered", body = crate::error::ErrorBody),
        (status = 422, description = "Malformed address", body = crate::error::ErrorBody),
    ),
    tag = "jurors"
)]
pub(crate) async fn register_juror(
    State(state): State<AppState>,
    body: Result<Json<RegisterJurorRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<JurorResponse>), AppError> {
    let req = extract_json(body)?;
    let address = JurorAddress::new(req.address)?;
    let juror = state.service.register_juror(address)?;
    Ok((StatusCode::CREATED, Json(juror_to_response(&juror))))
}

/// GET /v1/jurors - List jurors ordered by address.
#[utoipa::path(
    get,
    path = "/v1/jurors",
    responses(
        (status = 200, description = "All registered jurors", body = Vec<JurorResponse>),
    ),
    tag = "jurors"
)]
pub(crate) async fn list_jurors(State(state): State<AppState>) -> Json<Vec<JurorResponse>> {
    Json(state.service.jurors().iter().map(juror_to_response).collect())
}

/// GET /v1/jurors/:address - Juror record.
#[utoipa::path(
    get,
    path = "/v1/jurors/{address}",
    params(("address" = String, Path, description = "Juror address")),
    responses(
        (status = 200, description = "Juror record", body = JurorResponse),
        (status = 404, description = "Juror not registered", body = crate::error::ErrorBody),
    ),
    tag = "jurors"
)]
pub(crate) async fn get_juror(
    State(state): State<AppState>,
    Path(address): Path<String>,
) -> Result<Json<JurorResponse>, AppError> {
    let address = JurorAddress::new(address)?;
    let juror = state.service.juror(&address)?;
    Ok(Json(juror_to_response(&juror)))
}

/// GET /v1/jurors/:address/eligibility - Whether the juror can be drawn.
#[utoipa::path(
    get,
    path = "/v1/jurors/{address}/eligibility",
    params(("address" = String, Path, description = "Juror address")),
    responses(
        (status = 200, description = "Eligibility verdict", body = EligibilityResponse),
        (status = 422, description = "Malformed address", body = crate::error::ErrorBody),
    ),
    tag = "jurors"
)]
pub(crate) async fn juror_eligibility(
    State(state): State<AppState>,
    Path(address): Path<String>,
) -> Result<Json<EligibilityResponse>, AppError> {
    let address = JurorAddress::new(address)?;
    let eligibility = state.service.eligibility(&address);
    Ok(Json(eligibility_to_response(&address, &eligibility)))
}

/// POST /v1/jurors/:address/deactivate - Exclude from future panels.
#[utoipa::path(
    post,
    path = "/v1/jurors/{address}/deactivate",
    params(("address" = String, Path, description = "Juror address")),
    responses(
        (status = 200, description = "Juror deactivated", body = JurorResponse),
        (status = 404, description = "Juror not registered", body = crate::error::ErrorBody),
    ),
    tag = "jurors"
)]
pub(crate) async fn deactivate_juror(
    State(state): State<AppState>,
    Path(address): Path<String>,
) -> Result<Json<JurorResponse>, AppError> {
    let address = JurorAddress::new(address)?;
    let juror = state.service.deactivate_juror(&address)?;
    Ok(Json(juror_to_response(&juror)))
}

/// POST /v1/jurors/:address/reactivate - Make drawable again.
#[utoipa::path(
    post,
    path = "/v1/jurors/{address}/reactivate",
    params(("address" = String, Path, description = "Juror address")),
    responses(
        (status = 200, description = "Juror reactivated", body = JurorResponse),
        (status = 404, description = "Juror not registered", body = crate::error::ErrorBody),
    ),
    tag = "jurors"
)]
pub(crate) async fn reactivate_juror(
    State(state): State<AppState>,
    Path(address): Path<String>,
) -> Result<Json<JurorResponse>, AppError> {
    let address = JurorAddress::new(address)?;
    let juror = state.service.reactivate_juror(&address)?;
    Ok(Json(juror_to_response(&juror)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn addr(s: &str) -> JurorAddress {
        JurorAddress::new(s).unwrap()
    }

    #[test]
    fn cooling_down_carries_eligible_at() {
        let at = Utc.with_ymd_and_hms(2026, 7, 2, 0, 0, 0).unwrap();
        let r = eligibility_to_response(&addr("j1"), &Eligibility::CoolingDown { eligible_at: at });
        assert_eq!(r.status, "cooling_down");
        assert!(!r.eligible);
        assert_eq!(r.eligible_at, Some(at));
        assert!(r.reputation.is_none());
    }

    #[test]
    fn low_reputation_carries_scores() {
        let r = eligibility_to_response(
            &addr("j1"),
            &Eligibility::LowReputation {
                reputation: 4,
                minimum: 10,
            },
        );
        assert_eq!(r.status, "low_reputation");
        assert_eq!((r.reputation, r.minimum), (Some(4), Some(10)));
    }

    #[test]
    fn eligible_is_flagged() {
        let r = eligibility_to_response(&addr("j1"), &Eligibility::Eligible);
        assert_eq!(r.status, "eligible");
        assert!(r.eligible);
    }
}
