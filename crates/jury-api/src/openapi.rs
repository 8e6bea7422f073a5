//! # OpenAPI Specification Assembly
//!
//! Assembles all utoipa-documented routes into a single OpenAPI document,
//! served unauthenticated at `/openapi.json`.

use axum::routing::get;
use axum::{Json, Router};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::state::AppState;

/// Adds the bearer token security scheme to the OpenAPI document.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .description(Some("Static operator token. Set via AUTH_TOKEN env var."))
                        .build(),
                ),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Jury API",
        version = "0.1.0",
        description = "Decentralized dispute resolution for crop-insurance claims.\n\nA rejected claim becomes a dispute decided by a reputation-weighted random panel of jurors. The first ballot that reaches quorum finalizes the outcome, updates juror reputations and settles the policy on the ledger exactly once.\n\nAuthentication: `Authorization: Bearer <token>` on every `/v1/*` endpoint when `AUTH_TOKEN` is set. Health probes and this document are unauthenticated."
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development server"),
    ),
    security(
        ("bearer_auth" = [])
    ),
    paths(
        // ── Jurors ───────────────────────────────────────────────────────
        crate::routes::jurors::register_juror,
        crate::routes::jurors::list_jurors,
        crate::routes::jurors::get_juror,
        crate::routes::jurors::juror_eligibility,
        crate::routes::jurors::deactivate_juror,
        crate::routes::jurors::reactivate_juror,
        // ── Disputes ─────────────────────────────────────────────────────
        crate::routes::disputes::create_dispute,
        crate::routes::disputes::list_disputes,
        crate::routes::disputes::get_dispute,
        crate::routes::disputes::cast_vote,
        crate::routes::disputes::mark_processed,
        crate::routes::disputes::expire_disputes,
        // ── Settlements ──────────────────────────────────────────────────
        crate::routes::settlements::list_failed,
        crate::routes::settlements::retry_settlement,
        // ── Observability ────────────────────────────────────────────────
        crate::routes::observability::recent_events,
        crate::routes::observability::dispute_events,
        crate::routes::observability::stats,
    ),
    components(schemas(
        crate::error::ErrorBody,
        crate::error::ErrorDetail,
        crate::routes::jurors::RegisterJurorRequest,
        crate::routes::jurors::JurorResponse,
        crate::routes::jurors::EligibilityResponse,
        crate::routes::disputes::CreateDisputeRequest,
        crate::routes::disputes::CastVoteRequest,
        crate::routes::disputes::VoteResponse,
        crate::routes::disputes::ResolutionResponse,
        crate::routes::disputes::DisputeResponse,
        crate::routes::disputes::VoteReceiptResponse,
        crate::routes::disputes::ExpiredDisputeResponse,
        crate::routes::disputes::ExpireResponse,
        crate::routes::settlements::SettlementResponse,
        crate::routes::observability::EventResponse,
        crate::routes::observability::StatsResponse,
    )),
    modifiers(&SecurityAddon),
    tags(
        (name = "jurors", description = "Juror registry and eligibility"),
        (name = "disputes", description = "Dispute lifecycle and voting"),
        (name = "settlements", description = "Settlement dispatch and operator retry"),
        (name = "observability", description = "Event log and statistics"),
    )
)]
pub struct ApiDoc;

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

/// Router serving `/openapi.json`.
pub fn router() -> Router<AppState> {
    Router::new().route("/openapi.json", get(openapi_json))
}
