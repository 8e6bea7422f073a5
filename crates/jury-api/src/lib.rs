//! # jury-api: Axum Administrative API
//!
//! HTTP surface over the [`jury_engine::JuryService`].
//!
//! ## API Surface
//!
//! | Prefix                          | Module                          | Domain              |
//! |---------------------------------|---------------------------------|---------------------|
//! | `/v1/jurors/*`                  | [`routes::jurors`]              | Juror registry      |
//! | `/v1/disputes/*`                | [`routes::disputes`]            | Disputes and votes  |
//! | `/v1/disputes/:id/settlement/*` | [`routes::settlements`]         | Settlement retry    |
//! | `/v1/settlements/*`             | [`routes::settlements`]         | Failed settlements  |
//! | `/v1/events`, `/v1/stats`       | [`routes::observability`]       | Event log, counters |
//!
//! ## Middleware Stack (execution order)
//!
//! ```text
//! TraceLayer -> require_operator -> Handler
//! ```
//!
//! Health probes and `/openapi.json` are mounted outside the auth
//! middleware.

pub mod auth;
pub mod error;
pub mod extractors;
pub mod openapi;
pub mod routes;
pub mod state;
pub mod sweeper;

use axum::extract::{DefaultBodyLimit, State};
use axum::http::StatusCode;
use axum::middleware::from_fn;
use axum::response::IntoResponse;
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::auth::OperatorAuth;
use crate::state::AppState;

/// Assemble the full application router with all routes and middleware.
pub fn app(state: AppState) -> Router {
    let operator_auth = OperatorAuth::new(state.config.auth_token.clone());

    let api = Router::new()
        .merge(routes::jurors::router())
        .merge(routes::disputes::router())
        .merge(routes::settlements::router())
        .merge(routes::observability::router())
        .layer(DefaultBodyLimit::max(state.config.body_limit_bytes))
        .layer(from_fn(auth::require_operator))
        .layer(TraceLayer::new_for_http())
        .layer(axum::Extension(operator_auth))
        .with_state(state.clone());

    let unauthenticated = Router::new()
        .route("/health/liveness", axum::routing::get(liveness))
        .route("/health/readiness", axum::routing::get(readiness))
        .merge(openapi::router())
        .with_state(state);

    Router::new().merge(unauthenticated).merge(api)
}

/// Liveness probe: the process is up.
async fn liveness() -> &'static str {
    "ok"
}

/// Readiness probe: the service can answer queries.
///
/// Jurors are registered through this API, so an empty registry still
/// counts as ready; a thin registry is logged instead.
async fn readiness(State(state): State<AppState>) -> impl IntoResponse {
    let required = state.service.config().panel.panel_size;
    let active = state.service.stats().active_jurors;
    if active <= required {
        tracing::debug!(active, required, "too few active jurors to staff a panel");
    }
    (StatusCode::OK, "ready")
}
