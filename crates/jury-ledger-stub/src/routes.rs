//! Route definitions for the policy ledger stub.
//!
//! Implements the endpoints `HttpPolicyLedger` calls, with bodies that
//! deserialize into its types, plus development helpers to create policies
//! and queue settle failures.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use jury_core::{JurorAddress, PolicyId};
use jury_ledger::{LedgerError, PolicyLedger, PolicyRecord, SettleRequest, SettleResponse};
use serde::Deserialize;
use serde_json::json;

use crate::store::AppState;

/// Build the complete stub router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/v1/policies", post(create_policy).get(list_policies))
        .route("/v1/policies/:id", get(get_policy))
        .route("/v1/policies/:id/settle", post(settle_policy))
        .route("/v1/faults", post(queue_faults))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
struct CreatePolicyRequest {
    owner: String,
    coverage_cap: u64,
}

/// Number of upcoming settle calls to fail with 503.
#[derive(Debug, Deserialize)]
struct FaultRequest {
    unavailable: usize,
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(json!({ "error": message.into() }))).into_response()
}

fn ledger_error_response(err: LedgerError) -> Response {
    let status = match &err {
        LedgerError::PolicyNotFound(_) => StatusCode::NOT_FOUND,
        LedgerError::AlreadySettled(_) => StatusCode::CONFLICT,
        LedgerError::Unavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
        LedgerError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
        LedgerError::Rejected { status, .. } => {
            StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_REQUEST)
        }
    };
    error_response(status, err.to_string())
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

async fn create_policy(
    State(state): State<AppState>,
    body: Result<Json<CreatePolicyRequest>, JsonRejection>,
) -> Response {
    let req = match body {
        Ok(Json(req)) => req,
        Err(e) => return error_response(StatusCode::BAD_REQUEST, e.body_text()),
    };
    let owner = match JurorAddress::new(req.owner) {
        Ok(owner) => owner,
        Err(e) => return error_response(StatusCode::UNPROCESSABLE_ENTITY, e.to_string()),
    };
    let record = state.ledger().create_policy(owner, req.coverage_cap);
    tracing::info!(
        policy_id = record.policy_id.value(),
        owner = %record.owner,
        coverage_cap = record.coverage_cap,
        "policy created"
    );
    (StatusCode::CREATED, Json(record)).into_response()
}

async fn list_policies(State(state): State<AppState>) -> Json<Vec<PolicyRecord>> {
    Json(state.ledger().policies())
}

async fn get_policy(State(state): State<AppState>, Path(id): Path<u64>) -> Response {
    match state.ledger().policy(PolicyId::new(id)) {
        Ok(record) => Json(record).into_response(),
        Err(e) => ledger_error_response(e),
    }
}

async fn settle_policy(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    body: Result<Json<SettleRequest>, JsonRejection>,
) -> Response {
    let req = match body {
        Ok(Json(req)) => req,
        Err(e) => return error_response(StatusCode::BAD_REQUEST, e.body_text()),
    };
    let policy_id = PolicyId::new(id);
    match state
        .ledger()
        .settle(policy_id, req.approved, &req.idempotency_key)
    {
        Ok(payout_amount) => {
            tracing::info!(
                policy_id = id,
                approved = req.approved,
                payout_amount,
                idempotency_key = %req.idempotency_key,
                "policy settled"
            );
            Json(SettleResponse { payout_amount }).into_response()
        }
        Err(e) => {
            tracing::warn!(policy_id = id, "settle refused: {e}");
            ledger_error_response(e)
        }
    }
}

async fn queue_faults(
    State(state): State<AppState>,
    body: Result<Json<FaultRequest>, JsonRejection>,
) -> Response {
    let req = match body {
        Ok(Json(req)) => req,
        Err(e) => return error_response(StatusCode::BAD_REQUEST, e.body_text()),
    };
    state.ledger().inject_settle_failures(
        std::iter::repeat_with(|| LedgerError::Unavailable {
            reason: "injected fault".into(),
        })
        .take(req.unavailable),
    );
    tracing::info!(count = req.unavailable, "settle faults queued");
    Json(json!({ "queued": req.unavailable })).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use http_body_util::BodyExt;
    use serde_json::Value;
    use tower::ServiceExt;

    async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = axum::http::Request::builder().method(method).uri(uri);
        let body = match body {
            Some(v) => {
                builder = builder.header("content-type", "application/json");
                Body::from(v.to_string())
            }
            None => Body::empty(),
        };
        let resp = app.clone().oneshot(builder.body(body).unwrap()).await.unwrap();
        let status = resp.status();
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    async fn create(app: &Router) -> u64 {
        let (status, body) = send(
            app,
            "POST",
            "/v1/policies",
            Some(json!({"owner": "farmer-1", "coverage_cap": 5_000})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        body["policy_id"].as_u64().unwrap()
    }

    #[tokio::test]
    async fn health_returns_200() {
        let app = router(AppState::new());
        let (status, body) = send(&app, "GET", "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn create_then_fetch_policy() {
        let app = router(AppState::new());
        let id = create(&app).await;
        let (status, body) = send(&app, "GET", &format!("/v1/policies/{id}"), None).await;
        assert_eq!(status, StatusCode::OK);
        let record: PolicyRecord = serde_json::from_value(body).unwrap();
        assert_eq!(record.owner.as_str(), "farmer-1");
        assert!(!record.settled);

        let (_, list) = send(&app, "GET", "/v1/policies", None).await;
        assert_eq!(list.as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn unknown_policy_is_404() {
        let app = router(AppState::new());
        let (status, _) = send(&app, "GET", "/v1/policies/77", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, _) = send(
            &app,
            "POST",
            "/v1/policies/77/settle",
            Some(json!({"approved": true, "idempotency_key": "dispute:1"})),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn settle_is_idempotent_per_key() {
        let app = router(AppState::new());
        let id = create(&app).await;
        let uri = format!("/v1/policies/{id}/settle");
        let req = json!({"approved": true, "idempotency_key": "dispute:1"});

        let (status, body) = send(&app, "POST", &uri, Some(req.clone())).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["payout_amount"], 5_000);

        let (status, body) = send(&app, "POST", &uri, Some(req)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["payout_amount"], 5_000);

        let (status, _) = send(
            &app,
            "POST",
            &uri,
            Some(json!({"approved": false, "idempotency_key": "dispute:2"})),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn queued_faults_return_503_then_recover() {
        let app = router(AppState::new());
        let id = create(&app).await;
        let (status, body) = send(&app, "POST", "/v1/faults", Some(json!({"unavailable": 1}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["queued"], 1);

        let uri = format!("/v1/policies/{id}/settle");
        let req = json!({"approved": false, "idempotency_key": "dispute:4"});
        let (status, _) = send(&app, "POST", &uri, Some(req.clone())).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        let (status, body) = send(&app, "POST", &uri, Some(req)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["payout_amount"], 0);
    }

    #[tokio::test]
    async fn invalid_owner_is_422() {
        let app = router(AppState::new());
        let (status, _) = send(
            &app,
            "POST",
            "/v1/policies",
            Some(json!({"owner": "", "coverage_cap": 1})),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }
}
