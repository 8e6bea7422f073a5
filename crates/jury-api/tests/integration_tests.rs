//! # Integration Tests for jury-api
//!
//! Drives the full router with `tower::ServiceExt::oneshot` over an
//! in-memory policy ledger, a manual clock and fixed randomness: health
//! probes, authentication, juror registration, the dispute lifecycle, the
//! error-to-status mapping, settlement retry and observability endpoints.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::{Duration, TimeZone, Utc};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use jury_api::state::{AppConfig, AppState};
use jury_core::{JurorAddress, JuryConfig, ManualClock, PolicyId};
use jury_engine::{FixedRandomness, JuryService};
use jury_ledger::{InMemoryPolicyLedger, LedgerError};

const COVERAGE_CAP: u64 = 250_000;
const TOKEN: &str = "operator-secret";

struct TestApp {
    router: axum::Router,
    ledger: InMemoryPolicyLedger,
    clock: ManualClock,
    policy: PolicyId,
}

fn build(auth_token: Option<&str>) -> TestApp {
    let mut config = JuryConfig::default();
    config.settlement.base_backoff_ms = 1;
    let ledger = InMemoryPolicyLedger::new();
    let clock = ManualClock::new(Utc.with_ymd_and_hms(2026, 7, 1, 8, 0, 0).unwrap());
    let service = JuryService::builder(config, Arc::new(ledger.clone()))
        .clock(Arc::new(clock.clone()))
        .randomness(Arc::new(FixedRandomness::from_seed(7)))
        .build()
        .unwrap();
    let policy = ledger
        .create_policy(JurorAddress::new("farmer-1").unwrap(), COVERAGE_CAP)
        .policy_id;
    let state = AppState::with_config(
        Arc::new(service),
        AppConfig {
            auth_token: auth_token.map(str::to_string),
            ..AppConfig::default()
        },
    );
    TestApp {
        router: jury_api::app(state),
        ledger,
        clock,
        policy,
    }
}

fn test_app() -> TestApp {
    build(None)
}

impl TestApp {
    async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };
        (status, body)
    }

    async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.send(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
    }

    async fn post(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.send(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
    }

    async fn post_empty(&self, uri: &str) -> (StatusCode, Value) {
        self.send(
            Request::builder()
                .method("POST")
                .uri(uri)
                .body(Body::empty())
                .unwrap(),
        )
        .await
    }

    /// Register the claimant plus `n` jurors.
    async fn register_jurors(&self, n: usize) {
        let (status, _) = self.post("/v1/jurors", json!({"address": "farmer-1"})).await;
        assert_eq!(status, StatusCode::CREATED);
        for i in 0..n {
            let (status, _) = self
                .post("/v1/jurors", json!({"address": format!("juror-{i:02}")}))
                .await;
            assert_eq!(status, StatusCode::CREATED);
        }
    }

    async fn open_dispute(&self) -> Value {
        let (status, body) = self
            .post(
                "/v1/disputes",
                json!({
                    "policy_id": self.policy.value(),
                    "claimant": "farmer-1",
                    "reason": "rainfall index below trigger for July",
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body
    }

    async fn vote(&self, dispute: &Value, juror: &str, choice: &str) -> (StatusCode, Value) {
        let uri = format!("/v1/disputes/{}/votes", dispute["id"]);
        self.post(&uri, json!({"juror": juror, "choice": choice}))
            .await
    }
}

fn panel(dispute: &Value) -> Vec<String> {
    dispute["assigned_jurors"]
        .as_array()
        .unwrap()
        .iter()
        .map(|j| j.as_str().unwrap().to_string())
        .collect()
}

// -- Health Probes & OpenAPI ----------------------------------------------------

#[tokio::test]
async fn liveness_and_readiness_need_no_token() {
    let app = build(Some(TOKEN));
    let (status, body) = app.get("/health/liveness").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, Value::String("ok".into()));

    let (status, body) = app.get("/health/readiness").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, Value::String("ready".into()));
}

#[tokio::test]
async fn openapi_document_is_served() {
    let app = build(Some(TOKEN));
    let (status, body) = app.get("/openapi.json").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["info"]["title"], "Jury API");
    assert!(body["paths"]["/v1/disputes/{id}/votes"].is_object());
}

// -- Authentication ---------------------------------------------------------------

#[tokio::test]
async fn api_requires_bearer_token_when_configured() {
    let app = build(Some(TOKEN));
    let (status, body) = app.get("/v1/jurors").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");

    let (status, body) = app
        .send(
            Request::builder()
                .uri("/v1/jurors")
                .header("Authorization", format!("Bearer {TOKEN}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));
}

// -- Jurors -----------------------------------------------------------------------

#[tokio::test]
async fn register_and_fetch_juror() {
    let app = test_app();
    let (status, body) = app.post("/v1/jurors", json!({"address": "juror-a"})).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["reputation"], 100);
    assert_eq!(body["staked_amount"], 1_000_000);
    assert_eq!(body["active"], true);

    let (status, body) = app.get("/v1/jurors/juror-a").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["address"], "juror-a");
    assert_eq!(body["total_votes"], 0);
}

#[tokio::test]
async fn duplicate_registration_is_409_and_keeps_record() {
    let app = test_app();
    app.post("/v1/jurors", json!({"address": "juror-a"})).await;
    let (status, body) = app.post("/v1/jurors", json!({"address": "juror-a"})).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "ALREADY_REGISTERED");

    let (_, body) = app.get("/v1/jurors").await;
    assert_eq!(body.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn malformed_address_is_422() {
    let app = test_app();
    let (status, body) = app
        .post("/v1/jurors", json!({"address": "has spaces"}))
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["code"], "INVALID_ADDRESS");
}

#[tokio::test]
async fn malformed_body_is_400() {
    let app = test_app();
    let (status, body) = app
        .send(
            Request::builder()
                .method("POST")
                .uri("/v1/jurors")
                .header("content-type", "application/json")
                .body(Body::from("{not json"))
                .unwrap(),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn unknown_juror_is_404() {
    let app = test_app();
    let (status, body) = app.get("/v1/jurors/nobody").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn eligibility_and_deactivation() {
    let app = test_app();
    let (_, body) = app.get("/v1/jurors/juror-a/eligibility").await;
    assert_eq!(body["status"], "not_registered");

    app.post("/v1/jurors", json!({"address": "juror-a"})).await;
    let (_, body) = app.get("/v1/jurors/juror-a/eligibility").await;
    assert_eq!(body["status"], "eligible");
    assert_eq!(body["eligible"], true);

    let (status, body) = app.post_empty("/v1/jurors/juror-a/deactivate").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["active"], false);
    let (_, body) = app.get("/v1/jurors/juror-a/eligibility").await;
    assert_eq!(body["status"], "inactive");

    let (status, body) = app.post_empty("/v1/jurors/juror-a/reactivate").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["active"], true);
}

// -- Dispute creation -------------------------------------------------------------

#[tokio::test]
async fn create_dispute_draws_full_panel_without_claimant() {
    let app = test_app();
    app.register_jurors(12).await;
    let dispute = app.open_dispute().await;

    assert_eq!(dispute["id"], 1);
    assert_eq!(dispute["status"], "active");
    assert_eq!(dispute["total_votes"], 0);
    assert_eq!(dispute["selection_seed"].as_str().unwrap().len(), 64);
    let jurors = panel(&dispute);
    assert_eq!(jurors.len(), 10);
    assert!(!jurors.contains(&"farmer-1".to_string()));
    assert!(dispute["settlement"].is_null());
}

#[tokio::test]
async fn create_dispute_errors_map_to_statuses() {
    let app = test_app();
    app.register_jurors(12).await;

    let (status, body) = app
        .post(
            "/v1/disputes",
            json!({"policy_id": 999, "claimant": "farmer-1", "reason": "hail"}),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "POLICY_NOT_FOUND");

    let (status, body) = app
        .post(
            "/v1/disputes",
            json!({"policy_id": app.policy.value(), "claimant": "juror-00", "reason": "hail"}),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"]["code"], "INVALID_CLAIMANT");

    let (status, body) = app
        .post(
            "/v1/disputes",
            json!({"policy_id": app.policy.value(), "claimant": "farmer-1", "reason": "   "}),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["code"], "INVALID_REASON");

    app.open_dispute().await;
    let (status, body) = app
        .post(
            "/v1/disputes",
            json!({"policy_id": app.policy.value(), "claimant": "farmer-1", "reason": "again"}),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "DUPLICATE_DISPUTE");
    assert_eq!(body["error"]["details"]["open_dispute_id"], 1);
}

#[tokio::test]
async fn too_few_jurors_is_503() {
    let app = test_app();
    app.register_jurors(4).await;
    let (status, body) = app
        .post(
            "/v1/disputes",
            json!({"policy_id": app.policy.value(), "claimant": "farmer-1", "reason": "frost"}),
        )
        .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"]["code"], "INSUFFICIENT_JURORS");
    assert_eq!(body["error"]["details"]["available"], 4);
}

// -- Voting -----------------------------------------------------------------------

#[tokio::test]
async fn quorum_approves_and_settles_once() {
    let app = test_app();
    app.register_jurors(12).await;
    let dispute = app.open_dispute().await;
    let jurors = panel(&dispute);

    for juror in &jurors[..6] {
        let (status, body) = app.vote(&dispute, juror, "yes").await;
        assert_eq!(status, StatusCode::OK, "{body}");
        assert_eq!(body["status"], "active");
        assert!(body["resolution"].is_null());
    }
    let (status, body) = app.vote(&dispute, &jurors[6], "no").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "approved");
    assert_eq!(body["total_votes"], 7);
    assert_eq!(body["resolution"]["outcome"], "approved");
    assert_eq!(body["resolution"]["reason"], "quorum_reached");
    assert_eq!(body["settlement"]["state"], "settled");
    assert_eq!(body["settlement"]["payout_amount"], COVERAGE_CAP);
    assert_eq!(app.ledger.settle_calls(), 1);

    let (status, body) = app.vote(&dispute, &jurors[7], "yes").await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "ALREADY_RESOLVED");
    assert_eq!(app.ledger.settle_calls(), 1);

    let (_, body) = app.get(&format!("/v1/disputes/{}", dispute["id"])).await;
    assert_eq!(body["yes_votes"], 6);
    assert_eq!(body["no_votes"], 1);
    assert_eq!(body["votes"].as_array().unwrap().len(), 7);
    assert_eq!(body["settlement"]["idempotency_key"], "dispute:1");

    let (_, body) = app.get(&format!("/v1/jurors/{}", jurors[0])).await;
    assert_eq!(body["reputation"], 110);
    assert_eq!(body["correct_votes"], 1);
    let (_, body) = app.get(&format!("/v1/jurors/{}", jurors[6])).await;
    assert_eq!(body["reputation"], 90);
}

#[tokio::test]
async fn minority_yes_rejects_with_zero_payout() {
    let app = test_app();
    app.register_jurors(12).await;
    let dispute = app.open_dispute().await;
    let jurors = panel(&dispute);

    for juror in &jurors[..3] {
        app.vote(&dispute, juror, "yes").await;
    }
    let mut last = Value::Null;
    for juror in &jurors[3..7] {
        let (status, body) = app.vote(&dispute, juror, "no").await;
        assert_eq!(status, StatusCode::OK);
        last = body;
    }
    assert_eq!(last["status"], "rejected");
    assert_eq!(last["settlement"]["payout_amount"], 0);
}

#[tokio::test]
async fn ballot_errors_map_to_statuses() {
    let app = test_app();
    app.register_jurors(12).await;
    let dispute = app.open_dispute().await;
    let jurors = panel(&dispute);

    let (status, body) = app.vote(&dispute, "farmer-1", "yes").await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"]["code"], "NOT_ASSIGNED");

    let (status, body) = app.vote(&dispute, &jurors[0], "maybe").await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");

    app.vote(&dispute, &jurors[0], "yes").await;
    let (status, body) = app.vote(&dispute, &jurors[0], "no").await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "DUPLICATE_VOTE");

    let (status, body) = app
        .post("/v1/disputes/42/votes", json!({"juror": jurors[1], "choice": "yes"}))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "NOT_FOUND");

    let (_, body) = app.get(&format!("/v1/disputes/{}", dispute["id"])).await;
    assert_eq!(body["total_votes"], 1);
}

#[tokio::test]
async fn late_ballot_is_410_and_expiry_resolves_once() {
    let app = test_app();
    app.register_jurors(12).await;
    let dispute = app.open_dispute().await;
    let jurors = panel(&dispute);
    for juror in &jurors[..5] {
        app.vote(&dispute, juror, "yes").await;
    }

    app.clock.advance(Duration::days(7) + Duration::seconds(1));
    let (status, body) = app.vote(&dispute, &jurors[5], "yes").await;
    assert_eq!(status, StatusCode::GONE);
    assert_eq!(body["error"]["code"], "DEADLINE_EXPIRED");

    let (status, body) = app.post_empty("/v1/disputes/expire").await;
    assert_eq!(status, StatusCode::OK);
    let expired = body["expired"].as_array().unwrap();
    assert_eq!(expired.len(), 1);
    assert_eq!(expired[0]["outcome"], "rejected");
    assert_eq!(expired[0]["total_votes"], 5);

    let (_, body) = app.post_empty("/v1/disputes/expire").await;
    assert!(body["expired"].as_array().unwrap().is_empty());

    let (_, body) = app.get(&format!("/v1/disputes/{}", dispute["id"])).await;
    assert_eq!(body["status"], "rejected");
    assert_eq!(body["resolution"]["reason"], "deadline_expired");
    assert_eq!(app.ledger.settle_calls(), 1);
}

// -- Processing & settlement ------------------------------------------------------

#[tokio::test]
async fn processed_requires_resolution() {
    let app = test_app();
    app.register_jurors(12).await;
    let dispute = app.open_dispute().await;
    let uri = format!("/v1/disputes/{}/processed", dispute["id"]);

    let (status, body) = app.post_empty(&uri).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "NOT_RESOLVED");

    for juror in &panel(&dispute)[..7] {
        app.vote(&dispute, juror, "yes").await;
    }
    let (status, body) = app.post_empty(&uri).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["processed"], true);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn failed_settlement_is_listed_and_retried() {
    let app = test_app();
    app.register_jurors(12).await;
    app.ledger.inject_settle_failures(
        std::iter::repeat(LedgerError::Unavailable {
            reason: "ledger maintenance".into(),
        })
        .take(3),
    );
    let dispute = app.open_dispute().await;
    let mut last = Value::Null;
    for juror in &panel(&dispute)[..7] {
        let (status, body) = app.vote(&dispute, juror, "yes").await;
        assert_eq!(status, StatusCode::OK);
        last = body;
    }
    assert_eq!(last["status"], "approved");
    assert_eq!(last["settlement"]["state"], "failed");
    assert_eq!(last["settlement"]["attempts"], 3);

    let (_, body) = app.get("/v1/settlements/failed").await;
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["dispute_id"], 1);

    let (_, stats) = app.get("/v1/stats").await;
    assert_eq!(stats["settlements_failed"], 1);

    let uri = format!("/v1/disputes/{}/settlement/retry", dispute["id"]);
    let (status, body) = app.post_empty(&uri).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["state"], "settled");
    assert_eq!(body["payout_amount"], COVERAGE_CAP);

    let (_, body) = app.get("/v1/settlements/failed").await;
    assert!(body.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn retry_on_active_dispute_is_409() {
    let app = test_app();
    app.register_jurors(12).await;
    let dispute = app.open_dispute().await;
    let uri = format!("/v1/disputes/{}/settlement/retry", dispute["id"]);
    let (status, body) = app.post_empty(&uri).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "NOT_RESOLVED");
}

// -- Listing & observability ------------------------------------------------------

#[tokio::test]
async fn list_filters_by_status() {
    let app = test_app();
    app.register_jurors(12).await;
    app.open_dispute().await;

    let (_, body) = app.get("/v1/disputes?status=active").await;
    assert_eq!(body.as_array().unwrap().len(), 1);
    let (_, body) = app.get("/v1/disputes?status=approved").await;
    assert!(body.as_array().unwrap().is_empty());

    let (status, body) = app.get("/v1/disputes?status=closed").await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn events_and_stats_track_lifecycle() {
    let app = test_app();
    app.register_jurors(12).await;
    let dispute = app.open_dispute().await;
    for juror in &panel(&dispute)[..7] {
        app.vote(&dispute, juror, "yes").await;
    }

    let (_, stats) = app.get("/v1/stats").await;
    assert_eq!(stats["total_disputes"], 1);
    assert_eq!(stats["approved_disputes"], 1);
    assert_eq!(stats["total_votes_cast"], 7);
    assert_eq!(stats["registered_jurors"], 13);
    assert_eq!(stats["settlements_completed"], 1);

    let (status, events) = app.get("/v1/events?limit=3").await;
    assert_eq!(status, StatusCode::OK);
    let kinds: Vec<&str> = events
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["kind"].as_str().unwrap())
        .collect();
    assert_eq!(kinds, ["vote_cast", "dispute_resolved", "settlement_completed"]);

    let (_, events) = app
        .get(&format!("/v1/disputes/{}/events", dispute["id"]))
        .await;
    let events = events.as_array().unwrap();
    assert_eq!(events[0]["kind"], "dispute_created");
    assert_eq!(events.len(), 1 + 7 + 2);

    let (status, _) = app.get("/v1/events?limit=0").await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    let (status, body) = app.get("/v1/events?limit=lots").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "BAD_REQUEST");
    let (status, _) = app.get("/v1/disputes/99/events").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
