//! # HTTP Policy Ledger Client
//!
//! Implements [`PolicyLedger`] against a remote ledger service:
//!
//! | Call | Request | Response |
//! |------|---------|----------|
//! | fetch | `GET {base}/v1/policies/{id}` | [`PolicyRecord`] |
//! | settle | `POST {base}/v1/policies/{id}/settle` with [`SettleRequest`] | [`SettleResponse`] |
//!
//! Status mapping: 404 is `PolicyNotFound`, 409 is `AlreadySettled`, 5xx
//! and transport failures are `Unavailable`, a client-side timeout is
//! `Timeout`, and any other non-success status is `Rejected`.
//!
//! The trait is synchronous, so each method drives its request with
//! `Handle::block_on`. That requires a runtime handle and must NOT run on
//! an async worker thread; use [`crate::call_with_timeout`], which moves
//! the call onto the blocking pool.

use jury_core::PolicyId;
use reqwest::StatusCode;

use crate::config::LedgerConfig;
use crate::error::LedgerError;
use crate::ledger::{PolicyLedger, PolicyRecord, SettleRequest, SettleResponse};

/// `reqwest`-backed [`PolicyLedger`].
#[derive(Debug)]
pub struct HttpPolicyLedger {
    client: reqwest::Client,
    base_url: String,
    timeout_ms: u64,
}

impl HttpPolicyLedger {
    /// Build a client from configuration.
    pub fn new(config: LedgerConfig) -> Result<Self, LedgerError> {
        let mut headers = reqwest::header::HeaderMap::new();
        if let Some(token) = &config.api_token {
            headers.insert(
                reqwest::header::AUTHORIZATION,
                reqwest::header::HeaderValue::from_str(&format!("Bearer {token}")).map_err(
                    |_| LedgerError::Unavailable {
                        reason: "invalid API token characters".into(),
                    },
                )?,
            );
        }
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .default_headers(headers)
            .build()
            .map_err(|e| LedgerError::Unavailable {
                reason: format!("failed to build HTTP client: {e}"),
            })?;

        Ok(Self {
            client,
            base_url: config.base_url.as_str().trim_end_matches('/').to_string(),
            timeout_ms: config.timeout_secs.saturating_mul(1000),
        })
    }

    fn policy_url(&self, policy_id: PolicyId) -> String {
        format!("{}/v1/policies/{}", self.base_url, policy_id.value())
    }

    fn runtime() -> Result<tokio::runtime::Handle, LedgerError> {
        tokio::runtime::Handle::try_current().map_err(|_| LedgerError::Unavailable {
            reason: "no async runtime available for HTTP request".into(),
        })
    }

    /// Send a request and map transport and status failures.
    async fn send_request(
        &self,
        request: reqwest::RequestBuilder,
        policy_id: PolicyId,
        operation: &str,
    ) -> Result<reqwest::Response, LedgerError> {
        let resp = request.send().await.map_err(|e| {
            if e.is_timeout() {
                LedgerError::Timeout {
                    elapsed_ms: self.timeout_ms,
                }
            } else {
                LedgerError::Unavailable {
                    reason: format!("{operation}: {e}"),
                }
            }
        })?;

        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let body = resp.text().await.unwrap_or_default();
        Err(match status {
            StatusCode::NOT_FOUND => LedgerError::PolicyNotFound(policy_id),
            StatusCode::CONFLICT => LedgerError::AlreadySettled(policy_id),
            s if s.is_server_error() => LedgerError::Unavailable {
                reason: format!("{operation}: HTTP {s}: {body}"),
            },
            s => LedgerError::Rejected {
                status: s.as_u16(),
                reason: format!("{operation}: {body}"),
            },
        })
    }
}

impl PolicyLedger for HttpPolicyLedger {
    fn policy(&self, policy_id: PolicyId) -> Result<PolicyRecord, LedgerError> {
        let rt = Self::runtime()?;
        let url = self.policy_url(policy_id);

        rt.block_on(async {
            let resp = self
                .send_request(self.client.get(&url), policy_id, "fetch_policy")
                .await?;
            resp.json::<PolicyRecord>()
                .await
                .map_err(|e| LedgerError::Unavailable {
                    reason: format!("fetch_policy: response deserialization failed: {e}"),
                })
        })
    }

    fn settle(
        &self,
        policy_id: PolicyId,
        approved: bool,
        idempotency_key: &str,
    ) -> Result<u64, LedgerError> {
        let rt = Self::runtime()?;
        let url = format!("{}/settle", self.policy_url(policy_id));
        let body = SettleRequest {
            approved,
            idempotency_key: idempotency_key.to_string(),
        };

        rt.block_on(async {
            let resp = self
                .send_request(self.client.post(&url).json(&body), policy_id, "settle")
                .await?;
            let result: SettleResponse =
                resp.json().await.map_err(|e| LedgerError::Unavailable {
                    reason: format!("settle: response deserialization failed: {e}"),
                })?;
            Ok(result.payout_amount)
        })
    }
}
