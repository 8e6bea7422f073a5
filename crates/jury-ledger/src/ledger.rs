//! # Policy Ledger Trait
//!
//! The interface the dispute service consumes. Methods are synchronous so
//! the trait stays object-safe and usable from blocking contexts; async
//! callers wrap each call with [`crate::call_with_timeout`].

use jury_core::{JurorAddress, PolicyId};
use serde::{Deserialize, Serialize};

use crate::error::LedgerError;

/// A policy as reported by the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyRecord {
    /// Policy identifier.
    pub policy_id: PolicyId,
    /// Account that holds the policy and may dispute its claims.
    pub owner: JurorAddress,
    /// Amount paid out on an approved claim, in micro-units.
    pub coverage_cap: u64,
    /// Whether the policy has been settled.
    pub settled: bool,
    /// Payout recorded at settlement, if settled.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payout_amount: Option<u64>,
}

/// Body of a settle call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettleRequest {
    /// Pay the coverage cap when `true`, deny when `false`.
    pub approved: bool,
    /// Repeating a request with the same key returns the original payout.
    pub idempotency_key: String,
}

/// Result of a settle call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettleResponse {
    /// Amount paid out; zero for a denied claim.
    pub payout_amount: u64,
}

/// External insurance-policy ledger.
///
/// Implementations must be idempotent on `idempotency_key`: a repeated
/// settle with the key that settled the policy returns the same payout
/// instead of [`LedgerError::AlreadySettled`].
pub trait PolicyLedger: Send + Sync {
    /// Fetch a policy.
    fn policy(&self, policy_id: PolicyId) -> Result<PolicyRecord, LedgerError>;

    /// Settle a policy, returning the payout.
    fn settle(
        &self,
        policy_id: PolicyId,
        approved: bool,
        idempotency_key: &str,
    ) -> Result<u64, LedgerError>;

    /// Owner of a policy.
    fn owner_of(&self, policy_id: PolicyId) -> Result<JurorAddress, LedgerError> {
        self.policy(policy_id).map(|p| p.owner)
    }

    /// Whether a policy is already settled.
    fn is_settled(&self, policy_id: PolicyId) -> Result<bool, LedgerError> {
        self.policy(policy_id).map(|p| p.settled)
    }
}
