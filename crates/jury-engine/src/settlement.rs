//! # Settlement Dispatcher
//!
//! Instructs the policy ledger to pay out or deny once a dispute resolves.
//!
//! ## Exactly-Once Dispatch
//!
//! The voting engine finalizes a dispute once, under its lock, and only the
//! finalizing call triggers settlement. The dispatcher adds its own guard:
//! a record keyed by dispute id is claimed through the `DashMap` entry API
//! before any ledger call, so a second trigger for the same dispute returns
//! the existing record without calling the ledger. Every settle call carries
//! the idempotency key `dispute:{id}`.
//!
//! ## Retry Policy
//!
//! Each attempt is bounded by the configured call timeout. Transient errors
//! (unavailable, timeout) are retried up to `max_attempts` with exponential
//! backoff (200ms, 400ms, 800ms by default). Permanent errors stop at once.
//! An exhausted cycle leaves a `Failed` record, logs an operator alert and
//! appends a `SettlementFailed` event; only [`SettlementDispatcher::retry_settlement`]
//! runs another cycle.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use jury_core::{Clock, DisputeId, JuryError, PolicyId, SettlementConfig};
use jury_ledger::{call_with_timeout, LedgerError, PolicyLedger};
use serde::{Deserialize, Serialize};

use crate::dispute::{DisputeStatus, Outcome};
use crate::disputes::DisputeLedger;
use crate::events::{EventDraft, EventKind, EventLog};

/// Progress of a settlement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SettlementStatus {
    /// A dispatch cycle is running.
    InFlight,
    /// The ledger settled the policy.
    Settled {
        payout_amount: u64,
        settled_at: DateTime<Utc>,
    },
    /// The last cycle failed; operator action required.
    Failed {
        last_error: String,
        failed_at: DateTime<Utc>,
    },
}

/// Settlement state of one resolved dispute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementRecord {
    pub dispute_id: DisputeId,
    pub policy_id: PolicyId,
    pub outcome: Outcome,
    pub status: SettlementStatus,
    /// Ledger calls made across all cycles.
    pub attempts: u32,
    pub updated_at: DateTime<Utc>,
}

impl SettlementRecord {
    pub fn is_settled(&self) -> bool {
        matches!(self.status, SettlementStatus::Settled { .. })
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.status, SettlementStatus::Failed { .. })
    }

    /// Ledger idempotency key for this dispute.
    pub fn idempotency_key(&self) -> String {
        idempotency_key(self.dispute_id)
    }
}

fn idempotency_key(dispute_id: DisputeId) -> String {
    format!("dispute:{}", dispute_id.value())
}

/// Result of one dispatch cycle.
struct CycleFailure {
    attempts: u32,
    error: LedgerError,
}

/// Calls the policy ledger for resolved disputes.
pub struct SettlementDispatcher {
    ledger: Arc<dyn PolicyLedger>,
    disputes: Arc<DisputeLedger>,
    config: SettlementConfig,
    records: DashMap<DisputeId, SettlementRecord>,
    clock: Arc<dyn Clock>,
    events: EventLog,
}

impl SettlementDispatcher {
    pub fn new(
        ledger: Arc<dyn PolicyLedger>,
        disputes: Arc<DisputeLedger>,
        config: SettlementConfig,
        clock: Arc<dyn Clock>,
        events: EventLog,
    ) -> Self {
        Self {
            ledger,
            disputes,
            config,
            records: DashMap::new(),
            clock,
            events,
        }
    }

    /// Settle a resolved dispute.
    ///
    /// Returns the existing record without calling the ledger if this
    /// dispute was triggered before. A failed cycle is reported through the
    /// returned record, not as an error: the resolution itself stands.
    pub async fn trigger(
        &self,
        dispute_id: DisputeId,
        policy_id: PolicyId,
        outcome: Outcome,
    ) -> SettlementRecord {
        let now = self.clock.now();
        match self.records.entry(dispute_id) {
            Entry::Occupied(existing) => {
                tracing::debug!(
                    dispute_id = dispute_id.value(),
                    "settlement already dispatched, skipping"
                );
                return existing.get().clone();
            }
            Entry::Vacant(slot) => {
                slot.insert(SettlementRecord {
                    dispute_id,
                    policy_id,
                    outcome,
                    status: SettlementStatus::InFlight,
                    attempts: 0,
                    updated_at: now,
                });
            }
        }
        self.run_cycle(dispute_id, policy_id, outcome)
            .await
            .unwrap_or_else(|(record, _)| record)
    }

    /// Run another dispatch cycle for a resolved dispute after a failure.
    ///
    /// # Errors
    ///
    /// - [`JuryError::NotFound`]: unknown dispute.
    /// - [`JuryError::NotResolved`]: the dispute is still active.
    /// - [`JuryError::SettlementInProgress`]: a cycle is running.
    /// - [`JuryError::SettlementFailed`]: the new cycle failed as well.
    ///
    /// An already settled dispute returns its record without a ledger call.
    pub async fn retry_settlement(
        &self,
        dispute_id: DisputeId,
    ) -> Result<SettlementRecord, JuryError> {
        let dispute = self.disputes.get(dispute_id)?;
        let outcome = match (dispute.status, dispute.outcome()) {
            (DisputeStatus::Active, _) | (_, None) => {
                return Err(JuryError::NotResolved { dispute_id })
            }
            (_, Some(outcome)) => outcome,
        };

        let now = self.clock.now();
        match self.records.entry(dispute_id) {
            Entry::Occupied(mut existing) => match existing.get().status {
                SettlementStatus::InFlight => {
                    return Err(JuryError::SettlementInProgress(dispute_id))
                }
                SettlementStatus::Settled { .. } => return Ok(existing.get().clone()),
                SettlementStatus::Failed { .. } => {
                    let record = existing.get_mut();
                    record.status = SettlementStatus::InFlight;
                    record.updated_at = now;
                }
            },
            Entry::Vacant(slot) => {
                slot.insert(SettlementRecord {
                    dispute_id,
                    policy_id: dispute.policy_id,
                    outcome,
                    status: SettlementStatus::InFlight,
                    attempts: 0,
                    updated_at: now,
                });
            }
        }

        tracing::info!(
            dispute_id = dispute_id.value(),
            policy_id = dispute.policy_id.value(),
            "retrying settlement"
        );
        self.run_cycle(dispute_id, dispute.policy_id, outcome)
            .await
            .map_err(|(_, failure)| JuryError::SettlementFailed {
                dispute_id,
                attempts: failure.attempts,
                reason: failure.error.to_string(),
            })
    }

    /// Settlement record of a dispute, if dispatch started.
    pub fn record(&self, dispute_id: DisputeId) -> Option<SettlementRecord> {
        self.records.get(&dispute_id).map(|r| r.clone())
    }

    /// Failed settlements awaiting an operator, ordered by dispute id.
    pub fn failed(&self) -> Vec<SettlementRecord> {
        let mut failed: Vec<_> = self
            .records
            .iter()
            .filter(|r| r.is_failed())
            .map(|r| r.value().clone())
            .collect();
        failed.sort_by_key(|r| r.dispute_id);
        failed
    }

    /// (settled, failed) record counts.
    pub fn counts(&self) -> (usize, usize) {
        self.records.iter().fold((0, 0), |(ok, bad), r| {
            (ok + usize::from(r.is_settled()), bad + usize::from(r.is_failed()))
        })
    }

    /// Attempt settlement until success, a permanent error, or exhaustion.
    /// The record must already be `InFlight`.
    async fn run_cycle(
        &self,
        dispute_id: DisputeId,
        policy_id: PolicyId,
        outcome: Outcome,
    ) -> Result<SettlementRecord, (SettlementRecord, CycleFailure)> {
        let max_attempts = self.config.max_attempts.max(1);
        let key = idempotency_key(dispute_id);
        let approved = outcome.is_approved();
        let mut attempt = 0;

        let error = loop {
            attempt += 1;
            self.bump_attempts(dispute_id);
            let call_key = key.clone();
            let result = call_with_timeout(
                Arc::clone(&self.ledger),
                self.config.call_timeout(),
                move |ledger| ledger.settle(policy_id, approved, &call_key),
            )
            .await;

            match result {
                Ok(payout_amount) => {
                    let record = self.finish(
                        dispute_id,
                        policy_id,
                        outcome,
                        SettlementStatus::Settled {
                            payout_amount,
                            settled_at: self.clock.now(),
                        },
                    );
                    self.disputes.release_policy(policy_id, dispute_id);
                    self.events.record(
                        EventDraft::new(EventKind::SettlementCompleted)
                            .dispute(dispute_id)
                            .outcome(outcome)
                            .detail(format!("payout {payout_amount}")),
                        self.clock.now(),
                    );
                    tracing::info!(
                        dispute_id = dispute_id.value(),
                        policy_id = policy_id.value(),
                        approved,
                        payout_amount,
                        attempt,
                        "settlement completed"
                    );
                    return Ok(record);
                }
                Err(e) if e.is_transient() && attempt < max_attempts => {
                    let delay = self.config.backoff_after(attempt);
                    tracing::warn!(
                        dispute_id = dispute_id.value(),
                        policy_id = policy_id.value(),
                        attempt,
                        max_attempts,
                        "settlement attempt failed, retrying in {delay:?}: {e}"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => break e,
            }
        };

        let failed_at = self.clock.now();
        let record = self.finish(
            dispute_id,
            policy_id,
            outcome,
            SettlementStatus::Failed {
                last_error: error.to_string(),
                failed_at,
            },
        );
        self.events.record(
            EventDraft::new(EventKind::SettlementFailed)
                .dispute(dispute_id)
                .outcome(outcome)
                .detail(error.to_string()),
            failed_at,
        );
        tracing::error!(
            dispute_id = dispute_id.value(),
            policy_id = policy_id.value(),
            attempts = attempt,
            transient = error.is_transient(),
            "settlement failed, operator action required: {error}"
        );
        Err((
            record,
            CycleFailure {
                attempts: attempt,
                error,
            },
        ))
    }

    fn bump_attempts(&self, dispute_id: DisputeId) {
        if let Some(mut record) = self.records.get_mut(&dispute_id) {
            record.attempts += 1;
            record.updated_at = self.clock.now();
        }
    }

    fn finish(
        &self,
        dispute_id: DisputeId,
        policy_id: PolicyId,
        outcome: Outcome,
        status: SettlementStatus,
    ) -> SettlementRecord {
        let now = self.clock.now();
        let mut record = self
            .records
            .entry(dispute_id)
            .or_insert_with(|| SettlementRecord {
                dispute_id,
                policy_id,
                outcome,
                status: SettlementStatus::InFlight,
                attempts: 0,
                updated_at: now,
            });
        record.status = status;
        record.updated_at = now;
        record.clone()
    }
}
