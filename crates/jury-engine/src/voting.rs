//! # Voting Engine
//!
//! Validates ballots, detects quorum and finalizes disputes.
//!
//! A ballot is applied in one critical section under the dispute's mutex:
//! validation, tally, ballot record, juror counters and, when quorum is
//! reached, finalization with every panel member's reputation change.
//! Settlement is dispatched only after the lock is released, and only by
//! the call that finalized. A failed settlement never undoes the vote.

use std::sync::Arc;

use jury_core::{Clock, DisputeId, JurorAddress, JuryConfig, JuryError, PolicyId};
use serde::{Deserialize, Serialize};

use crate::dispute::{Dispute, DisputeStatus, Outcome, Resolution, ResolutionReason, VoteChoice};
use crate::disputes::DisputeLedger;
use crate::events::{EventDraft, EventKind, EventLog};
use crate::registry::JurorRegistry;
use crate::settlement::{SettlementDispatcher, SettlementRecord};

/// Result of an accepted ballot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteReceipt {
    pub dispute_id: DisputeId,
    pub juror: JurorAddress,
    pub choice: VoteChoice,
    pub yes_votes: usize,
    pub no_votes: usize,
    pub total_votes: usize,
    pub status: DisputeStatus,
    /// Present when this ballot finalized the dispute.
    pub resolution: Option<Resolution>,
    /// Present when this ballot triggered settlement.
    pub settlement: Option<SettlementRecord>,
}

/// A dispute force-resolved because its voting window closed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpiredDispute {
    pub dispute_id: DisputeId,
    pub outcome: Outcome,
    pub total_votes: usize,
    pub settlement: SettlementRecord,
}

fn signed(amount: u64) -> i64 {
    i64::try_from(amount).unwrap_or(i64::MAX)
}

/// Applies ballots and finalizes disputes.
pub struct VotingEngine {
    disputes: Arc<DisputeLedger>,
    registry: Arc<JurorRegistry>,
    dispatcher: Arc<SettlementDispatcher>,
    config: Arc<JuryConfig>,
    clock: Arc<dyn Clock>,
    events: EventLog,
}

impl VotingEngine {
    pub fn new(
        disputes: Arc<DisputeLedger>,
        registry: Arc<JurorRegistry>,
        dispatcher: Arc<SettlementDispatcher>,
        config: Arc<JuryConfig>,
        clock: Arc<dyn Clock>,
        events: EventLog,
    ) -> Self {
        Self {
            disputes,
            registry,
            dispatcher,
            config,
            clock,
            events,
        }
    }

    /// Cast a ballot.
    ///
    /// # Errors
    ///
    /// Checked in order: [`JuryError::NotFound`],
    /// [`JuryError::AlreadyResolved`], [`JuryError::DeadlineExpired`],
    /// [`JuryError::NotAssigned`], [`JuryError::DuplicateVote`],
    /// [`JuryError::VoteCooldown`]. A rejected ballot changes nothing.
    pub async fn vote(
        &self,
        dispute_id: DisputeId,
        juror: JurorAddress,
        choice: VoteChoice,
    ) -> Result<VoteReceipt, JuryError> {
        let handle = self.disputes.handle(dispute_id)?;
        let now = self.clock.now();

        let (mut receipt, finalized) = {
            let mut dispute = handle.lock();
            dispute.check_ballot(&juror, now)?;
            self.registry.record_vote(&juror, now)?;
            dispute.cast_vote(&juror, choice, now)?;
            self.events.record(
                EventDraft::new(EventKind::VoteCast)
                    .dispute(dispute_id)
                    .juror(&juror)
                    .choice(choice),
                now,
            );

            let panel = &self.config.panel;
            let resolution = if dispute.quorum_reached(panel.quorum_threshold) {
                let outcome = dispute.outcome_at_quorum(panel.effective_approval_threshold());
                Some(self.finalize(&mut dispute, outcome, ResolutionReason::QuorumReached)?)
            } else {
                None
            };

            let finalized = resolution
                .as_ref()
                .map(|r| (dispute.policy_id, r.outcome));
            let receipt = VoteReceipt {
                dispute_id,
                juror: juror.clone(),
                choice,
                yes_votes: dispute.yes_votes,
                no_votes: dispute.no_votes,
                total_votes: dispute.total_votes,
                status: dispute.status,
                resolution,
                settlement: None,
            };
            (receipt, finalized)
        };

        tracing::info!(
            dispute_id = dispute_id.value(),
            juror = %juror,
            ?choice,
            total_votes = receipt.total_votes,
            "vote cast"
        );

        if let Some((policy_id, outcome)) = finalized {
            receipt.settlement = Some(self.dispatch(dispute_id, policy_id, outcome).await);
        }
        Ok(receipt)
    }

    /// Force-resolve every active dispute whose deadline has passed, using
    /// the configured expiry policy. Each dispute is resolved exactly once
    /// however often this runs.
    pub async fn expire_overdue(&self) -> Vec<ExpiredDispute> {
        let now = self.clock.now();
        let policy = self.config.voting.expiry_policy;
        let mut expired = Vec::new();

        for handle in self.disputes.handles() {
            let mut dispute = handle.lock();
            if !dispute.is_overdue(now) {
                continue;
            }
            let outcome = dispute.outcome_on_expiry(policy);
            match self.finalize(&mut dispute, outcome, ResolutionReason::DeadlineExpired) {
                Ok(_) => expired.push((dispute.id, dispute.policy_id, outcome, dispute.total_votes)),
                Err(e) => tracing::warn!(dispute_id = dispute.id.value(), "expiry skipped: {e}"),
            }
        }
        expired.sort_by_key(|(id, ..)| *id);

        let mut reports = Vec::with_capacity(expired.len());
        for (dispute_id, policy_id, outcome, total_votes) in expired {
            let settlement = self.dispatch(dispute_id, policy_id, outcome).await;
            reports.push(ExpiredDispute {
                dispute_id,
                outcome,
                total_votes,
                settlement,
            });
        }
        if !reports.is_empty() {
            tracing::info!(count = reports.len(), "expired overdue disputes");
        }
        reports
    }

    /// Resolve under the caller's lock and apply reputation changes.
    fn finalize(
        &self,
        dispute: &mut Dispute,
        outcome: Outcome,
        reason: ResolutionReason,
    ) -> Result<Resolution, JuryError> {
        let now = self.clock.now();
        let resolution = dispute.resolve(outcome, reason, now)?;

        let rep = &self.config.reputation;
        for juror in &dispute.assigned_jurors {
            match dispute.vote_of(juror) {
                Some(choice) if choice.matches(outcome) => {
                    self.registry.apply_resolution(juror, signed(rep.reward), true)
                }
                Some(_) => self.registry.apply_resolution(juror, -signed(rep.penalty), false),
                None => self
                    .registry
                    .apply_resolution(juror, -signed(rep.abstention_penalty), false),
            }
        }

        self.events.record(
            EventDraft::new(EventKind::DisputeResolved)
                .dispute(dispute.id)
                .outcome(outcome),
            now,
        );
        tracing::info!(
            dispute_id = dispute.id.value(),
            policy_id = dispute.policy_id.value(),
            %outcome,
            ?reason,
            yes_votes = dispute.yes_votes,
            no_votes = dispute.no_votes,
            "dispute resolved"
        );
        Ok(resolution)
    }

    async fn dispatch(
        &self,
        dispute_id: DisputeId,
        policy_id: PolicyId,
        outcome: Outcome,
    ) -> SettlementRecord {
        self.dispatcher.trigger(dispute_id, policy_id, outcome).await
    }
}
