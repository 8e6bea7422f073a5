//! # Dispute Ledger
//!
//! Owns every dispute and the one-open-dispute-per-policy index.
//!
//! Each dispute sits behind its own `parking_lot::Mutex`, so mutations of
//! one dispute are serialized while different disputes proceed in
//! parallel. Locks are never held across `.await`.
//!
//! A policy counts as having an open dispute from creation until its
//! settlement succeeds. The index slot is claimed through the `DashMap`
//! entry API, which makes the duplicate check atomic with the insert.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use jury_core::{Clock, DisputeId, JurorAddress, JuryConfig, JuryError, PolicyId};
use jury_ledger::{call_with_timeout, PolicyLedger};
use parking_lot::Mutex;

use crate::dispute::{Dispute, DisputeStatus};
use crate::events::{EventDraft, EventKind, EventLog};
use crate::selector::JurorSelector;

/// Longest accepted dispute reason, in characters.
pub const MAX_REASON_CHARS: usize = 1024;

/// Concurrent store of disputes.
pub struct DisputeLedger {
    disputes: DashMap<DisputeId, Arc<Mutex<Dispute>>>,
    open_by_policy: DashMap<PolicyId, DisputeId>,
    next_id: AtomicU64,
    selector: JurorSelector,
    ledger: Arc<dyn PolicyLedger>,
    config: Arc<JuryConfig>,
    clock: Arc<dyn Clock>,
    events: EventLog,
}

impl DisputeLedger {
    pub fn new(
        selector: JurorSelector,
        ledger: Arc<dyn PolicyLedger>,
        config: Arc<JuryConfig>,
        clock: Arc<dyn Clock>,
        events: EventLog,
    ) -> Self {
        Self {
            disputes: DashMap::new(),
            open_by_policy: DashMap::new(),
            next_id: AtomicU64::new(1),
            selector,
            ledger,
            config,
            clock,
            events,
        }
    }

    /// Open a dispute over a rejected claim and draw its panel.
    ///
    /// # Errors
    ///
    /// - [`JuryError::InvalidReason`]: empty or over [`MAX_REASON_CHARS`].
    /// - [`JuryError::DuplicateDispute`]: the policy already has an open dispute.
    /// - [`JuryError::PolicyNotFound`], [`JuryError::LedgerUnavailable`]:
    ///   the policy ledger lookup failed.
    /// - [`JuryError::InvalidClaimant`]: the claimant does not own the policy.
    /// - [`JuryError::PolicyAlreadySettled`]: nothing left to dispute.
    /// - [`JuryError::InsufficientJurors`]: a full panel cannot be drawn.
    pub async fn create_dispute(
        &self,
        policy_id: PolicyId,
        claimant: JurorAddress,
        reason: String,
    ) -> Result<Dispute, JuryError> {
        let reason = reason.trim().to_string();
        if reason.is_empty() {
            return Err(JuryError::InvalidReason("reason must not be empty".into()));
        }
        if reason.chars().count() > MAX_REASON_CHARS {
            return Err(JuryError::InvalidReason(format!(
                "reason exceeds {MAX_REASON_CHARS} characters"
            )));
        }
        // Fast path; the entry claim below is the authoritative check.
        if let Some(existing) = self.open_by_policy.get(&policy_id) {
            return Err(JuryError::DuplicateDispute {
                policy_id,
                dispute_id: *existing,
            });
        }

        let policy = call_with_timeout(
            Arc::clone(&self.ledger),
            self.config.settlement.call_timeout(),
            move |ledger| ledger.policy(policy_id),
        )
        .await?;
        if policy.owner != claimant {
            return Err(JuryError::InvalidClaimant {
                policy_id,
                claimant,
            });
        }
        if policy.settled {
            return Err(JuryError::PolicyAlreadySettled(policy_id));
        }

        let dispute = match self.open_by_policy.entry(policy_id) {
            Entry::Occupied(existing) => {
                return Err(JuryError::DuplicateDispute {
                    policy_id,
                    dispute_id: *existing.get(),
                })
            }
            Entry::Vacant(slot) => {
                // A failed draw consumes its id; ids stay unique and increasing.
                let id = DisputeId::new(self.next_id.fetch_add(1, Ordering::SeqCst));
                let context = format!("{id}|{policy_id}|{claimant}");
                let panel = self.selector.select_panel(
                    &claimant,
                    self.config.panel.panel_size,
                    context.as_bytes(),
                )?;
                let dispute = Dispute::open(
                    id,
                    policy_id,
                    claimant,
                    reason,
                    panel.jurors.clone(),
                    panel.seed_hex(),
                    self.clock.now(),
                    self.config.voting.window(),
                );
                self.disputes
                    .insert(id, Arc::new(Mutex::new(dispute.clone())));
                slot.insert(id);
                dispute
            }
        };

        self.events.record(
            EventDraft::new(EventKind::DisputeCreated)
                .dispute(dispute.id)
                .juror(&dispute.claimant),
            dispute.created_at,
        );
        tracing::info!(
            dispute_id = dispute.id.value(),
            policy_id = policy_id.value(),
            claimant = %dispute.claimant,
            panel_size = dispute.assigned_jurors.len(),
            deadline = %dispute.voting_deadline,
            "dispute created"
        );
        Ok(dispute)
    }

    /// Snapshot of a dispute.
    pub fn get(&self, id: DisputeId) -> Result<Dispute, JuryError> {
        Ok(self.handle(id)?.lock().clone())
    }

    /// All disputes ordered by id, optionally only those with `status`.
    pub fn list(&self, status: Option<DisputeStatus>) -> Vec<Dispute> {
        let mut all: Vec<Dispute> = self
            .handles()
            .into_iter()
            .map(|h| h.lock().clone())
            .filter(|d| status.map_or(true, |s| d.status == s))
            .collect();
        all.sort_by_key(|d| d.id);
        all
    }

    /// Archive a resolved dispute. Idempotent.
    pub fn mark_processed(&self, id: DisputeId) -> Result<Dispute, JuryError> {
        let handle = self.handle(id)?;
        let (dispute, newly) = {
            let mut d = handle.lock();
            let newly = !d.processed;
            d.mark_processed()?;
            (d.clone(), newly)
        };
        if newly {
            self.events.record(
                EventDraft::new(EventKind::DisputeProcessed).dispute(id),
                self.clock.now(),
            );
            tracing::info!(dispute_id = id.value(), "dispute marked processed");
        }
        Ok(dispute)
    }

    /// Number of disputes still accepting votes.
    pub fn active_count(&self) -> usize {
        self.handles()
            .into_iter()
            .filter(|h| h.lock().status == DisputeStatus::Active)
            .count()
    }

    /// Whether `policy_id` has an open dispute, and which.
    pub fn open_dispute_for(&self, policy_id: PolicyId) -> Option<DisputeId> {
        self.open_by_policy.get(&policy_id).map(|d| *d)
    }

    /// The shared handle to a dispute.
    pub(crate) fn handle(&self, id: DisputeId) -> Result<Arc<Mutex<Dispute>>, JuryError> {
        self.disputes
            .get(&id)
            .map(|h| Arc::clone(h.value()))
            .ok_or_else(|| JuryError::dispute_not_found(id))
    }

    /// Handles of every dispute. The map guard is released before return,
    /// so callers may lock disputes freely.
    pub(crate) fn handles(&self) -> Vec<Arc<Mutex<Dispute>>> {
        self.disputes.iter().map(|h| Arc::clone(h.value())).collect()
    }

    /// Free the policy's open-dispute slot if `dispute_id` still holds it.
    pub(crate) fn release_policy(&self, policy_id: PolicyId, dispute_id: DisputeId) {
        self.open_by_policy
            .remove_if(&policy_id, |_, holder| *holder == dispute_id);
    }
}
