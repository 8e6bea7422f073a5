//! # Jury Service
//!
//! Wires the registry, selector, dispute ledger, voting engine and
//! settlement dispatcher around one configuration, clock, randomness
//! source and policy ledger. This is the entry point for the API, the CLI
//! simulator and the integration tests.

use std::sync::Arc;

use jury_core::{Clock, DisputeId, JurorAddress, JuryConfig, JuryError, PolicyId, SystemClock};
use jury_ledger::PolicyLedger;

use crate::dispute::{Dispute, DisputeStatus, VoteChoice};
use crate::disputes::DisputeLedger;
use crate::events::{DisputeEvent, DisputeStats, EventLog};
use crate::registry::{Eligibility, Juror, JurorRegistry};
use crate::selector::{JurorSelector, OsRandomness, RandomnessSource};
use crate::settlement::{SettlementDispatcher, SettlementRecord};
use crate::voting::{ExpiredDispute, VoteReceipt, VotingEngine};

/// The dispute resolution service. Cheap to share behind an `Arc`.
pub struct JuryService {
    config: Arc<JuryConfig>,
    registry: Arc<JurorRegistry>,
    disputes: Arc<DisputeLedger>,
    dispatcher: Arc<SettlementDispatcher>,
    voting: VotingEngine,
    events: EventLog,
}

/// Builder for [`JuryService`]. Defaults: system clock, OS randomness.
pub struct JuryServiceBuilder {
    config: JuryConfig,
    ledger: Arc<dyn PolicyLedger>,
    clock: Arc<dyn Clock>,
    randomness: Arc<dyn RandomnessSource>,
    events: EventLog,
}

impl JuryServiceBuilder {
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn randomness(mut self, randomness: Arc<dyn RandomnessSource>) -> Self {
        self.randomness = randomness;
        self
    }

    pub fn event_log(mut self, events: EventLog) -> Self {
        self.events = events;
        self
    }

    /// Validate the configuration and assemble the service.
    pub fn build(self) -> Result<JuryService, jury_core::ConfigError> {
        self.config.validate()?;
        let config = Arc::new(self.config);
        let registry = Arc::new(JurorRegistry::new(
            Arc::clone(&config),
            Arc::clone(&self.clock),
            self.events.clone(),
        ));
        let selector = JurorSelector::new(Arc::clone(&registry), self.randomness);
        let disputes = Arc::new(DisputeLedger::new(
            selector,
            Arc::clone(&self.ledger),
            Arc::clone(&config),
            Arc::clone(&self.clock),
            self.events.clone(),
        ));
        let dispatcher = Arc::new(SettlementDispatcher::new(
            self.ledger,
            Arc::clone(&disputes),
            config.settlement.clone(),
            Arc::clone(&self.clock),
            self.events.clone(),
        ));
        let voting = VotingEngine::new(
            Arc::clone(&disputes),
            Arc::clone(&registry),
            Arc::clone(&dispatcher),
            Arc::clone(&config),
            self.clock,
            self.events.clone(),
        );
        Ok(JuryService {
            config,
            registry,
            disputes,
            dispatcher,
            voting,
            events: self.events,
        })
    }
}

impl JuryService {
    /// Start building a service over `ledger`.
    pub fn builder(config: JuryConfig, ledger: Arc<dyn PolicyLedger>) -> JuryServiceBuilder {
        JuryServiceBuilder {
            config,
            ledger,
            clock: Arc::new(SystemClock),
            randomness: Arc::new(OsRandomness),
            events: EventLog::default(),
        }
    }

    pub fn config(&self) -> &JuryConfig {
        &self.config
    }

    // -- Jurors ---------------------------------------------------------------

    pub fn register_juror(&self, address: JurorAddress) -> Result<Juror, JuryError> {
        self.registry.register(address)
    }

    pub fn juror(&self, address: &JurorAddress) -> Result<Juror, JuryError> {
        self.registry.get_info(address)
    }

    pub fn jurors(&self) -> Vec<Juror> {
        self.registry.list()
    }

    pub fn eligibility(&self, address: &JurorAddress) -> Eligibility {
        self.registry.eligibility(address)
    }

    pub fn adjust_reputation(&self, address: &JurorAddress, delta: i64) -> Result<u64, JuryError> {
        self.registry.adjust_reputation(address, delta)
    }

    pub fn deactivate_juror(&self, address: &JurorAddress) -> Result<Juror, JuryError> {
        self.registry.deactivate(address)
    }

    pub fn reactivate_juror(&self, address: &JurorAddress) -> Result<Juror, JuryError> {
        self.registry.reactivate(address)
    }

    // -- Disputes -------------------------------------------------------------

    pub async fn create_dispute(
        &self,
        policy_id: PolicyId,
        claimant: JurorAddress,
        reason: String,
    ) -> Result<Dispute, JuryError> {
        self.disputes
            .create_dispute(policy_id, claimant, reason)
            .await
    }

    pub fn dispute(&self, id: DisputeId) -> Result<Dispute, JuryError> {
        self.disputes.get(id)
    }

    pub fn disputes(&self, status: Option<DisputeStatus>) -> Vec<Dispute> {
        self.disputes.list(status)
    }

    pub fn active_disputes(&self) -> usize {
        self.disputes.active_count()
    }

    pub fn mark_processed(&self, id: DisputeId) -> Result<Dispute, JuryError> {
        self.disputes.mark_processed(id)
    }

    pub async fn vote(
        &self,
        id: DisputeId,
        juror: JurorAddress,
        choice: VoteChoice,
    ) -> Result<VoteReceipt, JuryError> {
        self.voting.vote(id, juror, choice).await
    }

    pub async fn expire_overdue(&self) -> Vec<ExpiredDispute> {
        self.voting.expire_overdue().await
    }

    // -- Settlement -----------------------------------------------------------

    pub async fn retry_settlement(&self, id: DisputeId) -> Result<SettlementRecord, JuryError> {
        self.dispatcher.retry_settlement(id).await
    }

    pub fn settlement(&self, id: DisputeId) -> Option<SettlementRecord> {
        self.dispatcher.record(id)
    }

    pub fn failed_settlements(&self) -> Vec<SettlementRecord> {
        self.dispatcher.failed()
    }

    // -- Observability --------------------------------------------------------

    pub fn recent_events(&self, limit: usize) -> Vec<DisputeEvent> {
        self.events.recent(limit)
    }

    pub fn dispute_events(&self, id: DisputeId) -> Vec<DisputeEvent> {
        self.events.for_dispute(id)
    }

    pub fn stats(&self) -> DisputeStats {
        let mut stats = DisputeStats {
            registered_jurors: self.registry.len(),
            active_jurors: self.registry.active_count(),
            ..DisputeStats::default()
        };
        for dispute in self.disputes.list(None) {
            stats.total_disputes += 1;
            stats.total_votes_cast += dispute.total_votes;
            match dispute.status {
                DisputeStatus::Active => stats.active_disputes += 1,
                DisputeStatus::Approved => stats.approved_disputes += 1,
                DisputeStatus::Rejected => stats.rejected_disputes += 1,
            }
        }
        let (settled, failed) = self.dispatcher.counts();
        stats.settlements_completed = settled;
        stats.settlements_failed = failed;
        stats
    }
}
