//! # Juror Registry
//!
//! Owns every juror record. Records are never deleted: a juror who should
//! no longer be drawn is deactivated, and can be reactivated later.
//!
//! Jurors live in a `DashMap`, so updates to one juror are serialized by its
//! shard lock while different jurors update in parallel. The registry never
//! takes a dispute lock; callers that hold one may call into the registry
//! (lock order is dispute, then juror).

use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use jury_core::{Clock, JurorAddress, JuryConfig, JuryError};
use serde::{Deserialize, Serialize};

use crate::events::{EventDraft, EventKind, EventLog};

/// A registered juror.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Juror {
    /// Account address; unique.
    pub address: JurorAddress,
    /// Accuracy score; drives selection weight.
    pub reputation: u64,
    /// Ballots cast over the juror's lifetime.
    pub total_votes: u64,
    /// Ballots that matched the final outcome.
    pub correct_votes: u64,
    /// Stake recorded at registration, in micro-units.
    pub staked_amount: u64,
    /// Registration time.
    pub registered_at: DateTime<Utc>,
    /// Time of the most recent ballot.
    pub last_vote_at: Option<DateTime<Utc>>,
    /// Whether the juror can be drawn onto new panels.
    pub active: bool,
}

/// Whether a juror may be drawn onto a new panel, and if not, why.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Eligibility {
    /// No juror with this address.
    NotRegistered,
    /// Deactivated by an operator.
    Inactive,
    /// Registered too recently.
    CoolingDown {
        /// When the juror becomes eligible.
        eligible_at: DateTime<Utc>,
    },
    /// Reputation below the configured minimum.
    LowReputation {
        reputation: u64,
        minimum: u64,
    },
    /// May be drawn.
    Eligible,
}

impl Eligibility {
    pub fn is_eligible(&self) -> bool {
        matches!(self, Self::Eligible)
    }
}

/// Concurrent store of juror records.
pub struct JurorRegistry {
    jurors: DashMap<JurorAddress, Juror>,
    config: Arc<JuryConfig>,
    clock: Arc<dyn Clock>,
    events: EventLog,
}

impl JurorRegistry {
    pub fn new(config: Arc<JuryConfig>, clock: Arc<dyn Clock>, events: EventLog) -> Self {
        Self {
            jurors: DashMap::new(),
            config,
            clock,
            events,
        }
    }

    /// Register a new juror with the configured baseline reputation and
    /// stake.
    ///
    /// # Errors
    ///
    /// [`JuryError::AlreadyRegistered`] if the address exists; the existing
    /// record is left untouched.
    pub fn register(&self, address: JurorAddress) -> Result<Juror, JuryError> {
        let now = self.clock.now();
        let juror = match self.jurors.entry(address.clone()) {
            Entry::Occupied(_) => return Err(JuryError::AlreadyRegistered(address)),
            Entry::Vacant(slot) => {
                let juror = Juror {
                    address: address.clone(),
                    reputation: self.config.reputation.initial,
                    total_votes: 0,
                    correct_votes: 0,
                    staked_amount: self.config.reputation.min_stake,
                    registered_at: now,
                    last_vote_at: None,
                    active: true,
                };
                slot.insert(juror.clone());
                juror
            }
        };
        self.events
            .record(EventDraft::new(EventKind::JurorRegistered).juror(&address), now);
        tracing::info!(juror = %address, reputation = juror.reputation, "juror registered");
        Ok(juror)
    }

    /// Look up a juror.
    pub fn get_info(&self, address: &JurorAddress) -> Result<Juror, JuryError> {
        self.jurors
            .get(address)
            .map(|j| j.clone())
            .ok_or_else(|| JuryError::juror_not_found(address))
    }

    /// Add `delta` to a juror's reputation, clamped to the configured
    /// bounds. Returns the new reputation.
    pub fn adjust_reputation(&self, address: &JurorAddress, delta: i64) -> Result<u64, JuryError> {
        let mut juror = self
            .jurors
            .get_mut(address)
            .ok_or_else(|| JuryError::juror_not_found(address))?;
        let updated = self
            .config
            .reputation
            .clamp(i128::from(juror.reputation) + i128::from(delta));
        juror.reputation = updated;
        Ok(updated)
    }

    /// Stop drawing a juror onto new panels. Idempotent.
    pub fn deactivate(&self, address: &JurorAddress) -> Result<Juror, JuryError> {
        self.set_active(address, false)
    }

    /// Allow a deactivated juror to be drawn again. Idempotent.
    pub fn reactivate(&self, address: &JurorAddress) -> Result<Juror, JuryError> {
        self.set_active(address, true)
    }

    fn set_active(&self, address: &JurorAddress, active: bool) -> Result<Juror, JuryError> {
        let (juror, changed) = {
            let mut juror = self
                .jurors
                .get_mut(address)
                .ok_or_else(|| JuryError::juror_not_found(address))?;
            let changed = juror.active != active;
            juror.active = active;
            (juror.clone(), changed)
        };
        if changed {
            let kind = if active {
                EventKind::JurorReactivated
            } else {
                EventKind::JurorDeactivated
            };
            self.events
                .record(EventDraft::new(kind).juror(address), self.clock.now());
            tracing::info!(juror = %address, active, "juror activation changed");
        }
        Ok(juror)
    }

    /// Whether `address` may be drawn onto a new panel now.
    pub fn eligibility(&self, address: &JurorAddress) -> Eligibility {
        let now = self.clock.now();
        match self.jurors.get(address) {
            Some(juror) => self.eligibility_of(&juror, now),
            None => Eligibility::NotRegistered,
        }
    }

    fn eligibility_of(&self, juror: &Juror, now: DateTime<Utc>) -> Eligibility {
        let panel = &self.config.panel;
        if !juror.active {
            return Eligibility::Inactive;
        }
        let eligible_at = juror
            .registered_at
            .checked_add_signed(panel.registration_cooldown())
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        if now < eligible_at {
            return Eligibility::CoolingDown { eligible_at };
        }
        if juror.reputation < panel.min_reputation {
            return Eligibility::LowReputation {
                reputation: juror.reputation,
                minimum: panel.min_reputation,
            };
        }
        Eligibility::Eligible
    }

    /// All jurors, ordered by address.
    pub fn list(&self) -> Vec<Juror> {
        let mut all: Vec<Juror> = self.jurors.iter().map(|j| j.value().clone()).collect();
        all.sort_by(|a, b| a.address.cmp(&b.address));
        all
    }

    /// Eligible jurors other than `exclude`, with their reputation, ordered
    /// by address so a recorded seed replays to the same panel.
    pub fn candidates(&self, exclude: &JurorAddress) -> Vec<(JurorAddress, u64)> {
        let now = self.clock.now();
        let mut eligible: Vec<(JurorAddress, u64)> = self
            .jurors
            .iter()
            .filter(|j| j.key() != exclude && self.eligibility_of(j.value(), now).is_eligible())
            .map(|j| (j.key().clone(), j.reputation))
            .collect();
        eligible.sort_by(|a, b| a.0.cmp(&b.0));
        eligible
    }

    /// Count a ballot against the juror's record.
    ///
    /// # Errors
    ///
    /// [`JuryError::VoteCooldown`] if the juror's previous ballot is within
    /// the configured vote cooldown; the record is left untouched.
    pub(crate) fn record_vote(
        &self,
        address: &JurorAddress,
        at: DateTime<Utc>,
    ) -> Result<(), JuryError> {
        let Some(mut juror) = self.jurors.get_mut(address) else {
            tracing::warn!(juror = %address, "ballot from unregistered panel member");
            return Ok(());
        };
        let cooldown = self.config.voting.vote_cooldown();
        if let Some(last) = juror.last_vote_at.filter(|_| cooldown > chrono::TimeDelta::zero()) {
            let retry_at = last
                .checked_add_signed(cooldown)
                .unwrap_or(DateTime::<Utc>::MAX_UTC);
            if at < retry_at {
                return Err(JuryError::VoteCooldown {
                    juror: address.clone(),
                    retry_at,
                });
            }
        }
        juror.total_votes += 1;
        juror.last_vote_at = Some(at);
        Ok(())
    }

    /// Apply a post-resolution reputation change.
    pub(crate) fn apply_resolution(&self, address: &JurorAddress, delta: i64, correct: bool) {
        match self.jurors.get_mut(address) {
            Some(mut juror) => {
                juror.reputation = self
                    .config
                    .reputation
                    .clamp(i128::from(juror.reputation) + i128::from(delta));
                if correct {
                    juror.correct_votes += 1;
                }
            }
            None => tracing::warn!(juror = %address, "resolution for unregistered panel member"),
        }
    }

    pub fn len(&self) -> usize {
        self.jurors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jurors.is_empty()
    }

    pub fn active_count(&self) -> usize {
        self.jurors.iter().filter(|j| j.active).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use jury_core::ManualClock;

    fn addr(s: &str) -> JurorAddress {
        JurorAddress::new(s).unwrap()
    }

    fn registry_with(config: JuryConfig) -> (JurorRegistry, ManualClock) {
        let clock = ManualClock::new(Utc.with_ymd_and_hms(2026, 6, 1, 0, 0, 0).unwrap());
        let registry = JurorRegistry::new(
            Arc::new(config),
            Arc::new(clock.clone()),
            EventLog::default(),
        );
        (registry, clock)
    }

    fn registry() -> JurorRegistry {
        registry_with(JuryConfig::default()).0
    }

    #[test]
    fn register_initializes_baseline() {
        let r = registry();
        let j = r.register(addr("juror-a")).unwrap();
        assert_eq!(j.reputation, 100);
        assert_eq!(j.staked_amount, 1_000_000);
        assert!(j.active);
        assert_eq!(j.total_votes, 0);
    }

    #[test]
    fn duplicate_registration_leaves_record_untouched() {
        let r = registry();
        r.register(addr("juror-a")).unwrap();
        r.adjust_reputation(&addr("juror-a"), 40).unwrap();
        let err = r.register(addr("juror-a")).unwrap_err();
        assert_eq!(err, JuryError::AlreadyRegistered(addr("juror-a")));
        assert_eq!(r.get_info(&addr("juror-a")).unwrap().reputation, 140);
    }

    #[test]
    fn unknown_juror_is_not_found() {
        let r = registry();
        assert_eq!(r.get_info(&addr("ghost")).unwrap_err().code(), "NOT_FOUND");
        assert!(r.adjust_reputation(&addr("ghost"), 1).is_err());
        assert_eq!(r.eligibility(&addr("ghost")), Eligibility::NotRegistered);
    }

    #[test]
    fn reputation_is_clamped() {
        let r = registry();
        r.register(addr("juror-a")).unwrap();
        assert_eq!(r.adjust_reputation(&addr("juror-a"), -500).unwrap(), 0);
        assert_eq!(r.adjust_reputation(&addr("juror-a"), 5_000).unwrap(), 1000);
    }

    #[test]
    fn deactivated_juror_is_not_a_candidate() {
        let r = registry();
        r.register(addr("juror-a")).unwrap();
        r.register(addr("juror-b")).unwrap();
        r.deactivate(&addr("juror-a")).unwrap();
        assert_eq!(r.eligibility(&addr("juror-a")), Eligibility::Inactive);
        let c: Vec<_> = r.candidates(&addr("nobody")).into_iter().map(|c| c.0).collect();
        assert_eq!(c, vec![addr("juror-b")]);
        r.reactivate(&addr("juror-a")).unwrap();
        assert_eq!(r.candidates(&addr("nobody")).len(), 2);
        assert_eq!(r.active_count(), 2);
    }

    #[test]
    fn candidates_exclude_claimant_and_sort() {
        let r = registry();
        for a in ["juror-c", "juror-a", "claimant", "juror-b"] {
            r.register(addr(a)).unwrap();
        }
        let c: Vec<_> = r.candidates(&addr("claimant")).into_iter().map(|c| c.0).collect();
        assert_eq!(c, vec![addr("juror-a"), addr("juror-b"), addr("juror-c")]);
    }

    #[test]
    fn low_reputation_is_ineligible() {
        let r = registry();
        r.register(addr("juror-a")).unwrap();
        r.adjust_reputation(&addr("juror-a"), -95).unwrap();
        assert_eq!(
            r.eligibility(&addr("juror-a")),
            Eligibility::LowReputation {
                reputation: 5,
                minimum: 10
            }
        );
    }

    #[test]
    fn cooldown_delays_eligibility() {
        let mut config = JuryConfig::default();
        config.panel.registration_cooldown_secs = 3600;
        let (r, clock) = registry_with(config);
        r.register(addr("juror-a")).unwrap();
        assert!(matches!(
            r.eligibility(&addr("juror-a")),
            Eligibility::CoolingDown { .. }
        ));
        clock.advance(Duration::hours(1));
        assert!(r.eligibility(&addr("juror-a")).is_eligible());
    }

    #[test]
    fn huge_cooldown_keeps_juror_cooling_down() {
        let mut config = JuryConfig::default();
        config.panel.registration_cooldown_secs = u64::MAX;
        let (r, clock) = registry_with(config);
        r.register(addr("juror-a")).unwrap();
        clock.advance(Duration::days(365));
        assert!(matches!(
            r.eligibility(&addr("juror-a")),
            Eligibility::CoolingDown { .. }
        ));
        assert!(r.candidates(&addr("nobody")).is_empty());
    }

    #[test]
    fn vote_cooldown_spaces_ballots() {
        let mut config = JuryConfig::default();
        config.voting.vote_cooldown_secs = 600;
        let (r, clock) = registry_with(config);
        r.register(addr("juror-a")).unwrap();
        let first = clock.now();
        r.record_vote(&addr("juror-a"), first).unwrap();

        clock.advance(Duration::minutes(5));
        let err = r.record_vote(&addr("juror-a"), clock.now()).unwrap_err();
        assert_eq!(
            err,
            JuryError::VoteCooldown {
                juror: addr("juror-a"),
                retry_at: first + Duration::minutes(10),
            }
        );
        assert_eq!(r.get_info(&addr("juror-a")).unwrap().total_votes, 1);

        clock.advance(Duration::minutes(5));
        r.record_vote(&addr("juror-a"), clock.now()).unwrap();
        assert_eq!(r.get_info(&addr("juror-a")).unwrap().total_votes, 2);
    }

    #[test]
    fn no_vote_cooldown_by_default() {
        let (r, clock) = registry_with(JuryConfig::default());
        r.register(addr("juror-a")).unwrap();
        r.record_vote(&addr("juror-a"), clock.now()).unwrap();
        r.record_vote(&addr("juror-a"), clock.now()).unwrap();
        assert_eq!(r.get_info(&addr("juror-a")).unwrap().total_votes, 2);
    }

    #[test]
    fn resolution_updates_reputation_and_accuracy() {
        let r = registry();
        r.register(addr("juror-a")).unwrap();
        r.apply_resolution(&addr("juror-a"), 10, true);
        r.apply_resolution(&addr("juror-a"), -10, false);
        r.apply_resolution(&addr("juror-a"), 10, true);
        let j = r.get_info(&addr("juror-a")).unwrap();
        assert_eq!(j.reputation, 110);
        assert_eq!(j.correct_votes, 2);
    }

    #[test]
    fn list_is_ordered() {
        let r = registry();
        r.register(addr("b")).unwrap();
        r.register(addr("a")).unwrap();
        let names: Vec<_> = r.list().into_iter().map(|j| j.address).collect();
        assert_eq!(names, vec![addr("a"), addr("b")]);
    }
}
