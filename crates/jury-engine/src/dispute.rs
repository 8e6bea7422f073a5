//! # Dispute Lifecycle
//!
//! A dispute moves through a two-step state machine:
//!
//! ```text
//!              vote() reaches quorum
//!   Active ───────────────────────────▶ Approved | Rejected
//!      │                                      ▲
//!      └──── deadline passes (expire) ────────┘
//! ```
//!
//! `Approved` and `Rejected` are terminal. The tally, ballot box and status
//! never change after a [`Resolution`] is recorded.
//!
//! ## Design Choice: Validated Enum
//!
//! Disputes are shared behind a mutex and serialized to API clients, so the
//! state is a runtime enum and every mutating method checks it. All checks
//! run before any field is touched: a rejected vote leaves the dispute
//! exactly as it was.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use jury_core::{DisputeId, ExpiryPolicy, JurorAddress, JuryError, PolicyId};
use serde::{Deserialize, Serialize};

/// Lifecycle status of a dispute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisputeStatus {
    /// Accepting votes.
    Active,
    /// Resolved in the claimant's favor. Terminal state.
    Approved,
    /// Resolved against the claimant. Terminal state.
    Rejected,
}

impl DisputeStatus {
    /// The canonical string name of this status.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }

    /// Whether this status is terminal (no further votes accepted).
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Active)
    }
}

impl fmt::Display for DisputeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DisputeStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "active" => Ok(Self::Active),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            other => Err(format!(
                "unknown dispute status {other:?} (expected active, approved or rejected)"
            )),
        }
    }
}

/// A juror's ballot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VoteChoice {
    /// The claim should be paid.
    Yes,
    /// The claim should be denied.
    No,
}

impl VoteChoice {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Yes => "yes",
            Self::No => "no",
        }
    }

    /// Whether this ballot agrees with `outcome`.
    pub fn matches(&self, outcome: Outcome) -> bool {
        matches!(
            (self, outcome),
            (Self::Yes, Outcome::Approved) | (Self::No, Outcome::Rejected)
        )
    }
}

impl FromStr for VoteChoice {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "yes" => Ok(Self::Yes),
            "no" => Ok(Self::No),
            other => Err(format!("unknown vote choice {other:?} (expected yes or no)")),
        }
    }
}

/// Final decision of a dispute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// Pay the claim.
    Approved,
    /// Deny the claim.
    Rejected,
}

impl Outcome {
    /// Whether the policy ledger should pay out.
    pub fn is_approved(&self) -> bool {
        matches!(self, Self::Approved)
    }

    pub fn as_str(&self) -> &'static str {
        self.status().as_str()
    }

    /// The terminal status this outcome produces.
    pub fn status(&self) -> DisputeStatus {
        match self {
            Self::Approved => DisputeStatus::Approved,
            Self::Rejected => DisputeStatus::Rejected,
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.status().as_str())
    }
}

/// Why a dispute was resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionReason {
    /// Enough votes were cast.
    QuorumReached,
    /// The voting window closed first.
    DeadlineExpired,
}

impl ResolutionReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::QuorumReached => "quorum_reached",
            Self::DeadlineExpired => "deadline_expired",
        }
    }
}

/// Record of a dispute's finalization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    /// Final decision.
    pub outcome: Outcome,
    /// When the dispute was finalized.
    pub resolved_at: DateTime<Utc>,
    /// Trigger of the finalization.
    pub reason: ResolutionReason,
}

/// One juror's vote on one dispute. Immutable once recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vote {
    /// Dispute voted on.
    pub dispute_id: DisputeId,
    /// Voting juror.
    pub juror: JurorAddress,
    /// Ballot.
    pub choice: VoteChoice,
    /// When the vote was accepted.
    pub cast_at: DateTime<Utc>,
}

/// A claim dispute under jury review.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dispute {
    /// Unique dispute identifier.
    pub id: DisputeId,
    /// Policy whose claim is disputed.
    pub policy_id: PolicyId,
    /// Policy owner who opened the dispute.
    pub claimant: JurorAddress,
    /// Claimant's statement.
    pub reason: String,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Current lifecycle status.
    pub status: DisputeStatus,
    /// Yes ballots cast.
    pub yes_votes: usize,
    /// No ballots cast.
    pub no_votes: usize,
    /// All ballots cast; always `yes_votes + no_votes`.
    pub total_votes: usize,
    /// Votes after this instant are rejected.
    pub voting_deadline: DateTime<Utc>,
    /// Panel drawn at creation. Fixed size, never modified.
    pub assigned_jurors: Vec<JurorAddress>,
    /// Hex of the 32-byte seed that drew the panel, for replay.
    pub selection_seed: String,
    /// Ballot box, in casting order.
    pub votes: Vec<Vote>,
    /// Set exactly once, on finalization.
    pub resolution: Option<Resolution>,
    /// Archived by an operator after resolution.
    pub processed: bool,
}

impl Dispute {
    /// Open a dispute in the [`Active`](DisputeStatus::Active) state.
    #[allow(clippy::too_many_arguments)]
    pub fn open(
        id: DisputeId,
        policy_id: PolicyId,
        claimant: JurorAddress,
        reason: String,
        assigned_jurors: Vec<JurorAddress>,
        selection_seed: String,
        created_at: DateTime<Utc>,
        voting_window: chrono::Duration,
    ) -> Self {
        Self {
            id,
            policy_id,
            claimant,
            reason,
            created_at,
            status: DisputeStatus::Active,
            yes_votes: 0,
            no_votes: 0,
            total_votes: 0,
            voting_deadline: created_at
                .checked_add_signed(voting_window)
                .unwrap_or(DateTime::<Utc>::MAX_UTC),
            assigned_jurors,
            selection_seed,
            votes: Vec::new(),
            resolution: None,
            processed: false,
        }
    }

    /// Whether `juror` sits on the panel.
    pub fn is_assigned(&self, juror: &JurorAddress) -> bool {
        self.assigned_jurors.contains(juror)
    }

    /// The ballot `juror` cast, if any.
    pub fn vote_of(&self, juror: &JurorAddress) -> Option<VoteChoice> {
        self.votes
            .iter()
            .find(|v| &v.juror == juror)
            .map(|v| v.choice)
    }

    /// The final outcome, once resolved.
    pub fn outcome(&self) -> Option<Outcome> {
        self.resolution.as_ref().map(|r| r.outcome)
    }

    /// Whether the dispute is still active past its deadline.
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        self.status == DisputeStatus::Active && now > self.voting_deadline
    }

    /// Whether this dispute would accept a ballot from `juror` at `now`.
    ///
    /// # Errors
    ///
    /// Checked in order: [`JuryError::AlreadyResolved`],
    /// [`JuryError::DeadlineExpired`], [`JuryError::NotAssigned`],
    /// [`JuryError::DuplicateVote`].
    pub fn check_ballot(&self, juror: &JurorAddress, now: DateTime<Utc>) -> Result<(), JuryError> {
        if self.status.is_terminal() {
            return Err(JuryError::AlreadyResolved {
                dispute_id: self.id,
                status: self.status.to_string(),
            });
        }
        if now > self.voting_deadline {
            return Err(JuryError::DeadlineExpired {
                dispute_id: self.id,
                deadline: self.voting_deadline,
            });
        }
        if !self.is_assigned(juror) {
            return Err(JuryError::NotAssigned {
                dispute_id: self.id,
                juror: juror.clone(),
            });
        }
        if self.vote_of(juror).is_some() {
            return Err(JuryError::DuplicateVote {
                dispute_id: self.id,
                juror: juror.clone(),
            });
        }
        Ok(())
    }

    /// Validate and record a ballot. Nothing changes on error; see
    /// [`Dispute::check_ballot`].
    pub fn cast_vote(
        &mut self,
        juror: &JurorAddress,
        choice: VoteChoice,
        now: DateTime<Utc>,
    ) -> Result<(), JuryError> {
        self.check_ballot(juror, now)?;
        match choice {
            VoteChoice::Yes => self.yes_votes += 1,
            VoteChoice::No => self.no_votes += 1,
        }
        self.total_votes += 1;
        self.votes.push(Vote {
            dispute_id: self.id,
            juror: juror.clone(),
            choice,
            cast_at: now,
        });
        Ok(())
    }

    /// Whether `quorum` ballots have been cast.
    pub fn quorum_reached(&self, quorum: usize) -> bool {
        self.total_votes >= quorum
    }

    /// Outcome at quorum: approved iff Yes ballots reach `approval_threshold`.
    pub fn outcome_at_quorum(&self, approval_threshold: usize) -> Outcome {
        if self.yes_votes >= approval_threshold {
            Outcome::Approved
        } else {
            Outcome::Rejected
        }
    }

    /// Outcome when the voting window closes before quorum.
    pub fn outcome_on_expiry(&self, policy: ExpiryPolicy) -> Outcome {
        match policy {
            ExpiryPolicy::Reject => Outcome::Rejected,
            ExpiryPolicy::MajorityOfCast if self.yes_votes > self.no_votes => Outcome::Approved,
            ExpiryPolicy::MajorityOfCast => Outcome::Rejected,
        }
    }

    /// Transition Active → Approved | Rejected.
    ///
    /// # Errors
    ///
    /// Returns [`JuryError::AlreadyResolved`] if a resolution exists; a
    /// dispute is finalized at most once.
    pub fn resolve(
        &mut self,
        outcome: Outcome,
        reason: ResolutionReason,
        now: DateTime<Utc>,
    ) -> Result<Resolution, JuryError> {
        if self.resolution.is_some() || self.status.is_terminal() {
            return Err(JuryError::AlreadyResolved {
                dispute_id: self.id,
                status: self.status.to_string(),
            });
        }
        let resolution = Resolution {
            outcome,
            resolved_at: now,
            reason,
        };
        self.status = outcome.status();
        self.resolution = Some(resolution.clone());
        Ok(resolution)
    }

    /// Flag a resolved dispute as archived. Idempotent.
    ///
    /// # Errors
    ///
    /// Returns [`JuryError::NotResolved`] while the dispute is active.
    pub fn mark_processed(&mut self) -> Result<(), JuryError> {
        if !self.status.is_terminal() {
            return Err(JuryError::NotResolved {
                dispute_id: self.id,
            });
        }
        self.processed = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use proptest::prelude::*;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 4, 1, 9, 0, 0).unwrap()
    }

    fn addr(s: &str) -> JurorAddress {
        JurorAddress::new(s).unwrap()
    }

    fn panel(n: usize) -> Vec<JurorAddress> {
        (0..n).map(|i| addr(&format!("juror-{i}"))).collect()
    }

    fn dispute() -> Dispute {
        Dispute::open(
            DisputeId::new(1),
            PolicyId::new(10),
            addr("farmer"),
            "drought index misread".into(),
            panel(10),
            "00".repeat(32),
            t0(),
            Duration::days(7),
        )
    }

    #[test]
    fn open_sets_deadline_from_window() {
        let d = dispute();
        assert_eq!(d.status, DisputeStatus::Active);
        assert_eq!(d.voting_deadline, t0() + Duration::days(7));
        assert!(d.resolution.is_none());
    }

    #[test]
    fn vote_updates_tally_and_ballot_box() {
        let mut d = dispute();
        d.cast_vote(&addr("juror-0"), VoteChoice::Yes, t0()).unwrap();
        d.cast_vote(&addr("juror-1"), VoteChoice::No, t0()).unwrap();
        assert_eq!((d.yes_votes, d.no_votes, d.total_votes), (1, 1, 2));
        assert_eq!(d.vote_of(&addr("juror-1")), Some(VoteChoice::No));
    }

    #[test]
    fn duplicate_vote_is_rejected_without_change() {
        let mut d = dispute();
        d.cast_vote(&addr("juror-0"), VoteChoice::Yes, t0()).unwrap();
        let before = d.clone();
        let err = d
            .cast_vote(&addr("juror-0"), VoteChoice::No, t0())
            .unwrap_err();
        assert_eq!(err.code(), "DUPLICATE_VOTE");
        assert_eq!(d, before);
    }

    #[test]
    fn outsider_is_not_assigned() {
        let mut d = dispute();
        let err = d
            .cast_vote(&addr("outsider"), VoteChoice::Yes, t0())
            .unwrap_err();
        assert_eq!(err.code(), "NOT_ASSIGNED");
        assert_eq!(d.total_votes, 0);
    }

    #[test]
    fn deadline_check_precedes_assignment_check() {
        let mut d = dispute();
        let late = t0() + Duration::days(7) + Duration::seconds(1);
        let err = d.cast_vote(&addr("outsider"), VoteChoice::Yes, late).unwrap_err();
        assert_eq!(err.code(), "DEADLINE_EXPIRED");
    }

    #[test]
    fn vote_exactly_at_deadline_is_accepted() {
        let mut d = dispute();
        let at = d.voting_deadline;
        assert!(d.cast_vote(&addr("juror-3"), VoteChoice::Yes, at).is_ok());
    }

    #[test]
    fn resolved_dispute_rejects_votes_and_second_resolution() {
        let mut d = dispute();
        d.resolve(Outcome::Approved, ResolutionReason::QuorumReached, t0())
            .unwrap();
        let err = d.cast_vote(&addr("juror-0"), VoteChoice::No, t0()).unwrap_err();
        assert_eq!(err.code(), "ALREADY_RESOLVED");
        assert!(d
            .resolve(Outcome::Rejected, ResolutionReason::DeadlineExpired, t0())
            .is_err());
        assert_eq!(d.status, DisputeStatus::Approved);
    }

    #[test]
    fn yes_majority_of_quorum_approves() {
        for yes in 4..=7 {
            let mut d = dispute();
            for i in 0..7 {
                let choice = if i < yes { VoteChoice::Yes } else { VoteChoice::No };
                d.cast_vote(&addr(&format!("juror-{i}")), choice, t0())
                    .unwrap();
            }
            assert!(d.quorum_reached(7));
            assert_eq!(d.outcome_at_quorum(4), Outcome::Approved, "{yes} yes");
        }
    }

    #[test]
    fn check_ballot_leaves_tally_alone() {
        let d = dispute();
        d.check_ballot(&addr("juror-0"), t0()).unwrap();
        assert_eq!(d.total_votes, 0);
        assert_eq!(
            d.check_ballot(&addr("outsider"), t0()).unwrap_err().code(),
            "NOT_ASSIGNED"
        );
    }

    #[test]
    fn huge_window_saturates_deadline() {
        let d = Dispute::open(
            DisputeId::new(2),
            PolicyId::new(1),
            addr("farmer"),
            "hail".into(),
            panel(10),
            "seed".into(),
            t0(),
            Duration::MAX,
        );
        assert_eq!(d.voting_deadline, DateTime::<Utc>::MAX_UTC);
        assert!(!d.is_overdue(t0()));
    }

    #[test]
    fn three_yes_four_no_rejects() {
        let mut d = dispute();
        for i in 0..3 {
            d.cast_vote(&addr(&format!("juror-{i}")), VoteChoice::Yes, t0())
                .unwrap();
        }
        for i in 3..7 {
            d.cast_vote(&addr(&format!("juror-{i}")), VoteChoice::No, t0())
                .unwrap();
        }
        assert_eq!(d.outcome_at_quorum(4), Outcome::Rejected);
    }

    #[test]
    fn expiry_policies() {
        let mut d = dispute();
        for i in 0..3 {
            d.cast_vote(&addr(&format!("juror-{i}")), VoteChoice::Yes, t0())
                .unwrap();
        }
        d.cast_vote(&addr("juror-3"), VoteChoice::No, t0()).unwrap();
        assert_eq!(d.outcome_on_expiry(ExpiryPolicy::Reject), Outcome::Rejected);
        assert_eq!(
            d.outcome_on_expiry(ExpiryPolicy::MajorityOfCast),
            Outcome::Approved
        );
    }

    #[test]
    fn mark_processed_requires_resolution() {
        let mut d = dispute();
        assert_eq!(d.mark_processed().unwrap_err().code(), "NOT_RESOLVED");
        d.resolve(Outcome::Rejected, ResolutionReason::DeadlineExpired, t0())
            .unwrap();
        d.mark_processed().unwrap();
        d.mark_processed().unwrap();
        assert!(d.processed);
    }

    #[test]
    fn status_parses_case_insensitively() {
        assert_eq!("APPROVED".parse::<DisputeStatus>(), Ok(DisputeStatus::Approved));
        assert!("closed".parse::<DisputeStatus>().is_err());
        assert_eq!("Yes".parse::<VoteChoice>(), Ok(VoteChoice::Yes));
        assert!("abstain".parse::<VoteChoice>().is_err());
    }

    proptest! {
        #[test]
        fn tally_is_consistent_and_status_monotonic(
            ballots in proptest::collection::vec((0usize..12, any::<bool>()), 0..40)
        ) {
            let mut d = dispute();
            let mut terminal_seen: Option<DisputeStatus> = None;
            for (juror, yes) in ballots {
                let choice = if yes { VoteChoice::Yes } else { VoteChoice::No };
                let _ = d.cast_vote(&addr(&format!("juror-{juror}")), choice, t0());
                if d.status == DisputeStatus::Active && d.quorum_reached(7) {
                    let outcome = d.outcome_at_quorum(6);
                    d.resolve(outcome, ResolutionReason::QuorumReached, t0()).unwrap();
                }
                prop_assert_eq!(d.yes_votes + d.no_votes, d.total_votes);
                prop_assert_eq!(d.total_votes, d.votes.len());
                if let Some(s) = terminal_seen {
                    prop_assert_eq!(d.status, s);
                }
                if d.status.is_terminal() {
                    terminal_seen = Some(d.status);
                }
            }
            prop_assert!(d.total_votes <= 7);
        }
    }
}
