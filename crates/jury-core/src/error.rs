//! # Error Types
//!
//! [`JuryError`] is the single taxonomy returned to callers of the dispute
//! service. Every validation failure is a variant here and is returned
//! synchronously; nothing in the domain panics on bad input.
//!
//! [`ConfigError`] covers loading and validating [`crate::JuryConfig`].

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::identity::{DisputeId, JurorAddress, PolicyId};

/// Domain error for juror, dispute, vote and settlement operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum JuryError {
    /// The referenced juror or dispute does not exist.
    #[error("{kind} {id} not found")]
    NotFound {
        /// Resource kind ("juror", "dispute").
        kind: &'static str,
        /// Identifier that was looked up.
        id: String,
    },

    /// The address already has a juror record.
    #[error("juror {0} is already registered")]
    AlreadyRegistered(JurorAddress),

    /// The policy already has an open dispute.
    #[error("{policy_id} already has open {dispute_id}")]
    DuplicateDispute {
        /// Policy under dispute.
        policy_id: PolicyId,
        /// The dispute that is still open.
        dispute_id: DisputeId,
    },

    /// The juror has already voted on this dispute.
    #[error("juror {juror} already voted on {dispute_id}")]
    DuplicateVote {
        /// Dispute voted on.
        dispute_id: DisputeId,
        /// Juror who attempted a second vote.
        juror: JurorAddress,
    },

    /// The juror is not on the dispute's panel.
    #[error("juror {juror} is not assigned to {dispute_id}")]
    NotAssigned {
        /// Dispute voted on.
        dispute_id: DisputeId,
        /// Juror outside the panel.
        juror: JurorAddress,
    },

    /// The juror cast a ballot too recently to cast another.
    #[error("juror {juror} voted too recently; next ballot allowed at {retry_at}")]
    VoteCooldown {
        /// Juror who attempted the ballot.
        juror: JurorAddress,
        /// Earliest time the juror may vote again.
        retry_at: DateTime<Utc>,
    },

    /// The dispute reached a terminal status and accepts no more votes.
    #[error("{dispute_id} is already resolved as {status}")]
    AlreadyResolved {
        /// Dispute voted on.
        dispute_id: DisputeId,
        /// Terminal status name.
        status: String,
    },

    /// The voting window closed.
    #[error("voting on {dispute_id} closed at {deadline}")]
    DeadlineExpired {
        /// Dispute voted on.
        dispute_id: DisputeId,
        /// The deadline that passed.
        deadline: DateTime<Utc>,
    },

    /// Not enough eligible jurors to fill a panel.
    #[error("insufficient jurors: {required} required, {available} eligible")]
    InsufficientJurors {
        /// Configured panel size.
        required: usize,
        /// Eligible jurors found.
        available: usize,
    },

    /// The claimant does not own the disputed policy.
    #[error("{claimant} is not the owner of {policy_id}")]
    InvalidClaimant {
        /// Policy under dispute.
        policy_id: PolicyId,
        /// Address that attempted to open the dispute.
        claimant: JurorAddress,
    },

    /// Settlement could not be completed; operator action is required.
    #[error("settlement of {dispute_id} failed after {attempts} attempt(s): {reason}")]
    SettlementFailed {
        /// Resolved dispute.
        dispute_id: DisputeId,
        /// Attempts made in the last cycle.
        attempts: u32,
        /// Last error reported by the policy ledger.
        reason: String,
    },

    /// The policy ledger has no such policy.
    #[error("{0} not found on the policy ledger")]
    PolicyNotFound(PolicyId),

    /// The dispute is still active.
    #[error("{dispute_id} is still active")]
    NotResolved {
        /// Dispute that has not been resolved.
        dispute_id: DisputeId,
    },

    /// The policy ledger reports the policy as settled already.
    #[error("{0} is already settled")]
    PolicyAlreadySettled(PolicyId),

    /// A settlement attempt for this dispute is running.
    #[error("settlement of {0} is already in progress")]
    SettlementInProgress(DisputeId),

    /// The policy ledger could not be reached.
    #[error("policy ledger unavailable: {0}")]
    LedgerUnavailable(String),

    /// A juror or claimant address failed validation.
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    /// The dispute reason failed validation.
    #[error("invalid dispute reason: {0}")]
    InvalidReason(String),
}

impl JuryError {
    /// A dispute lookup miss.
    pub fn dispute_not_found(id: DisputeId) -> Self {
        Self::NotFound {
            kind: "dispute",
            id: id.value().to_string(),
        }
    }

    /// A juror lookup miss.
    pub fn juror_not_found(address: &JurorAddress) -> Self {
        Self::NotFound {
            kind: "juror",
            id: address.to_string(),
        }
    }

    /// Stable machine-readable code for this error kind.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "NOT_FOUND",
            Self::AlreadyRegistered(_) => "ALREADY_REGISTERED",
            Self::DuplicateDispute { .. } => "DUPLICATE_DISPUTE",
            Self::DuplicateVote { .. } => "DUPLICATE_VOTE",
            Self::VoteCooldown { .. } => "VOTE_COOLDOWN",
            Self::NotAssigned { .. } => "NOT_ASSIGNED",
            Self::AlreadyResolved { .. } => "ALREADY_RESOLVED",
            Self::DeadlineExpired { .. } => "DEADLINE_EXPIRED",
            Self::InsufficientJurors { .. } => "INSUFFICIENT_JURORS",
            Self::InvalidClaimant { .. } => "INVALID_CLAIMANT",
            Self::SettlementFailed { .. } => "SETTLEMENT_FAILED",
            Self::PolicyNotFound(_) => "POLICY_NOT_FOUND",
            Self::NotResolved { .. } => "NOT_RESOLVED",
            Self::PolicyAlreadySettled(_) => "POLICY_ALREADY_SETTLED",
            Self::SettlementInProgress(_) => "SETTLEMENT_IN_PROGRESS",
            Self::LedgerUnavailable(_) => "LEDGER_UNAVAILABLE",
            Self::InvalidAddress(_) => "INVALID_ADDRESS",
            Self::InvalidReason(_) => "INVALID_REASON",
        }
    }
}

/// Error loading or validating configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("cannot read config {path}: {source}")]
    Io {
        /// File that was opened.
        path: PathBuf,
        /// Underlying IO error.
        source: std::io::Error,
    },

    /// The configuration is not valid YAML for [`crate::JuryConfig`].
    #[error("cannot parse config: {0}")]
    Parse(#[from] serde_yaml::Error),

    /// One or more values violate configuration constraints.
    #[error("invalid config: {}", errors.join("; "))]
    Invalid {
        /// Every violated constraint.
        errors: Vec<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_screaming_snake() {
        let errs = [
            JuryError::dispute_not_found(DisputeId::new(1)),
            JuryError::PolicyNotFound(PolicyId::new(2)),
            JuryError::SettlementInProgress(DisputeId::new(3)),
            JuryError::InsufficientJurors {
                required: 10,
                available: 4,
            },
        ];
        for e in errs {
            let code = e.code();
            assert!(code
                .chars()
                .all(|c| c.is_ascii_uppercase() || c == '_'));
        }
    }

    #[test]
    fn not_found_message_names_resource() {
        let e = JuryError::dispute_not_found(DisputeId::new(12));
        assert_eq!(e.to_string(), "dispute 12 not found");
        let addr = JurorAddress::new("juror-a").unwrap();
        let e = JuryError::juror_not_found(&addr);
        assert_eq!(e.to_string(), "juror juror-a not found");
    }

    #[test]
    fn invalid_config_lists_every_violation() {
        let e = ConfigError::Invalid {
            errors: vec!["a".to_string(), "b".to_string()],
        };
        assert_eq!(e.to_string(), "invalid config: a; b");
    }
}
