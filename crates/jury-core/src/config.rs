//! # Service Configuration
//!
//! All tunables of the dispute service. The historical deployment used a
//! fixed panel of 10 jurors with 7 votes to resolve; those remain the
//! defaults, but the invariant that matters is the ratio: the quorum must be
//! a strict majority of the panel, and the approval threshold a strict
//! majority of the quorum.
//!
//! ## File Format
//!
//! YAML, every field optional:
//!
//! ```yaml
//! panel:
//!   panel_size: 10
//!   quorum_threshold: 7
//!   approval_threshold: 4      # defaults to quorum_threshold / 2 + 1
//!   min_reputation: 10
//!   registration_cooldown_secs: 0
//! reputation:
//!   initial: 100
//!   floor: 0
//!   ceiling: 1000
//!   reward: 10
//!   penalty: 10
//!   abstention_penalty: 0
//!   min_stake: 1000000
//! voting:
//!   window_secs: 604800
//!   vote_cooldown_secs: 0
//!   expiry_policy: reject      # or majority_of_cast
//!   sweep_interval_secs: 60
//! settlement:
//!   max_attempts: 3
//!   base_backoff_ms: 200
//!   call_timeout_ms: 5000
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Longest accepted voting window, registration cooldown or vote cooldown.
pub const MAX_PERIOD_SECS: u64 = 10 * 365 * 24 * 60 * 60;

fn period(secs: u64) -> chrono::TimeDelta {
    i64::try_from(secs.min(MAX_PERIOD_SECS))
        .ok()
        .and_then(chrono::TimeDelta::try_seconds)
        .unwrap_or(chrono::TimeDelta::MAX)
}

/// Top-level configuration of the dispute service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct JuryConfig {
    /// Panel composition and resolution thresholds.
    pub panel: PanelConfig,
    /// Juror reputation bookkeeping.
    pub reputation: ReputationConfig,
    /// Voting window and expiry handling.
    pub voting: VotingConfig,
    /// Settlement dispatch retry policy.
    pub settlement: SettlementConfig,
}

/// Panel composition and resolution thresholds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PanelConfig {
    /// Jurors assigned to each dispute.
    pub panel_size: usize,
    /// Votes cast at which a dispute resolves.
    pub quorum_threshold: usize,
    /// Yes votes needed for approval. `None` means a majority of the quorum.
    pub approval_threshold: Option<usize>,
    /// Minimum reputation to be drawn onto a panel.
    pub min_reputation: u64,
    /// Seconds after registration before a juror can be drawn.
    pub registration_cooldown_secs: u64,
}

impl Default for PanelConfig {
    fn default() -> Self {
        Self {
            panel_size: 10,
            quorum_threshold: 7,
            approval_threshold: None,
            min_reputation: 10,
            registration_cooldown_secs: 0,
        }
    }
}

impl PanelConfig {
    /// Yes votes required for an Approved outcome.
    pub fn effective_approval_threshold(&self) -> usize {
        self.approval_threshold
            .unwrap_or(self.quorum_threshold / 2 + 1)
    }

    /// Time between registration and first eligibility.
    pub fn registration_cooldown(&self) -> chrono::TimeDelta {
        period(self.registration_cooldown_secs)
    }
}

/// Juror reputation bookkeeping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReputationConfig {
    /// Reputation of a newly registered juror.
    pub initial: u64,
    /// Lowest reputation a juror can fall to.
    pub floor: u64,
    /// Highest reputation a juror can reach.
    pub ceiling: u64,
    /// Gain for voting with the final outcome.
    pub reward: u64,
    /// Loss for voting against the final outcome.
    pub penalty: u64,
    /// Loss for an assigned juror who did not vote.
    pub abstention_penalty: u64,
    /// Stake recorded for a newly registered juror, in micro-units.
    pub min_stake: u64,
}

impl Default for ReputationConfig {
    fn default() -> Self {
        Self {
            initial: 100,
            floor: 0,
            ceiling: 1000,
            reward: 10,
            penalty: 10,
            abstention_penalty: 0,
            min_stake: 1_000_000,
        }
    }
}

impl ReputationConfig {
    /// Clamp a signed reputation value into `[floor, ceiling]`.
    pub fn clamp(&self, value: i128) -> u64 {
        let floor = i128::from(self.floor);
        let ceiling = i128::from(self.ceiling);
        // Bounds come from u64, so the narrowing below cannot truncate.
        value.clamp(floor, ceiling) as u64
    }
}

/// What happens to a dispute whose voting window closes before quorum.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpiryPolicy {
    /// Resolve as Rejected regardless of votes cast.
    #[default]
    Reject,
    /// Approve iff Yes votes outnumber No votes among those cast.
    MajorityOfCast,
}

/// Voting window and expiry handling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct VotingConfig {
    /// Length of the voting window in seconds.
    pub window_secs: u64,
    /// Seconds a juror must wait after one ballot before casting another.
    pub vote_cooldown_secs: u64,
    /// Outcome for disputes that expire before quorum.
    pub expiry_policy: ExpiryPolicy,
    /// How often the API sweeps for expired disputes.
    pub sweep_interval_secs: u64,
}

impl Default for VotingConfig {
    fn default() -> Self {
        Self {
            window_secs: 7 * 24 * 60 * 60,
            vote_cooldown_secs: 0,
            expiry_policy: ExpiryPolicy::Reject,
            sweep_interval_secs: 60,
        }
    }
}

impl VotingConfig {
    /// The voting window as a chrono duration.
    pub fn window(&self) -> chrono::TimeDelta {
        period(self.window_secs)
    }

    /// Minimum gap between two ballots of the same juror.
    pub fn vote_cooldown(&self) -> chrono::TimeDelta {
        period(self.vote_cooldown_secs)
    }
}

/// Settlement dispatch retry policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SettlementConfig {
    /// Attempts per dispatch cycle, including the first.
    pub max_attempts: u32,
    /// Delay before the first retry; doubles after each further failure.
    pub base_backoff_ms: u64,
    /// Upper bound on a single policy-ledger call.
    pub call_timeout_ms: u64,
}

impl Default for SettlementConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_backoff_ms: 200,
            call_timeout_ms: 5_000,
        }
    }
}

impl SettlementConfig {
    /// Upper bound on a single policy-ledger call.
    pub fn call_timeout(&self) -> Duration {
        Duration::from_millis(self.call_timeout_ms)
    }

    /// Delay after the given failed attempt (1-based): base, 2×base, 4×base, …
    pub fn backoff_after(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        Duration::from_millis(self.base_backoff_ms.saturating_mul(1u64 << exponent))
    }
}

impl JuryConfig {
    /// Parse a YAML document and validate it.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a YAML configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&raw)
    }

    /// Render the configuration as YAML.
    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Check every constraint, collecting all violations.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors = Vec::new();
        let panel = &self.panel;
        let majority = panel.panel_size / 2 + 1;

        if panel.panel_size == 0 {
            errors.push("panel.panel_size must be at least 1".to_string());
        }
        if panel.quorum_threshold < majority || panel.quorum_threshold > panel.panel_size {
            errors.push(format!(
                "panel.quorum_threshold must be in {majority}..={} (a majority of the panel), got {}",
                panel.panel_size, panel.quorum_threshold
            ));
        }
        let approval = panel.effective_approval_threshold();
        let quorum_majority = panel.quorum_threshold / 2 + 1;
        if approval < quorum_majority || approval > panel.quorum_threshold {
            errors.push(format!(
                "panel.approval_threshold must be in {quorum_majority}..={} (a majority of the quorum), got {approval}",
                panel.quorum_threshold
            ));
        }
        if panel.registration_cooldown_secs > MAX_PERIOD_SECS {
            errors.push(format!(
                "panel.registration_cooldown_secs must be at most {MAX_PERIOD_SECS}, got {}",
                panel.registration_cooldown_secs
            ));
        }

        let rep = &self.reputation;
        if rep.floor > rep.ceiling {
            errors.push(format!(
                "reputation.floor ({}) exceeds reputation.ceiling ({})",
                rep.floor, rep.ceiling
            ));
        } else if rep.initial < rep.floor || rep.initial > rep.ceiling {
            errors.push(format!(
                "reputation.initial ({}) must lie within {}..={}",
                rep.initial, rep.floor, rep.ceiling
            ));
        }

        if self.voting.window_secs == 0 || self.voting.window_secs > MAX_PERIOD_SECS {
            errors.push(format!(
                "voting.window_secs must be in 1..={MAX_PERIOD_SECS}, got {}",
                self.voting.window_secs
            ));
        }
        if self.voting.vote_cooldown_secs > MAX_PERIOD_SECS {
            errors.push(format!(
                "voting.vote_cooldown_secs must be at most {MAX_PERIOD_SECS}, got {}",
                self.voting.vote_cooldown_secs
            ));
        }
        if self.voting.sweep_interval_secs == 0 {
            errors.push("voting.sweep_interval_secs must be positive".to_string());
        }
        if self.settlement.max_attempts == 0 {
            errors.push("settlement.max_attempts must be at least 1".to_string());
        }
        if self.settlement.call_timeout_ms == 0 {
            errors.push("settlement.call_timeout_ms must be positive".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Invalid { errors })
        }
    }
}
