//! Errors reported by a policy ledger.

use jury_core::{JuryError, PolicyId};
use thiserror::Error;

/// Failure of a single policy-ledger call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// The ledger has no such policy.
    #[error("{0} not found")]
    PolicyNotFound(PolicyId),

    /// The policy was settled by an earlier, different request.
    #[error("{0} is already settled")]
    AlreadySettled(PolicyId),

    /// The ledger could not be reached or answered with a server error.
    #[error("policy ledger unavailable: {reason}")]
    Unavailable {
        /// Transport or server diagnostic.
        reason: String,
    },

    /// The call did not complete within its deadline.
    #[error("policy ledger call timed out after {elapsed_ms}ms")]
    Timeout {
        /// Deadline that elapsed.
        elapsed_ms: u64,
    },

    /// The ledger refused the request for a reason retrying cannot fix.
    #[error("policy ledger rejected request (HTTP {status}): {reason}")]
    Rejected {
        /// HTTP status returned.
        status: u16,
        /// Response excerpt.
        reason: String,
    },
}

impl LedgerError {
    /// Whether the same call may succeed if repeated.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Unavailable { .. } | Self::Timeout { .. })
    }
}

impl From<LedgerError> for JuryError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::PolicyNotFound(id) => JuryError::PolicyNotFound(id),
            LedgerError::AlreadySettled(id) => JuryError::PolicyAlreadySettled(id),
            other => JuryError::LedgerUnavailable(other.to_string()),
        }
    }
}
