//! # Identifier Newtypes
//!
//! Jurors and claimants are identified by account addresses; disputes and
//! policies by monotonic integers. Keeping each namespace in its own type
//! prevents a policy id from being used as a dispute id.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::JuryError;

/// Maximum accepted length of an account address.
pub const MAX_ADDRESS_LEN: usize = 128;

/// Account address of a juror or claimant.
///
/// Addresses are opaque to the service. Construction only checks that the
/// value is non-empty, at most [`MAX_ADDRESS_LEN`] bytes, and made of ASCII
/// alphanumerics or `-`, `_`, `:`, `.`. Deserialization runs the same check.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct JurorAddress(String);

impl JurorAddress {
    /// Validate and wrap an address.
    ///
    /// # Errors
    ///
    /// Returns [`JuryError::InvalidAddress`] if the address is empty, too
    /// long, or contains characters outside the accepted set.
    pub fn new(address: impl Into<String>) -> Result<Self, JuryError> {
        let address = address.into();
        if address.is_empty() {
            return Err(JuryError::InvalidAddress(
                "address must not be empty".to_string(),
            ));
        }
        if address.len() > MAX_ADDRESS_LEN {
            return Err(JuryError::InvalidAddress(format!(
                "address exceeds {MAX_ADDRESS_LEN} bytes"
            )));
        }
        if let Some(c) = address
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | ':' | '.')))
        {
            return Err(JuryError::InvalidAddress(format!(
                "unexpected character {c:?} in {address:?}"
            )));
        }
        Ok(Self(address))
    }

    /// The address as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for JurorAddress {
    type Error = JuryError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<JurorAddress> for String {
    fn from(address: JurorAddress) -> Self {
        address.0
    }
}

impl fmt::Display for JurorAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of a dispute. Allocated monotonically starting at 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DisputeId(u64);

impl DisputeId {
    /// Wrap a raw dispute number.
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    /// The raw dispute number.
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for DisputeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "dispute:{}", self.0)
    }
}

/// Identifier of an insurance policy on the external policy ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PolicyId(u64);

impl PolicyId {
    /// Wrap a raw policy number.
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    /// The raw policy number.
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for PolicyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "policy:{}", self.0)
    }
}
