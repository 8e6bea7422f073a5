//! Policy ledger client configuration.
//!
//! When `POLICY_LEDGER_URL` is unset the service runs against an in-memory
//! ledger, so [`LedgerConfig::from_env`] returns `None`.

use std::time::Duration;

use url::Url;

/// Connection settings for [`crate::HttpPolicyLedger`].
///
/// Custom `Debug` implementation redacts the `api_token` field
/// to prevent credential leakage in log output.
#[derive(Clone)]
pub struct LedgerConfig {
    /// Base URL of the ledger API (paths are appended under `/v1/policies`).
    pub base_url: Url,
    /// Optional bearer token.
    pub api_token: Option<String>,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

impl std::fmt::Debug for LedgerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LedgerConfig")
            .field("base_url", &self.base_url)
            .field("api_token", &self.api_token.as_ref().map(|_| "[REDACTED]"))
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl LedgerConfig {
    /// Point at `base_url` with no token and a 10 second timeout.
    pub fn new(base_url: &str) -> Result<Self, LedgerConfigError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| LedgerConfigError::InvalidUrl(base_url.to_string(), e.to_string()))?;
        Ok(Self {
            base_url,
            api_token: None,
            timeout_secs: 10,
        })
    }

    /// Attach a bearer token.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.api_token = Some(token.into());
        self
    }

    /// Load configuration from environment variables.
    ///
    /// Variables:
    /// - `POLICY_LEDGER_URL` (unset: use the in-memory ledger)
    /// - `POLICY_LEDGER_TOKEN` (optional)
    /// - `POLICY_LEDGER_TIMEOUT_SECS` (default: 10)
    pub fn from_env() -> Result<Option<Self>, LedgerConfigError> {
        let Ok(raw) = std::env::var("POLICY_LEDGER_URL") else {
            return Ok(None);
        };
        let mut config = Self::new(&raw)?;
        config.api_token = std::env::var("POLICY_LEDGER_TOKEN")
            .ok()
            .filter(|t| !t.is_empty());
        config.timeout_secs = std::env::var("POLICY_LEDGER_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(10);
        Ok(Some(config))
    }

    /// The request timeout.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum LedgerConfigError {
    #[error("invalid policy ledger URL {0}: {1}")]
    InvalidUrl(String, String),
}
