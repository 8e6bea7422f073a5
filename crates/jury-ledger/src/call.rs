//! Bounded ledger calls from async code.

use std::sync::Arc;
use std::time::Duration;

use crate::error::LedgerError;
use crate::ledger::PolicyLedger;

/// Run `f` against the ledger on the blocking pool, giving up after
/// `timeout`.
///
/// On timeout the blocking task is detached, not cancelled. Settle calls
/// carry an idempotency key, so a late completion is harmless.
pub async fn call_with_timeout<T, F>(
    ledger: Arc<dyn PolicyLedger>,
    timeout: Duration,
    f: F,
) -> Result<T, LedgerError>
where
    T: Send + 'static,
    F: FnOnce(&dyn PolicyLedger) -> Result<T, LedgerError> + Send + 'static,
{
    let task = tokio::task::spawn_blocking(move || f(ledger.as_ref()));
    match tokio::time::timeout(timeout, task).await {
        Ok(Ok(result)) => result,
        Ok(Err(join)) => Err(LedgerError::Unavailable {
            reason: format!("ledger call aborted: {join}"),
        }),
        Err(_) => Err(LedgerError::Timeout {
            elapsed_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
        }),
    }
}
