//! # Expiry Sweeper
//!
//! Background task that force-resolves overdue disputes on a fixed
//! interval. Expiry is idempotent, so the sweeper and the manual
//! `POST /v1/disputes/expire` endpoint never double-resolve a dispute.

use std::sync::Arc;
use std::time::Duration;

use jury_engine::JuryService;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Spawn the sweeper on the current runtime.
///
/// Runs until the returned handle is aborted or the runtime shuts down.
pub fn spawn(service: Arc<JuryService>, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let expired = service.expire_overdue().await;
            for report in &expired {
                tracing::info!(
                    dispute_id = report.dispute_id.value(),
                    outcome = %report.outcome,
                    total_votes = report.total_votes,
                    settled = report.settlement.is_settled(),
                    "sweeper expired dispute"
                );
            }
        }
    })
}
