//! Stub state: a shared in-memory policy ledger.
//!
//! Cheaply cloneable; all clones share the same policies.

use jury_ledger::InMemoryPolicyLedger;

#[derive(Clone, Default)]
pub struct AppState {
    ledger: InMemoryPolicyLedger,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ledger(&self) -> &InMemoryPolicyLedger {
        &self.ledger
    }
}
