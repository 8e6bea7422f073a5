//! In-memory policy ledger.
//!
//! Backs the CLI simulator, the development stub server and the test
//! suites. Settle failures can be queued with
//! [`InMemoryPolicyLedger::inject_settle_failures`] to exercise retry paths.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use jury_core::{JurorAddress, PolicyId};
use parking_lot::{Mutex, RwLock};

use crate::error::LedgerError;
use crate::ledger::{PolicyLedger, PolicyRecord};

#[derive(Debug)]
struct Entry {
    record: PolicyRecord,
    settled_by: Option<String>,
}

#[derive(Debug, Default)]
struct Inner {
    policies: RwLock<HashMap<PolicyId, Entry>>,
    injected: Mutex<VecDeque<LedgerError>>,
    next_id: AtomicU64,
    settle_calls: AtomicU64,
}

/// Process-local [`PolicyLedger`]. Cloning shares state.
#[derive(Debug, Clone, Default)]
pub struct InMemoryPolicyLedger {
    inner: Arc<Inner>,
}

impl InMemoryPolicyLedger {
    /// An empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an unsettled policy with the next free id.
    pub fn create_policy(&self, owner: JurorAddress, coverage_cap: u64) -> PolicyRecord {
        let mut policies = self.inner.policies.write();
        let mut id = self.inner.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        while policies.contains_key(&PolicyId::new(id)) {
            id = self.inner.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        }
        let record = PolicyRecord {
            policy_id: PolicyId::new(id),
            owner,
            coverage_cap,
            settled: false,
            payout_amount: None,
        };
        policies.insert(
            record.policy_id,
            Entry {
                record: record.clone(),
                settled_by: None,
            },
        );
        record
    }

    /// Insert or replace a policy with an explicit id.
    pub fn insert_policy(&self, record: PolicyRecord) {
        self.inner.policies.write().insert(
            record.policy_id,
            Entry {
                record,
                settled_by: None,
            },
        );
    }

    /// All policies ordered by id.
    pub fn policies(&self) -> Vec<PolicyRecord> {
        let mut all: Vec<_> = self
            .inner
            .policies
            .read()
            .values()
            .map(|e| e.record.clone())
            .collect();
        all.sort_by_key(|p| p.policy_id);
        all
    }

    /// Make the next `errors.len()` settle calls fail, in order.
    pub fn inject_settle_failures(&self, errors: impl IntoIterator<Item = LedgerError>) {
        self.inner.injected.lock().extend(errors);
    }

    /// Number of settle calls received, including failed ones.
    pub fn settle_calls(&self) -> u64 {
        self.inner.settle_calls.load(Ordering::SeqCst)
    }
}

impl PolicyLedger for InMemoryPolicyLedger {
    fn policy(&self, policy_id: PolicyId) -> Result<PolicyRecord, LedgerError> {
        self.inner
            .policies
            .read()
            .get(&policy_id)
            .map(|e| e.record.clone())
            .ok_or(LedgerError::PolicyNotFound(policy_id))
    }

    fn settle(
        &self,
        policy_id: PolicyId,
        approved: bool,
        idempotency_key: &str,
    ) -> Result<u64, LedgerError> {
        self.inner.settle_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.inner.injected.lock().pop_front() {
            return Err(err);
        }

        let mut policies = self.inner.policies.write();
        let entry = policies
            .get_mut(&policy_id)
            .ok_or(LedgerError::PolicyNotFound(policy_id))?;

        if entry.record.settled {
            return match (&entry.settled_by, entry.record.payout_amount) {
                (Some(key), Some(payout)) if key == idempotency_key => Ok(payout),
                _ => Err(LedgerError::AlreadySettled(policy_id)),
            };
        }

        let payout = if approved { entry.record.coverage_cap } else { 0 };
        entry.record.settled = true;
        entry.record.payout_amount = Some(payout);
        entry.settled_by = Some(idempotency_key.to_string());
        tracing::debug!(%policy_id, approved, payout, "policy settled");
        Ok(payout)
    }
}
