//! # Event Log and Statistics
//!
//! Append-only, bounded log of lifecycle events. Operators read it through
//! `GET /v1/events`; the oldest entries are dropped once the log reaches
//! capacity. Event ids keep increasing across evictions.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use jury_core::{DisputeId, JurorAddress};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::dispute::{Outcome, VoteChoice};

/// Default number of events retained.
pub const DEFAULT_EVENT_CAPACITY: usize = 10_000;

/// What happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    JurorRegistered,
    JurorDeactivated,
    JurorReactivated,
    DisputeCreated,
    VoteCast,
    DisputeResolved,
    SettlementCompleted,
    SettlementFailed,
    DisputeProcessed,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::JurorRegistered => "juror_registered",
            Self::JurorDeactivated => "juror_deactivated",
            Self::JurorReactivated => "juror_reactivated",
            Self::DisputeCreated => "dispute_created",
            Self::VoteCast => "vote_cast",
            Self::DisputeResolved => "dispute_resolved",
            Self::SettlementCompleted => "settlement_completed",
            Self::SettlementFailed => "settlement_failed",
            Self::DisputeProcessed => "dispute_processed",
        }
    }
}

/// One entry of the event log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisputeEvent {
    /// Monotonic event number, starting at 1.
    pub id: u64,
    pub kind: EventKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dispute_id: Option<DisputeId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub juror: Option<JurorAddress>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub choice: Option<VoteChoice>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outcome: Option<Outcome>,
    /// Free-form context, e.g. the last settlement error.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    pub at: DateTime<Utc>,
}

/// An event before it is numbered and stamped.
#[derive(Debug, Clone)]
pub struct EventDraft {
    kind: EventKind,
    dispute_id: Option<DisputeId>,
    juror: Option<JurorAddress>,
    choice: Option<VoteChoice>,
    outcome: Option<Outcome>,
    detail: Option<String>,
}

impl EventDraft {
    pub fn new(kind: EventKind) -> Self {
        Self {
            kind,
            dispute_id: None,
            juror: None,
            choice: None,
            outcome: None,
            detail: None,
        }
    }

    pub fn dispute(mut self, id: DisputeId) -> Self {
        self.dispute_id = Some(id);
        self
    }

    pub fn juror(mut self, juror: &JurorAddress) -> Self {
        self.juror = Some(juror.clone());
        self
    }

    pub fn choice(mut self, choice: VoteChoice) -> Self {
        self.choice = Some(choice);
        self
    }

    pub fn outcome(mut self, outcome: Outcome) -> Self {
        self.outcome = Some(outcome);
        self
    }

    pub fn detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

#[derive(Debug)]
struct Inner {
    events: RwLock<VecDeque<DisputeEvent>>,
    next_id: AtomicU64,
    capacity: usize,
}

/// Shared, bounded event log. Cloning shares the log.
#[derive(Debug, Clone)]
pub struct EventLog {
    inner: Arc<Inner>,
}

impl Default for EventLog {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_EVENT_CAPACITY)
    }
}

impl EventLog {
    /// A log retaining at most `capacity` events (minimum 1).
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            inner: Arc::new(Inner {
                events: RwLock::new(VecDeque::new()),
                next_id: AtomicU64::new(1),
                capacity: capacity.max(1),
            }),
        }
    }

    /// Number and append an event.
    pub fn record(&self, draft: EventDraft, at: DateTime<Utc>) -> DisputeEvent {
        let mut events = self.inner.events.write();
        // Numbered under the write lock so ids follow log order.
        let event = DisputeEvent {
            id: self.inner.next_id.fetch_add(1, Ordering::SeqCst),
            kind: draft.kind,
            dispute_id: draft.dispute_id,
            juror: draft.juror,
            choice: draft.choice,
            outcome: draft.outcome,
            detail: draft.detail,
            at,
        };
        if events.len() == self.inner.capacity {
            events.pop_front();
        }
        events.push_back(event.clone());
        event
    }

    /// The `limit` most recent events, oldest first.
    pub fn recent(&self, limit: usize) -> Vec<DisputeEvent> {
        let events = self.inner.events.read();
        let skip = events.len().saturating_sub(limit);
        events.iter().skip(skip).cloned().collect()
    }

    /// Every retained event concerning `dispute_id`, oldest first.
    pub fn for_dispute(&self, dispute_id: DisputeId) -> Vec<DisputeEvent> {
        self.inner
            .events
            .read()
            .iter()
            .filter(|e| e.dispute_id == Some(dispute_id))
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.inner.events.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Aggregate counters across the service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisputeStats {
    pub total_disputes: usize,
    pub active_disputes: usize,
    pub approved_disputes: usize,
    pub rejected_disputes: usize,
    pub total_votes_cast: usize,
    pub registered_jurors: usize,
    pub active_jurors: usize,
    pub settlements_completed: usize,
    pub settlements_failed: usize,
}
