//! # jury-engine: Dispute Resolution Engine
//!
//! Decides disputed crop-insurance claims by a randomly drawn, reputation
//! weighted panel of jurors, then settles the outcome on the policy ledger.
//!
//! ## Components (leaf-first)
//!
//! - [`registry`]: juror records, reputation and eligibility.
//! - [`selector`]: weighted panel draw with a recorded, replayable seed.
//! - [`dispute`]: the dispute state machine and ballot box.
//! - [`disputes`]: dispute storage and the one-open-dispute-per-policy index.
//! - [`settlement`]: exactly-once settlement dispatch with bounded retry.
//! - [`voting`]: ballot validation, quorum detection, finalization, expiry.
//! - [`events`]: bounded lifecycle event log and aggregate statistics.
//! - [`service`]: the [`JuryService`] facade wiring all of the above.
//!
//! ## Concurrency
//!
//! Disputes are `Arc<parking_lot::Mutex<Dispute>>` entries in a `DashMap`;
//! jurors and settlement records are `DashMap` entries. Lock order is always
//! dispute, then juror. No lock is held across `.await`. Policy-ledger calls
//! run on the blocking pool under a timeout.

pub mod dispute;
pub mod disputes;
pub mod events;
pub mod registry;
pub mod selector;
pub mod service;
pub mod settlement;
pub mod voting;

pub use dispute::{
    Dispute, DisputeStatus, Outcome, Resolution, ResolutionReason, Vote, VoteChoice,
};
pub use disputes::{DisputeLedger, MAX_REASON_CHARS};
pub use events::{DisputeEvent, DisputeStats, EventDraft, EventKind, EventLog};
pub use registry::{Eligibility, Juror, JurorRegistry};
pub use selector::{
    derive_seed, weighted_sample, FixedRandomness, JurorSelector, OsRandomness, PanelSelection,
    RandomnessSource,
};
pub use service::{JuryService, JuryServiceBuilder};
pub use settlement::{SettlementDispatcher, SettlementRecord, SettlementStatus};
pub use voting::{ExpiredDispute, VoteReceipt, VotingEngine};
