//! # jury-core: Foundational Types for the Juror Dispute Service
//!
//! Every other crate in the workspace depends on `jury-core`; it depends on
//! nothing internal.
//!
//! ## Key Design Principles
//!
//! 1. **Newtype wrappers for identifiers.** `JurorAddress`, `DisputeId` and
//!    `PolicyId` are distinct types. A policy id cannot be passed where a
//!    dispute id is expected, and juror addresses are validated on
//!    construction and on deserialization.
//!
//! 2. **Injected time.** Deadlines and timestamps flow through the [`Clock`]
//!    trait so that expiry behavior is testable without sleeping.
//!
//! 3. **One error taxonomy.** [`JuryError`] enumerates every failure a caller
//!    of the dispute service can observe, each with a stable machine code.
//!
//! 4. **Configuration, not literals.** Panel size, quorum, reputation deltas
//!    and retry policy live in [`JuryConfig`], validated at load time.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `jury-*` crates (this is the leaf of the DAG).
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod config;
pub mod error;
pub mod identity;
pub mod temporal;

pub use config::{
    ExpiryPolicy, JuryConfig, PanelConfig, ReputationConfig, SettlementConfig, VotingConfig,
    MAX_PERIOD_SECS,
};
pub use error::{ConfigError, JuryError};
pub use identity::{DisputeId, JurorAddress, PolicyId, MAX_ADDRESS_LEN};
pub use temporal::{Clock, ManualClock, SystemClock};
