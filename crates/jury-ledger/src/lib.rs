//! # jury-ledger: Policy Ledger Boundary
//!
//! The dispute service never owns insurance policies. It asks an external
//! policy ledger who owns a policy, whether it is already settled, and
//! finally instructs it to pay out or deny. This crate defines that
//! boundary and its implementations:
//!
//! - [`PolicyLedger`]: synchronous, object-safe trait (`Send + Sync`).
//! - [`InMemoryPolicyLedger`]: process-local ledger for tests, the CLI
//!   simulator and the development stub server.
//! - [`HttpPolicyLedger`]: `reqwest` client for the ledger HTTP contract.
//! - [`call_with_timeout`]: runs a ledger call on the blocking pool under a
//!   deadline. Async callers must go through it, because the HTTP client
//!   drives its own requests with `Handle::block_on`.
//!
//! Retries are NOT built into the implementations. The settlement
//! dispatcher in `jury-engine` owns retry policy.

pub mod call;
pub mod config;
pub mod error;
pub mod http;
pub mod ledger;
pub mod memory;

pub use call::call_with_timeout;
pub use config::{LedgerConfig, LedgerConfigError};
pub use error::LedgerError;
pub use http::HttpPolicyLedger;
pub use ledger::{PolicyLedger, PolicyRecord, SettleRequest, SettleResponse};
pub use memory::InMemoryPolicyLedger;
