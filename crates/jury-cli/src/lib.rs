//! # jury-cli: Command Line Tool for the Dispute Service
//!
//! ## Subcommands
//!
//! - `jury config check <path>`: load and validate a YAML configuration.
//! - `jury config default`: print the default configuration.
//! - `jury simulate`: run one dispute end to end, offline and deterministic.
//!
//! ```bash
//! jury config default > jury.yaml
//! jury config check jury.yaml
//! jury simulate --jurors 25 --yes-rate 0.6 --seed 7 --config jury.yaml
//! ```

pub mod config;
pub mod simulate;
