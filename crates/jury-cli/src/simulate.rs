//! # Simulate Subcommand
//!
//! Runs a single dispute end to end against an in-memory policy ledger:
//! registers jurors, opens a dispute, has the panel vote, and reports the
//! tally, the outcome, the payout and every reputation change.
//!
//! The clock is pinned and both the panel draw and the ballots come from
//! `--seed`, so the same arguments always print the same report.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use chrono::{TimeZone, Utc};
use clap::Args;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;

use jury_core::{JurorAddress, JuryConfig, ManualClock};
use jury_engine::{FixedRandomness, JuryService, SettlementStatus, VoteChoice};
use jury_ledger::InMemoryPolicyLedger;

/// Address of the simulated policy holder.
pub const CLAIMANT: &str = "claimant";

/// Arguments for the `jury simulate` subcommand.
#[derive(Args, Debug, Clone)]
pub struct SimulateArgs {
    /// Number of registered jurors (the claimant is not counted).
    #[arg(long, default_value_t = 15)]
    pub jurors: usize,

    /// Probability that a panel member votes Yes, in 0..=1.
    #[arg(long, default_value_t = 0.7)]
    pub yes_rate: f64,

    /// Seed for the panel draw and the ballots.
    #[arg(long, default_value_t = 1)]
    pub seed: u64,

    /// Coverage cap of the disputed policy, in micro-units.
    #[arg(long, default_value_t = 1_000_000)]
    pub coverage: u64,

    /// YAML configuration; defaults apply when omitted.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Print the report as JSON.
    #[arg(long)]
    pub json: bool,
}

impl Default for SimulateArgs {
    fn default() -> Self {
        Self {
            jurors: 15,
            yes_rate: 0.7,
            seed: 1,
            coverage: 1_000_000,
            config: None,
            json: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Ballot {
    pub juror: String,
    pub choice: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReputationChange {
    pub juror: String,
    pub before: u64,
    pub after: u64,
}

/// Everything the simulation observed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimulationReport {
    pub dispute_id: u64,
    pub selection_seed: String,
    pub panel: Vec<String>,
    pub ballots: Vec<Ballot>,
    pub yes_votes: usize,
    pub no_votes: usize,
    pub outcome: String,
    pub resolution_reason: String,
    pub payout_amount: Option<u64>,
    pub reputation_changes: Vec<ReputationChange>,
}

/// Run the simulation and collect the report.
pub async fn simulate(args: &SimulateArgs) -> Result<SimulationReport> {
    if !(0.0..=1.0).contains(&args.yes_rate) {
        bail!("--yes-rate must be within 0..=1, got {}", args.yes_rate);
    }
    let config = match &args.config {
        Some(path) => JuryConfig::load(path)
            .with_context(|| format!("configuration {} rejected", path.display()))?,
        None => JuryConfig::default(),
    };

    let ledger = InMemoryPolicyLedger::new();
    let start = Utc
        .with_ymd_and_hms(2026, 1, 1, 0, 0, 0)
        .single()
        .context("invalid simulation start time")?;
    let clock = ManualClock::new(start);
    let service = JuryService::builder(config, Arc::new(ledger.clone()))
        .clock(Arc::new(clock))
        .randomness(Arc::new(FixedRandomness::from_seed(args.seed)))
        .build()?;

    let claimant = JurorAddress::new(CLAIMANT)?;
    for i in 1..=args.jurors {
        service.register_juror(JurorAddress::new(format!("juror-{i:03}"))?)?;
    }
    let before: BTreeMap<String, u64> = service
        .jurors()
        .into_iter()
        .map(|j| (j.address.to_string(), j.reputation))
        .collect();

    let policy = ledger.create_policy(claimant.clone(), args.coverage);
    let dispute = service
        .create_dispute(
            policy.policy_id,
            claimant,
            "simulated rejected claim".to_string(),
        )
        .await
        .context("could not open the dispute")?;
    tracing::info!(
        dispute_id = dispute.id.value(),
        panel_size = dispute.assigned_jurors.len(),
        "simulated dispute opened"
    );

    let mut rng = StdRng::seed_from_u64(args.seed);
    let mut ballots = Vec::new();
    let mut payout_amount = None;
    for juror in &dispute.assigned_jurors {
        let choice = if rng.gen_bool(args.yes_rate) {
            VoteChoice::Yes
        } else {
            VoteChoice::No
        };
        let receipt = service.vote(dispute.id, juror.clone(), choice).await?;
        ballots.push(Ballot {
            juror: juror.to_string(),
            choice: choice.as_str().to_string(),
        });
        if let Some(settlement) = receipt.settlement {
            if let SettlementStatus::Settled { payout_amount: p, .. } = settlement.status {
                payout_amount = Some(p);
            }
        }
        if receipt.status.is_terminal() {
            break;
        }
    }

    let resolved = service.dispute(dispute.id)?;
    let Some(resolution) = resolved.resolution.clone() else {
        bail!("{} did not resolve after every panel member voted", dispute.id);
    };

    let reputation_changes = service
        .jurors()
        .into_iter()
        .filter_map(|j| {
            let was = before.get(j.address.as_str()).copied()?;
            (was != j.reputation).then(|| ReputationChange {
                juror: j.address.to_string(),
                before: was,
                after: j.reputation,
            })
        })
        .collect();

    Ok(SimulationReport {
        dispute_id: resolved.id.value(),
        selection_seed: resolved.selection_seed.clone(),
        panel: resolved
            .assigned_jurors
            .iter()
            .map(ToString::to_string)
            .collect(),
        ballots,
        yes_votes: resolved.yes_votes,
        no_votes: resolved.no_votes,
        outcome: resolution.outcome.as_str().to_string(),
        resolution_reason: resolution.reason.as_str().to_string(),
        payout_amount,
        reputation_changes,
    })
}

/// Human-readable report.
pub fn render(report: &SimulationReport) -> String {
    let mut out = String::new();
    out.push_str(&format!("dispute {}\n", report.dispute_id));
    out.push_str(&format!("selection seed: {}\n", report.selection_seed));
    out.push_str(&format!("panel ({}):\n", report.panel.len()));
    for juror in &report.panel {
        out.push_str(&format!("  {juror}\n"));
    }
    out.push_str("ballots:\n");
    for ballot in &report.ballots {
        out.push_str(&format!("  {:<12} {}\n", ballot.juror, ballot.choice));
    }
    out.push_str(&format!(
        "tally: {} yes, {} no\n",
        report.yes_votes, report.no_votes
    ));
    out.push_str(&format!(
        "outcome: {} ({})\n",
        report.outcome, report.resolution_reason
    ));
    match report.payout_amount {
        Some(p) => out.push_str(&format!("payout: {p}\n")),
        None => out.push_str("payout: not settled\n"),
    }
    out.push_str("reputation changes:\n");
    for change in &report.reputation_changes {
        out.push_str(&format!(
            "  {:<12} {} -> {}\n",
            change.juror, change.before, change.after
        ));
    }
    out
}

/// Execute the simulate subcommand.
pub fn run_simulate(args: &SimulateArgs) -> Result<u8> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;
    let report = runtime.block_on(simulate(args))?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", render(&report));
    }
    Ok(0)
}
