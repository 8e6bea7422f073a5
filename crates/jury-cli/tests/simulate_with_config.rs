//! Drives the simulate subcommand with configuration files on disk.

use jury_cli::config::default_config;
use jury_cli::simulate::{simulate, SimulateArgs};

fn write_config(contents: &str) -> (tempfile::TempDir, std::path::PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("jury.yaml");
    std::fs::write(&path, contents).unwrap();
    (dir, path)
}

#[tokio::test]
async fn smaller_panel_from_config_file() {
    let (_dir, path) = write_config(
        "panel:\n  panel_size: 5\n  quorum_threshold: 3\nreputation:\n  reward: 4\n",
    );
    let report = simulate(&SimulateArgs {
        jurors: 8,
        yes_rate: 1.0,
        config: Some(path),
        ..SimulateArgs::default()
    })
    .await
    .unwrap();

    assert_eq!(report.panel.len(), 5);
    assert_eq!(report.yes_votes, 3);
    assert_eq!(report.outcome, "approved");
    assert!(report
        .reputation_changes
        .iter()
        .all(|c| c.after == c.before + 4));
}

#[tokio::test]
async fn default_config_file_matches_builtin_defaults() {
    let (_dir, path) = write_config(&default_config().unwrap());
    let from_file = simulate(&SimulateArgs {
        seed: 9,
        config: Some(path),
        ..SimulateArgs::default()
    })
    .await
    .unwrap();
    let builtin = simulate(&SimulateArgs {
        seed: 9,
        ..SimulateArgs::default()
    })
    .await
    .unwrap();
    assert_eq!(from_file, builtin);
}

#[tokio::test]
async fn invalid_config_file_is_reported() {
    let (_dir, path) = write_config("panel:\n  panel_size: 10\n  quorum_threshold: 2\n");
    let err = simulate(&SimulateArgs {
        config: Some(path),
        ..SimulateArgs::default()
    })
    .await
    .unwrap_err();
    assert!(format!("{err:#}").contains("rejected"));
}

#[tokio::test]
async fn json_report_has_expected_fields() {
    let report = simulate(&SimulateArgs::default()).await.unwrap();
    let value = serde_json::to_value(&report).unwrap();
    for field in [
        "dispute_id",
        "selection_seed",
        "panel",
        "ballots",
        "yes_votes",
        "no_votes",
        "outcome",
        "resolution_reason",
        "payout_amount",
        "reputation_changes",
    ] {
        assert!(value.get(field).is_some(), "missing {field}");
    }
    assert_eq!(report.dispute_id, 1);
}
