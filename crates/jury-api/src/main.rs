//! # jury-api binary
//!
//! Starts the Axum HTTP server and the expiry sweeper.
//!
//! Environment:
//! - `JURY_CONFIG`: YAML configuration path (defaults apply when unset).
//! - `PORT`: listen port, default 8080.
//! - `AUTH_TOKEN`: bearer token; authentication is disabled when unset.
//! - `MAX_BODY_BYTES`: request body limit, default 64 KiB.
//! - `POLICY_LEDGER_URL`, `POLICY_LEDGER_TOKEN`, `POLICY_LEDGER_TIMEOUT_SECS`:
//!   remote policy ledger. Without a URL an empty in-memory ledger is used.
//! - `LOG_FORMAT=json`: JSON log lines. `RUST_LOG` overrides the filter.

use std::sync::Arc;
use std::time::Duration;

use jury_api::state::{AppConfig, AppState};
use jury_core::JuryConfig;
use jury_engine::JuryService;
use jury_ledger::{HttpPolicyLedger, InMemoryPolicyLedger, LedgerConfig, PolicyLedger};

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);
    if json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

fn load_config() -> Result<JuryConfig, jury_core::ConfigError> {
    match std::env::var("JURY_CONFIG") {
        Ok(path) => {
            tracing::info!(%path, "loading jury configuration");
            JuryConfig::load(path)
        }
        Err(_) => {
            tracing::info!("JURY_CONFIG not set, using default configuration");
            Ok(JuryConfig::default())
        }
    }
}

fn build_ledger() -> Result<Arc<dyn PolicyLedger>, Box<dyn std::error::Error>> {
    match LedgerConfig::from_env()? {
        Some(config) => {
            tracing::info!(?config, "policy ledger client configured");
            Ok(Arc::new(HttpPolicyLedger::new(config)?))
        }
        None => {
            tracing::warn!(
                "POLICY_LEDGER_URL not set; using an empty in-memory policy ledger. \
                 Disputes cannot be opened until policies exist."
            );
            Ok(Arc::new(InMemoryPolicyLedger::new()))
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let app_config = AppConfig::from_env()?;
    if app_config.auth_token.is_none() {
        tracing::warn!("AUTH_TOKEN not set; the API is unauthenticated");
    }
    let port = app_config.port;

    let config = load_config().map_err(|e| {
        tracing::error!("configuration rejected: {e}");
        e
    })?;
    let sweep_interval = Duration::from_secs(config.voting.sweep_interval_secs.max(1));
    let ledger = build_ledger()?;
    let service = Arc::new(JuryService::builder(config, ledger).build()?);

    let sweeper = jury_api::sweeper::spawn(Arc::clone(&service), sweep_interval);
    let app = jury_api::app(AppState::with_config(service, app_config));

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("jury API listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    sweeper.abort();
    Ok(())
}
