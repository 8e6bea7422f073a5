//! Policy ledger stub server, for development.
//!
//! In-memory implementation of the ledger endpoints that
//! `jury_ledger::HttpPolicyLedger` calls. Point the API at it with
//! `POLICY_LEDGER_URL=http://localhost:8091`.
//!
//! Storage is in-memory with no persistence; data is lost on restart.

mod routes;
mod store;

use std::net::SocketAddr;

use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let port: u16 = std::env::var("LEDGER_STUB_PORT")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(8091);

    let state = store::AppState::new();
    let app = routes::router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("jury-ledger-stub listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app.into_make_service()).await?;
    Ok(())
}
