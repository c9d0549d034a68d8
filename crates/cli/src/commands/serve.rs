//! `crabdesk serve` — Start the HTTP API server.

use crabdesk_config::AppConfig;
use crabdesk_core::Error;
use crabdesk_store::SessionStore;
use std::sync::Arc;
use tracing::{info, warn};

pub async fn run(port_override: Option<u16>) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = AppConfig::load().map_err(Error::from)?;

    if let Some(port) = port_override {
        config.gateway.port = port;
    }

    let state = crabdesk_gateway::build_state(config).await?;

    spawn_sweeper(
        state.sessions.clone(),
        state.config.session.sweep_interval_secs,
    );

    println!("🦀 CrabDesk");
    println!(
        "   Listening: {}:{}",
        state.config.gateway.host, state.config.gateway.port
    );
    println!("   Database:  {}", state.config.db_path);

    crabdesk_gateway::serve(state).await?;

    Ok(())
}

/// Run the periodic expired-session sweep for the lifetime of the process.
///
/// A failed sweep is logged and retried at the next tick.
fn spawn_sweeper(sessions: Arc<SessionStore>, interval_secs: u64) {
    tokio::spawn(async move {
        let mut ticker =
            tokio::time::interval(std::time::Duration::from_secs(interval_secs.max(1)));
        // The first tick completes immediately; skip it so startup isn't
        // serialized behind a sweep.
        ticker.tick().await;

        loop {
            ticker.tick().await;
            match sessions.sweep_expired().await {
                Ok(0) => {}
                Ok(swept) => info!(swept, "Expired sessions swept"),
                Err(e) => warn!(error = %e, "Session sweep failed"),
            }
        }
    });
}
