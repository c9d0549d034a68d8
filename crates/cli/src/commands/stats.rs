//! `crabdesk stats` — Show session statistics.

use chrono::Duration;
use crabdesk_config::AppConfig;
use crabdesk_core::Error;
use crabdesk_store::SessionStore;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(Error::from)?;

    let pool = crabdesk_store::connect(&config.db_path).await?;
    let sessions = SessionStore::new(pool, Duration::hours(config.session.window_hours)).await?;
    let stats = sessions.stats().await?;

    println!("Sessions ({})", config.db_path);
    println!("  Active:               {}", stats.active_count);
    println!("  Total messages:       {}", stats.total_messages);
    println!("  Expiring within 1h:   {}", stats.expiring_within_one_hour);
    println!(
        "  Avg messages/session: {:.2}",
        stats.avg_messages_per_active_session
    );

    Ok(())
}
