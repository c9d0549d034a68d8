//! SQLite persistence for CrabDesk.
//!
//! Two stores share one connection pool:
//! - [`SqliteKnowledgeIndex`] — embedded FAQ entries with cosine ranking
//! - [`SessionStore`] — sessions and messages with sliding expiration
//!
//! Timestamps are stored as fixed-precision RFC 3339 strings so that string
//! comparison in SQL matches chronological order.

pub mod knowledge;
pub mod session;
pub mod vector;

pub use knowledge::SqliteKnowledgeIndex;
pub use session::{SessionStats, SessionStore};

use chrono::{DateTime, SecondsFormat, Utc};
use crabdesk_core::error::Error;
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use std::str::FromStr;
use tracing::info;

/// Open (creating if needed) the CrabDesk database at `path`.
///
/// Pass `"sqlite::memory:"` for an in-process ephemeral database (tests).
pub async fn connect(path: &str) -> Result<SqlitePool, Error> {
    let options = SqliteConnectOptions::from_str(path)
        .map_err(|e| Error::Config {
            message: format!("Invalid SQLite path '{path}': {e}"),
        })?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Normal)
        .pragma("foreign_keys", "ON");

    // An in-memory database exists per connection, so it must be pinned to
    // a single connection that the pool never retires.
    let pool_options = if path.contains(":memory:") {
        SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
    } else {
        SqlitePoolOptions::new().max_connections(4)
    };

    let pool = pool_options
        .connect_with(options)
        .await
        .map_err(|e| Error::Config {
            message: format!("Failed to open SQLite at '{path}': {e}"),
        })?;

    info!("SQLite database opened at {path}");
    Ok(pool)
}

/// Format a timestamp for storage. Fixed microsecond precision keeps
/// lexicographic ordering identical to chronological ordering.
pub(crate) fn fmt_ts(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Parse a stored timestamp, falling back to now on corruption.
pub(crate) fn parse_ts(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}
