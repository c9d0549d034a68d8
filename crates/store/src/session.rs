//! Session and message persistence with sliding expiration.
//!
//! Uses two tables:
//! - `sessions` — one row per conversation, with a sliding `expires_at`
//! - `messages` — conversation turns, cascade-deleted with their session
//!
//! Every successful resolve pushes `expires_at` forward by the configured
//! window. Expired sessions are removed by [`SessionStore::sweep_expired`],
//! which a periodic task calls on an interval; until swept they are still
//! refused by resolution (a new session is created instead).

use chrono::{Duration, Utc};
use crabdesk_core::error::Error;
use crabdesk_core::message::{ChatMessage, Role};
use crabdesk_core::session::Session;
use serde::Serialize;
use sqlx::{Row, SqlitePool};
use tracing::{debug, info};
use uuid::Uuid;

use crate::{fmt_ts, parse_ts};

/// Aggregate session statistics for the stats endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct SessionStats {
    pub active_count: i64,
    pub total_messages: i64,
    pub expiring_within_one_hour: i64,
    pub avg_messages_per_active_session: f64,
}

/// SQLite-backed session lifecycle manager.
pub struct SessionStore {
    pool: SqlitePool,
    window: Duration,
}

impl SessionStore {
    /// Create the store on an existing pool, running migrations.
    ///
    /// `window` is the sliding expiration window applied on every resolve.
    pub async fn new(pool: SqlitePool, window: Duration) -> Result<Self, Error> {
        let store = Self { pool, window };
        store.run_migrations().await?;
        Ok(store)
    }

    async fn run_migrations(&self) -> Result<(), Error> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS sessions (
                id             TEXT PRIMARY KEY,
                created_at     TEXT NOT NULL,
                updated_at     TEXT NOT NULL,
                expires_at     TEXT NOT NULL,
                is_active      INTEGER NOT NULL DEFAULT 1,
                message_count  INTEGER NOT NULL DEFAULT 0,
                last_activity  TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| storage_err("migrate", format!("sessions table: {e}")))?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS messages (
                id          TEXT PRIMARY KEY,
                session_id  TEXT NOT NULL REFERENCES sessions(id) ON DELETE CASCADE,
                role        TEXT NOT NULL,
                content     TEXT NOT NULL,
                created_at  TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| storage_err("migrate", format!("messages table: {e}")))?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_messages_session ON messages(session_id, created_at)",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| storage_err("migrate", format!("messages index: {e}")))?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_sessions_expires ON sessions(expires_at)")
            .execute(&self.pool)
            .await
            .map_err(|e| storage_err("migrate", format!("sessions index: {e}")))?;

        debug!("Session store migrations complete");
        Ok(())
    }

    /// Fetch a session row by id, if present.
    pub async fn get_session(&self, session_id: &str) -> Result<Option<Session>, Error> {
        let row = sqlx::query("SELECT * FROM sessions WHERE id = ?1")
            .bind(session_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| storage_err("get_session", format!("SELECT for '{session_id}': {e}")))?;

        row.map(|r| row_to_session(&r)).transpose()
    }

    /// Resolve a session for a request.
    ///
    /// A usable requested session is returned with its expiration pushed
    /// forward by one window. A missing, expired, or deactivated requested
    /// session is silently replaced by a fresh one with a new id. This
    /// operation never fails for client-supplied reasons.
    pub async fn resolve_or_create(&self, requested: Option<&str>) -> Result<Session, Error> {
        let now = Utc::now();

        if let Some(id) = requested {
            if let Some(mut session) = self.get_session(id).await? {
                if session.is_usable(now) {
                    session.expires_at = now + self.window;
                    session.last_activity = now;
                    session.updated_at = now;

                    sqlx::query(
                        "UPDATE sessions SET expires_at = ?1, last_activity = ?2, updated_at = ?2 WHERE id = ?3",
                    )
                    .bind(fmt_ts(session.expires_at))
                    .bind(fmt_ts(now))
                    .bind(id)
                    .execute(&self.pool)
                    .await
                    .map_err(|e| storage_err("resolve", format!("UPDATE for '{id}': {e}")))?;

                    debug!(session_id = %id, "Extended existing session");
                    return Ok(session);
                }
                debug!(session_id = %id, "Requested session expired or inactive, creating new");
            }
        }

        let session = Session::new(self.window);
        sqlx::query(
            r#"
            INSERT INTO sessions (id, created_at, updated_at, expires_at, is_active, message_count, last_activity)
            VALUES (?1, ?2, ?2, ?3, 1, 0, ?2)
            "#,
        )
        .bind(&session.id)
        .bind(fmt_ts(session.created_at))
        .bind(fmt_ts(session.expires_at))
        .execute(&self.pool)
        .await
        .map_err(|e| storage_err("resolve", format!("INSERT failed: {e}")))?;

        info!(session_id = %session.id, "Created session");
        Ok(session)
    }

    /// Append one message to a session.
    ///
    /// Fails with a `Session` error when the session is missing or has been
    /// deactivated; on failure nothing is written. On success the session's
    /// message count and last activity are updated atomically with the
    /// message insert.
    pub async fn append_message(
        &self,
        session_id: &str,
        role: Role,
        content: &str,
    ) -> Result<ChatMessage, Error> {
        let session = self.require_active(session_id).await?;

        let message = ChatMessage::new(&session.id, role, content);
        let now = Utc::now();

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| storage_err("append_message", format!("BEGIN failed: {e}")))?;

        sqlx::query(
            "INSERT INTO messages (id, session_id, role, content, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .bind(&message.id)
        .bind(&message.session_id)
        .bind(message.role.as_str())
        .bind(&message.content)
        .bind(fmt_ts(message.created_at))
        .execute(&mut *tx)
        .await
        .map_err(|e| storage_err("append_message", format!("message INSERT failed: {e}")))?;

        sqlx::query(
            r#"
            UPDATE sessions
            SET message_count = message_count + 1, last_activity = ?1, updated_at = ?1
            WHERE id = ?2
            "#,
        )
        .bind(fmt_ts(now))
        .bind(session_id)
        .execute(&mut *tx)
        .await
        .map_err(|e| storage_err("append_message", format!("session UPDATE failed: {e}")))?;

        tx.commit()
            .await
            .map_err(|e| storage_err("append_message", format!("COMMIT failed: {e}")))?;

        Ok(message)
    }

    /// List a session's messages in chronological order.
    ///
    /// Fails with a `Session` error when the session is missing or inactive.
    pub async fn list_messages(&self, session_id: &str) -> Result<Vec<ChatMessage>, Error> {
        self.require_active(session_id).await?;

        let rows = sqlx::query(
            "SELECT * FROM messages WHERE session_id = ?1 ORDER BY created_at ASC, rowid ASC",
        )
        .bind(session_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| storage_err("list_messages", format!("SELECT for '{session_id}': {e}")))?;

        rows.iter().map(row_to_message).collect()
    }

    /// Deactivate a session. Terminal; the session is never reactivated.
    ///
    /// Returns whether an active session was actually deactivated, so a
    /// repeat call reports `false`.
    pub async fn deactivate(&self, session_id: &str) -> Result<bool, Error> {
        let result = sqlx::query(
            "UPDATE sessions SET is_active = 0, updated_at = ?1 WHERE id = ?2 AND is_active = 1",
        )
        .bind(fmt_ts(Utc::now()))
        .bind(session_id)
        .execute(&self.pool)
        .await
        .map_err(|e| storage_err("deactivate", format!("UPDATE for '{session_id}': {e}")))?;

        let deactivated = result.rows_affected() > 0;
        if deactivated {
            info!(session_id = %session_id, "Deactivated session");
        }
        Ok(deactivated)
    }

    /// Delete every session whose expiration has passed, and its messages.
    ///
    /// Messages go first so the count reflects whole sessions removed.
    /// Returns the number of sessions deleted.
    pub async fn sweep_expired(&self) -> Result<u64, Error> {
        let now = fmt_ts(Utc::now());

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| storage_err("sweep", format!("BEGIN failed: {e}")))?;

        sqlx::query(
            "DELETE FROM messages WHERE session_id IN (SELECT id FROM sessions WHERE expires_at <= ?1)",
        )
        .bind(&now)
        .execute(&mut *tx)
        .await
        .map_err(|e| storage_err("sweep", format!("message DELETE failed: {e}")))?;

        let result = sqlx::query("DELETE FROM sessions WHERE expires_at <= ?1")
            .bind(&now)
            .execute(&mut *tx)
            .await
            .map_err(|e| storage_err("sweep", format!("session DELETE failed: {e}")))?;

        tx.commit()
            .await
            .map_err(|e| storage_err("sweep", format!("COMMIT failed: {e}")))?;

        let swept = result.rows_affected();
        if swept > 0 {
            info!(swept, "Swept expired sessions");
        }
        Ok(swept)
    }

    /// Aggregate statistics over the current session table.
    pub async fn stats(&self) -> Result<SessionStats, Error> {
        let now = Utc::now();

        let (active_count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM sessions WHERE is_active = 1")
                .fetch_one(&self.pool)
                .await
                .map_err(|e| storage_err("stats", format!("active count: {e}")))?;

        let (total_messages,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM messages")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| storage_err("stats", format!("message count: {e}")))?;

        let (expiring_within_one_hour,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM sessions WHERE is_active = 1 AND expires_at < ?1",
        )
        .bind(fmt_ts(now + Duration::hours(1)))
        .fetch_one(&self.pool)
        .await
        .map_err(|e| storage_err("stats", format!("expiring count: {e}")))?;

        let avg_messages_per_active_session = if active_count > 0 {
            total_messages as f64 / active_count as f64
        } else {
            0.0
        };

        Ok(SessionStats {
            active_count,
            total_messages,
            expiring_within_one_hour,
            avg_messages_per_active_session,
        })
    }

    /// Fetch a session, failing if it is missing or deactivated.
    ///
    /// Expiry is deliberately not checked here: resolution already refuses
    /// expired sessions, and an in-flight request that resolved moments ago
    /// should not fail its writes at a window boundary.
    async fn require_active(&self, session_id: &str) -> Result<Session, Error> {
        let session = self
            .get_session(session_id)
            .await?
            .ok_or_else(|| Error::session(session_id, "session not found"))?;

        if !session.is_active {
            return Err(Error::session(session_id, "session is inactive"));
        }
        Ok(session)
    }
}

/// Infrastructure failures (connection, transaction, query, decoding) are
/// server faults, kept distinct from the client-correctable `Session` kind
/// that `require_active` produces.
fn storage_err(operation: &str, message: String) -> Error {
    Error::storage(operation, message)
}

fn row_to_session(row: &sqlx::sqlite::SqliteRow) -> Result<Session, Error> {
    let id: String = row
        .try_get("id")
        .map_err(|e| storage_err("decode_session", format!("id column: {e}")))?;

    let col = |name: &str| -> Result<String, Error> {
        row.try_get(name)
            .map_err(|e| storage_err("decode_session", format!("'{id}' {name} column: {e}")))
    };

    let created_at = parse_ts(&col("created_at")?);
    let updated_at = parse_ts(&col("updated_at")?);
    let expires_at = parse_ts(&col("expires_at")?);
    let last_activity = parse_ts(&col("last_activity")?);

    let is_active: i64 = row
        .try_get("is_active")
        .map_err(|e| storage_err("decode_session", format!("'{id}' is_active column: {e}")))?;
    let message_count: i64 = row
        .try_get("message_count")
        .map_err(|e| storage_err("decode_session", format!("'{id}' message_count column: {e}")))?;

    Ok(Session {
        id,
        created_at,
        updated_at,
        expires_at,
        is_active: is_active != 0,
        message_count,
        last_activity,
    })
}

fn row_to_message(row: &sqlx::sqlite::SqliteRow) -> Result<ChatMessage, Error> {
    let id: String = row
        .try_get("id")
        .map_err(|e| storage_err("decode_message", format!("id column: {e}")))?;
    let session_id: String = row
        .try_get("session_id")
        .map_err(|e| storage_err("decode_message", format!("'{id}' session_id column: {e}")))?;
    let role_str: String = row
        .try_get("role")
        .map_err(|e| storage_err("decode_message", format!("'{id}' role column: {e}")))?;
    let content: String = row
        .try_get("content")
        .map_err(|e| storage_err("decode_message", format!("'{id}' content column: {e}")))?;
    let created_at_str: String = row
        .try_get("created_at")
        .map_err(|e| storage_err("decode_message", format!("'{id}' created_at column: {e}")))?;

    let role = Role::parse(&role_str)
        .ok_or_else(|| storage_err("decode_message", format!("'{id}' unknown role '{role_str}'")))?;

    Ok(ChatMessage {
        id,
        session_id,
        role,
        content,
        created_at: parse_ts(&created_at_str),
    })
}
