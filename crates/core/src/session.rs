//! Session domain type with sliding expiration.
//!
//! A session is eligible for use only while its active flag is set AND the
//! current time is before its expiration timestamp. Every successful touch
//! pushes the expiration forward by a fixed window; expired sessions are
//! swept by a periodic cleanup and never reactivated.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A support conversation session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// Opaque, globally unique identifier
    pub id: String,

    /// When the session was created
    pub created_at: DateTime<Utc>,

    /// When the session row was last mutated
    pub updated_at: DateTime<Utc>,

    /// Sliding expiration deadline
    pub expires_at: DateTime<Utc>,

    /// Whether the session is still active (deactivation is terminal)
    pub is_active: bool,

    /// Number of messages appended so far
    pub message_count: i64,

    /// Last successful read/write activity
    pub last_activity: DateTime<Utc>,
}

impl Session {
    /// Create a fresh session expiring one `window` from now.
    pub fn new(window: Duration) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            created_at: now,
            updated_at: now,
            expires_at: now + window,
            is_active: true,
            message_count: 0,
            last_activity: now,
        }
    }

    /// Whether the session may be used at the given instant.
    pub fn is_usable(&self, now: DateTime<Utc>) -> bool {
        self.is_active && now < self.expires_at
    }
}
