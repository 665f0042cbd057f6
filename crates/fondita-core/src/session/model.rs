//! Admin session model.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

/// An authenticated admin session.
///
/// Sessions live only in memory; a restart logs everyone out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    /// Opaque bearer token
    #[serde(skip)]
    pub token: String,
    pub username: String,
    pub created_at: DateTime<Utc>,
    /// Refreshed on every successful validation
    pub last_seen: DateTime<Utc>,
}

/// Expiry rules for sessions.
///
/// Expiry is sliding: each validated request pushes `last_seen` forward.
/// `max_lifetime` caps the total age regardless of activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionPolicy {
    pub idle_timeout: Duration,
    pub max_lifetime: Duration,
    pub sweep_interval: Duration,
}

impl Default for SessionPolicy {
    fn default() -> Self {
        Self {
            idle_timeout: Duration::minutes(30),
            max_lifetime: Duration::hours(12),
            sweep_interval: Duration::minutes(5),
        }
    }
}

impl Session {
    pub fn new(token: String, username: String, now: DateTime<Utc>) -> Self {
        Self {
            token,
            username,
            created_at: now,
            last_seen: now,
        }
    }

    /// Whether the session is expired at `now` under `policy`.
    pub fn is_expired(&self, now: DateTime<Utc>, policy: &SessionPolicy) -> bool {
        now - self.last_seen > policy.idle_timeout || now - self.created_at > policy.max_lifetime
    }

    /// Time left before the session expires if nothing else happens.
    pub fn remaining(&self, now: DateTime<Utc>, policy: &SessionPolicy) -> Duration {
        let idle_left = policy.idle_timeout - (now - self.last_seen);
        let lifetime_left = policy.max_lifetime - (now - self.created_at);
        idle_left.min(lifetime_left).max(Duration::zero())
    }
}
