//! Admin authentication.

use fondita_core::clock::Clock;
use fondita_core::error::{FonditaError, Result};
use fondita_core::session::{Session, SessionPolicy, SessionStore};
use std::sync::Arc;

/// The single admin account.
#[derive(Clone)]
pub struct AdminCredentials {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for AdminCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminCredentials")
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

/// Compares without exiting early on the first differing byte.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// Login, logout and per-request authentication on top of a [`SessionStore`].
#[derive(Clone)]
pub struct AuthService {
    sessions: Arc<dyn SessionStore>,
    credentials: AdminCredentials,
    policy: SessionPolicy,
    clock: Arc<dyn Clock>,
}

impl AuthService {
    pub fn new(
        sessions: Arc<dyn SessionStore>,
        credentials: AdminCredentials,
        policy: SessionPolicy,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            sessions,
            credentials,
            policy,
            clock,
        }
    }

    /// Checks the credentials and opens a session.
    pub async fn login(&self, username: &str, password: &str) -> Result<Session> {
        let user_ok = constant_time_eq(username.as_bytes(), self.credentials.username.as_bytes());
        let pass_ok = constant_time_eq(password.as_bytes(), self.credentials.password.as_bytes());
        if !(user_ok && pass_ok) {
            tracing::warn!(username = %username, "Rejected login");
            return Err(FonditaError::unauthorized("invalid credentials"));
        }

        self.sessions.issue(username).await
    }

    pub async fn logout(&self, token: &str) -> Result<()> {
        self.sessions.revoke(token).await
    }

    /// Resolves a bearer token to its session, refreshing its expiry.
    pub async fn authenticate(&self, token: &str) -> Result<Session> {
        if token.is_empty() {
            return Err(FonditaError::unauthorized("missing token"));
        }
        self.sessions.validate(token).await
    }

    /// Seconds until `session` expires if left idle.
    pub fn expires_in_seconds(&self, session: &Session) -> i64 {
        session.remaining(self.clock.now(), &self.policy).num_seconds()
    }
}
