//! In-memory session registry.
//!
//! Sessions are never persisted; restarting the process logs every admin out.

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use fondita_core::clock::{Clock, SystemClock};
use fondita_core::error::{FonditaError, Result};
use fondita_core::session::{Session, SessionPolicy, SessionStore};
use rand::RngCore;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Random bytes per token (256 bits).
const TOKEN_BYTES: usize = 32;

fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Session store backed by a `HashMap` behind an async `RwLock`.
#[derive(Clone)]
pub struct InMemorySessionStore {
    sessions: Arc<RwLock<HashMap<String, Session>>>,
    policy: SessionPolicy,
    clock: Arc<dyn Clock>,
}

impl InMemorySessionStore {
    pub fn new(policy: SessionPolicy) -> Self {
        Self::with_clock(policy, Arc::new(SystemClock))
    }

    pub fn with_clock(policy: SessionPolicy, clock: Arc<dyn Clock>) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            policy,
            clock,
        }
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn issue(&self, username: &str) -> Result<Session> {
        let session = Session::new(generate_token(), username.to_string(), self.clock.now());

        let mut sessions = self.sessions.write().await;
        sessions.insert(session.token.clone(), session.clone());
        tracing::info!(username = %username, active = sessions.len(), "Session issued");

        Ok(session)
    }

    async fn validate(&self, token: &str) -> Result<Session> {
        let now = self.clock.now();
        let mut sessions = self.sessions.write().await;

        let expired = match sessions.get_mut(token) {
            None => return Err(FonditaError::unauthorized("unknown session")),
            Some(session) if session.is_expired(now, &self.policy) => true,
            Some(session) => {
                session.last_seen = now;
                return Ok(session.clone());
            }
        };

        if expired {
            if let Some(session) = sessions.remove(token) {
                tracing::debug!(username = %session.username, "Expired session dropped on use");
            }
        }
        Err(FonditaError::unauthorized("session expired"))
    }

    async fn revoke(&self, token: &str) -> Result<()> {
        let mut sessions = self.sessions.write().await;
        if let Some(session) = sessions.remove(token) {
            tracing::info!(username = %session.username, "Session revoked");
        }
        Ok(())
    }

    async fn sweep(&self) -> Result<usize> {
        let now = self.clock.now();
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, session| !session.is_expired(now, &self.policy));
        Ok(before - sessions.len())
    }

    async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }
}

/// Spawns a task that sweeps `store` every `interval` until `cancel` fires.
pub fn spawn_session_sweeper(
    store: Arc<dyn SessionStore>,
    interval: Duration,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // The first tick completes immediately
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::debug!("Session sweeper stopped");
                    break;
                }
                _ = ticker.tick() => {
                    match store.sweep().await {
                        Ok(0) => {}
                        Ok(removed) => tracing::info!(removed, "Expired sessions swept"),
                        Err(e) => tracing::warn!(error = %e, "Session sweep failed"),
                    }
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use fondita_core::clock::ManualClock;

    fn store_with_clock() -> (InMemorySessionStore, ManualClock) {
        let clock = ManualClock::new(Utc::now());
        let store =
            InMemorySessionStore::with_clock(SessionPolicy::default(), Arc::new(clock.clone()));
        (store, clock)
    }

    #[tokio::test]
    async fn test_issue_validate_revoke() {
        let (store, _clock) = store_with_clock();

        let session = store.issue("admin").await.unwrap();
        assert_eq!(session.username, "admin");

        let validated = store.validate(&session.token).await.unwrap();
        assert_eq!(validated.username, "admin");

        store.revoke(&session.token).await.unwrap();
        store.revoke(&session.token).await.unwrap();
        let err = store.validate(&session.token).await.unwrap_err();
        assert!(matches!(err, FonditaError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn test_tokens_are_unique_and_url_safe() {
        let (store, _clock) = store_with_clock();
        let a = store.issue("admin").await.unwrap();
        let b = store.issue("admin").await.unwrap();

        assert_ne!(a.token, b.token);
        assert_eq!(a.token.len(), 43);
        assert!(
            a.token
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        );
    }

    #[tokio::test]
    async fn test_idle_timeout_without_sweep() {
        let (store, clock) = store_with_clock();
        let session = store.issue("admin").await.unwrap();

        clock.advance(chrono::Duration::minutes(30) - chrono::Duration::seconds(1));
        assert!(store.validate(&session.token).await.is_ok());

        // The successful validation slid the window forward
        clock.advance(chrono::Duration::minutes(30) + chrono::Duration::seconds(1));
        assert!(store.validate(&session.token).await.is_err());
        assert_eq!(store.len().await, 0);
    }

    #[tokio::test]
    async fn test_absolute_lifetime_caps_activity() {
        let (store, clock) = store_with_clock();
        let session = store.issue("admin").await.unwrap();

        for _ in 0..(12 * 4) {
            clock.advance(chrono::Duration::minutes(15));
            assert!(store.validate(&session.token).await.is_ok());
        }
        clock.advance(chrono::Duration::seconds(1));
        assert!(store.validate(&session.token).await.is_err());
    }

    #[tokio::test]
    async fn test_sweep_removes_only_expired() {
        let (store, clock) = store_with_clock();
        store.issue("old").await.unwrap();
        clock.advance(chrono::Duration::minutes(20));
        let fresh = store.issue("fresh").await.unwrap();
        clock.advance(chrono::Duration::minutes(15));

        assert_eq!(store.sweep().await.unwrap(), 1);
        assert_eq!(store.len().await, 1);
        assert!(store.validate(&fresh.token).await.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweeper_runs_until_cancelled() {
        let (store, clock) = store_with_clock();
        store.issue("admin").await.unwrap();
        clock.advance(chrono::Duration::hours(1));

        let cancel = CancellationToken::new();
        let store: Arc<dyn SessionStore> = Arc::new(store);
        let handle = spawn_session_sweeper(store.clone(), Duration::from_secs(300), cancel.clone());

        tokio::time::sleep(Duration::from_secs(301)).await;
        assert_eq!(store.len().await, 0);

        cancel.cancel();
        handle.await.unwrap();
    }
}
