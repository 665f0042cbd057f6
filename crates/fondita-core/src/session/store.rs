//! Session store trait.
//!
//! Defines the interface the HTTP layer uses to issue and check tokens.

use super::model::Session;
use crate::error::Result;
use async_trait::async_trait;

/// An abstract registry of admin sessions.
///
/// The HTTP layer only ever sees this trait, so the in-memory implementation
/// can be swapped for a durable one without touching handlers.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Creates a session for `username` and returns it with a fresh token.
    async fn issue(&self, username: &str) -> Result<Session>;

    /// Looks up a token and refreshes its last-seen time.
    ///
    /// # Returns
    ///
    /// - `Ok(Session)`: Token is known and not expired
    /// - `Err(Unauthorized)`: Token is unknown or expired
    async fn validate(&self, token: &str) -> Result<Session>;

    /// Removes a token. Unknown tokens are ignored.
    async fn revoke(&self, token: &str) -> Result<()>;

    /// Drops every expired session, returning how many were removed.
    async fn sweep(&self) -> Result<usize>;

    /// Number of sessions currently held, expired or not.
    async fn len(&self) -> usize;
}
