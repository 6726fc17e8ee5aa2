//! One live refresh token per user.
//!
//! Lifecycle of a user's record: absent, then active after sign-in/sign-up,
//! then either superseded by a refresh (a new active record) or revoked by
//! sign-out (absent again).

use anyhow::Result;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use super::storage::RefreshSessionRepository;

#[derive(Clone)]
pub struct RefreshSessionRegistry {
    sessions: Arc<dyn RefreshSessionRepository>,
}

impl RefreshSessionRegistry {
    #[must_use]
    pub fn new(sessions: Arc<dyn RefreshSessionRepository>) -> Self {
        Self { sessions }
    }

    /// Make `token` the only accepted refresh token for `user_id`.
    ///
    /// # Errors
    /// Returns an error if the store write fails.
    pub async fn replace(&self, user_id: Uuid, token: &str) -> Result<()> {
        self.sessions.upsert(user_id, token).await
    }

    /// Drop the user's refresh session, if any.
    ///
    /// # Errors
    /// Returns an error if the store write fails.
    pub async fn revoke_all(&self, user_id: Uuid) -> Result<()> {
        self.sessions.delete(user_id).await
    }

    /// Exact match against the stored token. Says nothing about the signature.
    ///
    /// # Errors
    /// Returns an error if the store read fails.
    pub async fn is_active(&self, user_id: Uuid, token: &str) -> Result<bool> {
        let active = self
            .sessions
            .find(user_id)
            .await?
            .is_some_and(|record| record.token == token);
        if !active {
            debug!("Refresh token for user {user_id} is not the active one");
        }
        Ok(active)
    }
}
