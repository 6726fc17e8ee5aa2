//! Repository traits for users and refresh sessions, plus in-memory stores.
//!
//! The PostgreSQL implementation lives in `postgres.rs`; the in-memory one is
//! used when no DSN is configured and throughout the tests.

use anyhow::Result;
use async_trait::async_trait;
use secrecy::SecretString;
use std::collections::HashMap;
use std::fmt;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::codec::unix_now;

#[derive(Clone)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub secret: SecretString,
}

impl fmt::Debug for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("User")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("email", &self.email)
            .field("password_hash", &"[REDACTED]")
            .field("secret", &self.secret)
            .finish()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RefreshSessionRecord {
    pub user_id: Uuid,
    pub token: String,
    pub created_at: i64,
}

/// Outcome when attempting to insert a new user.
#[derive(Debug, PartialEq, Eq)]
pub enum InsertOutcome {
    Created,
    Conflict,
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>>;

    /// Insert a new user; `Conflict` when the email is already taken.
    async fn insert(&self, user: &User) -> Result<InsertOutcome>;

    /// Cheap reachability check used by `/health`.
    async fn ping(&self) -> Result<()>;
}

#[async_trait]
pub trait RefreshSessionRepository: Send + Sync {
    /// Store `token` as the only record for `user_id` in one atomic write.
    async fn upsert(&self, user_id: Uuid, token: &str) -> Result<()>;

    async fn find(&self, user_id: Uuid) -> Result<Option<RefreshSessionRecord>>;

    /// Remove the record for `user_id`; no error when none exists.
    async fn delete(&self, user_id: Uuid) -> Result<()>;
}

/// Process-local store for development and tests.
#[derive(Default)]
pub struct MemoryStore {
    users: RwLock<HashMap<Uuid, User>>,
    sessions: RwLock<HashMap<Uuid, RefreshSessionRecord>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live refresh sessions.
    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let users = self.users.read().await;
        Ok(users.values().find(|user| user.email == email).cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>> {
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn insert(&self, user: &User) -> Result<InsertOutcome> {
        // Check and insert under one write guard so concurrent sign-ups race safely.
        let mut users = self.users.write().await;
        if users
            .values()
            .any(|existing| existing.email == user.email || existing.id == user.id)
        {
            return Ok(InsertOutcome::Conflict);
        }
        users.insert(user.id, user.clone());
        Ok(InsertOutcome::Created)
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}

#[async_trait]
impl RefreshSessionRepository for MemoryStore {
    async fn upsert(&self, user_id: Uuid, token: &str) -> Result<()> {
        let record = RefreshSessionRecord {
            user_id,
            token: token.to_string(),
            created_at: unix_now(),
        };
        self.sessions.write().await.insert(user_id, record);
        Ok(())
    }

    async fn find(&self, user_id: Uuid) -> Result<Option<RefreshSessionRecord>> {
        Ok(self.sessions.read().await.get(&user_id).cloned())
    }

    async fn delete(&self, user_id: Uuid) -> Result<()> {
        self.sessions.write().await.remove(&user_id);
        Ok(())
    }
}
