//! PostgreSQL-backed user and refresh session repositories.

use anyhow::{Context, Result};
use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use sqlx::{postgres::PgRow, Connection, PgPool, Row};
use tracing::{info_span, Instrument};
use uuid::Uuid;

use super::storage::{
    InsertOutcome, RefreshSessionRecord, RefreshSessionRepository, User, UserRepository,
};
use super::utils::is_unique_violation;

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn find_user(&self, query: &'static str, bind: UserKey<'_>) -> Result<Option<User>> {
        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query
        );
        let statement = sqlx::query(query);
        let statement = match bind {
            UserKey::Email(email) => statement.bind(email),
            UserKey::Id(id) => statement.bind(id),
        };
        let row = statement
            .fetch_optional(&self.pool)
            .instrument(span)
            .await
            .context("failed to lookup user")?;

        row.as_ref().map(user_from_row).transpose()
    }
}

fn user_from_row(row: &PgRow) -> Result<User> {
    Ok(User {
        id: row.try_get("id").context("failed to decode users.id")?,
        name: row.try_get("name").context("failed to decode users.name")?,
        email: row.try_get("email").context("failed to decode users.email")?,
        password_hash: row
            .try_get("password_hash")
            .context("failed to decode users.password_hash")?,
        secret: SecretString::from(
            row.try_get::<String, _>("secret")
                .context("failed to decode users.secret")?,
        ),
    })
}

fn session_from_row(row: &PgRow) -> Result<RefreshSessionRecord> {
    Ok(RefreshSessionRecord {
        user_id: row
            .try_get("user_id")
            .context("failed to decode refresh_sessions.user_id")?,
        token: row
            .try_get("token")
            .context("failed to decode refresh_sessions.token")?,
        created_at: row
            .try_get("created_at")
            .context("failed to decode refresh_sessions.created_at")?,
    })
}

enum UserKey<'a> {
    Email(&'a str),
    Id(Uuid),
}

#[async_trait]
impl UserRepository for PgStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        self.find_user(
            "SELECT id, name, email, password_hash, secret FROM users WHERE email = $1",
            UserKey::Email(email),
        )
        .await
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>> {
        self.find_user(
            "SELECT id, name, email, password_hash, secret FROM users WHERE id = $1",
            UserKey::Id(id),
        )
        .await
    }

    async fn insert(&self, user: &User) -> Result<InsertOutcome> {
        let query = r"
            INSERT INTO users (id, name, email, password_hash, secret)
            VALUES ($1, $2, $3, $4, $5)
        ";
        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "INSERT",
            db.statement = query
        );
        let result = sqlx::query(query)
            .bind(user.id)
            .bind(&user.name)
            .bind(&user.email)
            .bind(&user.password_hash)
            .bind(user.secret.expose_secret())
            .execute(&self.pool)
            .instrument(span)
            .await;

        match result {
            Ok(_) => Ok(InsertOutcome::Created),
            Err(err) if is_unique_violation(&err) => Ok(InsertOutcome::Conflict),
            Err(err) => Err(err).context("failed to insert user"),
        }
    }

    async fn ping(&self) -> Result<()> {
        let acquire_span = info_span!(
            "db.acquire",
            db.system = "postgresql",
            db.operation = "ACQUIRE"
        );
        let mut conn = self
            .pool
            .acquire()
            .instrument(acquire_span)
            .await
            .context("failed to acquire database connection")?;

        let ping_span = info_span!("db.ping", db.system = "postgresql", db.operation = "PING");
        conn.ping()
            .instrument(ping_span)
            .await
            .context("failed to ping database")
    }
}

#[async_trait]
impl RefreshSessionRepository for PgStore {
    async fn upsert(&self, user_id: Uuid, token: &str) -> Result<()> {
        let query = r"
            INSERT INTO refresh_sessions (user_id, token, created_at)
            VALUES ($1, $2, NOW())
            ON CONFLICT (user_id)
            DO UPDATE SET token = EXCLUDED.token, created_at = EXCLUDED.created_at
        ";
        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "UPSERT",
            db.statement = query
        );
        sqlx::query(query)
            .bind(user_id)
            .bind(token)
            .execute(&self.pool)
            .instrument(span)
            .await
            .context("failed to store refresh session")?;
        Ok(())
    }

    async fn find(&self, user_id: Uuid) -> Result<Option<RefreshSessionRecord>> {
        let query = r"
            SELECT user_id, token, EXTRACT(EPOCH FROM created_at)::BIGINT AS created_at
            FROM refresh_sessions
            WHERE user_id = $1
        ";
        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query
        );
        let row = sqlx::query(query)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .instrument(span)
            .await
            .context("failed to lookup refresh session")?;

        row.as_ref().map(session_from_row).transpose()
    }

    async fn delete(&self, user_id: Uuid) -> Result<()> {
        let query = "DELETE FROM refresh_sessions WHERE user_id = $1";
        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "DELETE",
            db.statement = query
        );
        sqlx::query(query)
            .bind(user_id)
            .execute(&self.pool)
            .instrument(span)
            .await
            .context("failed to delete refresh session")?;
        Ok(())
    }
}
