use crate::api::{
    self,
    handlers::auth::{
        Argon2Hasher, AuthConfig, AuthState, MemoryStore, PgStore, RefreshSessionRepository,
        UserRepository,
    },
};
use anyhow::{Context, Result};
use secrecy::SecretString;
use sqlx::postgres::PgPoolOptions;
use std::{sync::Arc, time::Duration};
use tracing::{debug, info, warn};

const SCHEMA_SQL: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/sql/schema.sql"));

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub dsn: Option<String>,
    pub server_secret: SecretString,
    pub access_token_ttl: Duration,
    pub refresh_token_ttl: Duration,
    pub frontend_base_url: String,
}

/// Execute the server action.
/// # Errors
/// Returns an error if the database is unreachable, the schema cannot be
/// applied, or the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    debug!("Server args: {:?}", args);

    let (users, sessions) = stores(args.dsn.as_deref()).await?;

    let auth_config = AuthConfig::new(args.server_secret)
        .with_frontend_base_url(args.frontend_base_url)
        .with_access_token_ttl(args.access_token_ttl)
        .with_refresh_token_ttl(args.refresh_token_ttl);

    let auth_state = Arc::new(AuthState::new(
        auth_config,
        users,
        sessions,
        Arc::new(Argon2Hasher::default()),
    ));

    api::new(args.port, auth_state).await
}

async fn stores(
    dsn: Option<&str>,
) -> Result<(Arc<dyn UserRepository>, Arc<dyn RefreshSessionRepository>)> {
    let Some(dsn) = dsn else {
        warn!("No DSN configured; users and sessions are kept in memory and lost on restart");
        let store = Arc::new(MemoryStore::new());
        let users: Arc<dyn UserRepository> = store.clone();
        let sessions: Arc<dyn RefreshSessionRepository> = store;
        return Ok((users, sessions));
    };

    // Connect to database
    let pool = PgPoolOptions::new()
        .min_connections(1)
        .max_connections(5)
        .max_lifetime(Duration::from_secs(60 * 2))
        .test_before_acquire(true)
        .connect(dsn)
        .await
        .context("Failed to connect to database")?;

    sqlx::raw_sql(SCHEMA_SQL)
        .execute(&pool)
        .await
        .context("Failed to apply database schema")?;

    info!("Connected to database");

    let store = Arc::new(PgStore::new(pool));
    let users: Arc<dyn UserRepository> = store.clone();
    let sessions: Arc<dyn RefreshSessionRepository> = store;
    Ok((users, sessions))
}
