//! Auth state and configuration.

use secrecy::SecretString;
use std::sync::Arc;
use std::time::Duration;

use super::codec::TokenCodec;
use super::credentials::CredentialStore;
use super::hashing::PasswordHasher;
use super::pipeline::AuthenticationPipeline;
use super::registry::RefreshSessionRegistry;
use super::service::SessionService;
use super::storage::{RefreshSessionRepository, UserRepository};

const DEFAULT_ACCESS_TOKEN_TTL: Duration = Duration::from_secs(15 * 60);
const DEFAULT_REFRESH_TOKEN_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);
const DEFAULT_FRONTEND_BASE_URL: &str = "http://localhost:3000";

#[derive(Clone, Debug)]
pub struct AuthConfig {
    server_secret: SecretString,
    frontend_base_url: String,
    access_token_ttl: Duration,
    refresh_token_ttl: Duration,
}

impl AuthConfig {
    #[must_use]
    pub fn new(server_secret: SecretString) -> Self {
        Self {
            server_secret,
            frontend_base_url: DEFAULT_FRONTEND_BASE_URL.to_string(),
            access_token_ttl: DEFAULT_ACCESS_TOKEN_TTL,
            refresh_token_ttl: DEFAULT_REFRESH_TOKEN_TTL,
        }
    }

    #[must_use]
    pub fn with_frontend_base_url(mut self, url: String) -> Self {
        self.frontend_base_url = url;
        self
    }

    #[must_use]
    pub fn with_access_token_ttl(mut self, ttl: Duration) -> Self {
        self.access_token_ttl = ttl;
        self
    }

    #[must_use]
    pub fn with_refresh_token_ttl(mut self, ttl: Duration) -> Self {
        self.refresh_token_ttl = ttl;
        self
    }

    #[must_use]
    pub fn frontend_base_url(&self) -> &str {
        &self.frontend_base_url
    }

    #[must_use]
    pub fn access_token_ttl(&self) -> Duration {
        self.access_token_ttl
    }

    #[must_use]
    pub fn refresh_token_ttl(&self) -> Duration {
        self.refresh_token_ttl
    }

    pub(super) fn session_cookie_secure(&self) -> bool {
        self.frontend_base_url.starts_with("https://")
    }
}

/// Everything the auth handlers share, built once at startup.
pub struct AuthState {
    config: AuthConfig,
    users: Arc<dyn UserRepository>,
    service: SessionService,
    pipeline: AuthenticationPipeline,
}

impl AuthState {
    pub fn new(
        config: AuthConfig,
        users: Arc<dyn UserRepository>,
        sessions: Arc<dyn RefreshSessionRepository>,
        hasher: Arc<dyn PasswordHasher>,
    ) -> Self {
        let codec = Arc::new(TokenCodec::new(
            config.server_secret.clone(),
            config.access_token_ttl,
            config.refresh_token_ttl,
        ));
        let credentials = CredentialStore::new(users.clone(), hasher);
        let registry = RefreshSessionRegistry::new(sessions);

        Self {
            service: SessionService::new(credentials.clone(), codec.clone(), registry),
            pipeline: AuthenticationPipeline::new(credentials, codec),
            users,
            config,
        }
    }

    #[must_use]
    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    #[must_use]
    pub fn service(&self) -> &SessionService {
        &self.service
    }

    #[must_use]
    pub fn pipeline(&self) -> &AuthenticationPipeline {
        &self.pipeline
    }

    pub(crate) fn users(&self) -> &dyn UserRepository {
        self.users.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = AuthConfig::new(SecretString::from("s"));
        assert_eq!(config.access_token_ttl(), Duration::from_secs(900));
        assert_eq!(config.refresh_token_ttl(), Duration::from_secs(604_800));
        assert_eq!(config.frontend_base_url(), "http://localhost:3000");
        assert!(!config.session_cookie_secure());
    }

    #[test]
    fn https_frontend_marks_cookies_secure() {
        let config = AuthConfig::new(SecretString::from("s"))
            .with_frontend_base_url("https://app.tessera.dev".to_string());
        assert!(config.session_cookie_secure());
    }

    #[test]
    fn debug_redacts_server_secret() {
        let config = AuthConfig::new(SecretString::from("super-secret-value"));
        assert!(!format!("{config:?}").contains("super-secret-value"));
    }
}
