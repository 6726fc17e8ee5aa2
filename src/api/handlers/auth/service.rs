//! Sign-up, sign-in, refresh and sign-out.

use anyhow::Context;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

use super::codec::{TokenCodec, TokenKind, TokenSubject};
use super::credentials::CredentialStore;
use super::error::AuthError;
use super::registry::RefreshSessionRegistry;
use super::storage::User;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Clone)]
pub struct SessionService {
    credentials: CredentialStore,
    codec: Arc<TokenCodec>,
    registry: RefreshSessionRegistry,
}

impl SessionService {
    #[must_use]
    pub fn new(
        credentials: CredentialStore,
        codec: Arc<TokenCodec>,
        registry: RefreshSessionRegistry,
    ) -> Self {
        Self {
            credentials,
            codec,
            registry,
        }
    }

    /// # Errors
    /// `UserAlreadyExists` if the email is taken.
    pub async fn sign_up(&self, name: &str, email: &str, password: &str) -> Result<TokenPair, AuthError> {
        let user = self.credentials.sign_up(name, email, password).await?;
        info!("User {} signed up", user.id);
        self.start_session(&user).await
    }

    /// # Errors
    /// `InvalidCredentials` for an unknown email or wrong password.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<TokenPair, AuthError> {
        let user = self.credentials.sign_in(email, password).await?;
        debug!("User {} signed in", user.id);
        self.start_session(&user).await
    }

    /// Rotate a refresh token: the presented one stops working, a new pair is returned.
    ///
    /// # Errors
    /// `InvalidRefreshToken` unless the token is both the stored one for its
    /// user and validly signed and unexpired.
    pub async fn refresh(&self, presented: &str) -> Result<TokenPair, AuthError> {
        let user_id = TokenCodec::peek_subject(presented).map_err(|err| {
            debug!("Undecodable refresh token: {err}");
            AuthError::InvalidRefreshToken
        })?;

        let user = match self.credentials.find_by_id(user_id).await {
            Ok(user) => user,
            Err(AuthError::NotFound) => return Err(AuthError::InvalidRefreshToken),
            Err(err) => return Err(err),
        };

        let active = self.registry.is_active(user.id, presented).await?;
        let verified = self
            .codec
            .verify(presented, &user.secret, TokenKind::Refresh);
        match (active, verified) {
            (true, Ok(_)) => self.start_session(&user).await,
            (_, Err(err)) => {
                debug!("Refresh token rejected for user {}: {err}", user.id);
                Err(AuthError::InvalidRefreshToken)
            }
            (false, Ok(_)) => Err(AuthError::InvalidRefreshToken),
        }
    }

    /// Revoke the user's refresh session. Safe to repeat.
    ///
    /// # Errors
    /// `Internal` if the store write fails.
    pub async fn sign_out(&self, user_id: Uuid) -> Result<(), AuthError> {
        self.registry.revoke_all(user_id).await?;
        debug!("User {user_id} signed out");
        Ok(())
    }

    /// # Errors
    /// `NotFound` if the user no longer exists.
    pub async fn me(&self, user_id: Uuid) -> Result<User, AuthError> {
        self.credentials.find_by_id(user_id).await
    }

    async fn start_session(&self, user: &User) -> Result<TokenPair, AuthError> {
        let subject = TokenSubject {
            user_id: user.id,
            email: user.email.clone(),
        };
        let access_token = self
            .codec
            .issue(&subject, &user.secret, TokenKind::Access)
            .context("failed to sign access token")?;
        let refresh_token = self
            .codec
            .issue(&subject, &user.secret, TokenKind::Refresh)
            .context("failed to sign refresh token")?;

        self.registry.replace(user.id, &refresh_token).await?;

        Ok(TokenPair {
            access_token,
            refresh_token,
        })
    }
}
