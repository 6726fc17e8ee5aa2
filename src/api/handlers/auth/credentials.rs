//! User creation and password verification.

use anyhow::Context;
use secrecy::SecretString;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use super::error::AuthError;
use super::hashing::PasswordHasher;
use super::storage::{InsertOutcome, User, UserRepository};
use super::utils::{generate_user_secret, normalize_email};

#[derive(Clone)]
pub struct CredentialStore {
    users: Arc<dyn UserRepository>,
    hasher: Arc<dyn PasswordHasher>,
}

impl CredentialStore {
    #[must_use]
    pub fn new(users: Arc<dyn UserRepository>, hasher: Arc<dyn PasswordHasher>) -> Self {
        Self { users, hasher }
    }

    /// Create a user with a fresh password salt and signing secret.
    ///
    /// # Errors
    /// `UserAlreadyExists` if the email is taken, `Internal` on store or hash failures.
    pub async fn sign_up(&self, name: &str, email: &str, password: &str) -> Result<User, AuthError> {
        let email = normalize_email(email);
        if self.users.find_by_email(&email).await?.is_some() {
            return Err(AuthError::UserAlreadyExists);
        }

        let hasher = self.hasher.clone();
        let password = password.to_string();
        let password_hash = tokio::task::spawn_blocking(move || {
            let salt = hasher.salt();
            hasher.hash(&password, &salt)
        })
        .await
        .context("password hashing task failed")??;

        let user = User {
            id: Uuid::new_v4(),
            name: name.trim().to_string(),
            email,
            password_hash,
            secret: SecretString::from(generate_user_secret()?),
        };

        match self.users.insert(&user).await? {
            InsertOutcome::Created => {
                debug!("Created user {}", user.id);
                Ok(user)
            }
            // Lost a race with a concurrent sign-up for the same email.
            InsertOutcome::Conflict => Err(AuthError::UserAlreadyExists),
        }
    }

    /// Return the user when `password` matches.
    ///
    /// # Errors
    /// `InvalidCredentials` for an unknown email or a wrong password alike.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<User, AuthError> {
        let email = normalize_email(email);
        let Some(user) = self.users.find_by_email(&email).await? else {
            debug!("Sign-in for unknown email");
            return Err(AuthError::InvalidCredentials);
        };

        let hasher = self.hasher.clone();
        let password = password.to_string();
        let stored = user.password_hash.clone();
        let matches = tokio::task::spawn_blocking(move || hasher.compare(&password, &stored))
            .await
            .context("password verification task failed")??;

        if matches {
            Ok(user)
        } else {
            debug!("Sign-in with wrong password for user {}", user.id);
            Err(AuthError::InvalidCredentials)
        }
    }

    /// # Errors
    /// `NotFound` if no user has this id.
    pub async fn find_by_id(&self, id: Uuid) -> Result<User, AuthError> {
        self.users.find_by_id(id).await?.ok_or(AuthError::NotFound)
    }
}
