//! Request/response types for auth endpoints.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::error::AuthError;
use super::storage::User;
use super::utils::{normalize_email, strong_password, valid_email, MIN_PASSWORD_LENGTH};

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct SignUpRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct SignInRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct UserProfile {
    pub id: String,
    pub name: String,
    pub email: String,
}

impl From<User> for UserProfile {
    fn from(user: User) -> Self {
        Self {
            id: user.id.to_string(),
            name: user.name,
            email: user.email,
        }
    }
}

impl SignUpRequest {
    /// # Errors
    /// `Validation` listing every rule that failed.
    pub fn validate(&self) -> Result<(), AuthError> {
        let mut messages = Vec::new();
        if self.name.trim().is_empty() {
            messages.push("name should not be empty".to_string());
        }
        check_email(&self.email, &mut messages);
        check_password(&self.password, &mut messages);
        into_result(messages)
    }
}

impl SignInRequest {
    /// # Errors
    /// `Validation` listing every rule that failed.
    pub fn validate(&self) -> Result<(), AuthError> {
        let mut messages = Vec::new();
        check_email(&self.email, &mut messages);
        check_password(&self.password, &mut messages);
        into_result(messages)
    }
}

fn check_email(email: &str, messages: &mut Vec<String>) {
    let email = normalize_email(email);
    if email.is_empty() {
        messages.push("email should not be empty".to_string());
    } else if !valid_email(&email) {
        messages.push("email must be an email".to_string());
    }
}

fn check_password(password: &str, messages: &mut Vec<String>) {
    if password.is_empty() {
        messages.push("password should not be empty".to_string());
    } else if password.chars().count() < MIN_PASSWORD_LENGTH {
        messages.push(format!(
            "password must be longer than or equal to {MIN_PASSWORD_LENGTH} characters"
        ));
    } else if !strong_password(password) {
        messages.push(
            "Password should contain atleast 1 letter, 1 number and 1 special character"
                .to_string(),
        );
    }
}

fn into_result(messages: Vec<String>) -> Result<(), AuthError> {
    if messages.is_empty() {
        Ok(())
    } else {
        Err(AuthError::Validation(messages))
    }
}
