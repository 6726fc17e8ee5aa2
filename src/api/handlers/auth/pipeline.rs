//! Per-request authentication.
//!
//! Flow Overview: read the access token from the `accessToken` cookie (or a
//! bearer header), peek at its subject, load that user, and verify the token
//! with the user's key. Every failure is logged here and answered with the
//! same bare `Unauthorized`.

use axum::{
    extract::{Extension, Request},
    http::{
        header::{AUTHORIZATION, COOKIE},
        HeaderMap,
    },
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use tracing::{debug, error};
use uuid::Uuid;

use super::codec::{TokenCodec, TokenKind};
use super::credentials::CredentialStore;
use super::error::AuthError;
use super::state::AuthState;

pub const ACCESS_TOKEN_COOKIE: &str = "accessToken";

/// Authenticated user handed to guarded handlers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Identity {
    pub id: Uuid,
    pub email: String,
}

#[derive(Clone)]
pub struct AuthenticationPipeline {
    credentials: CredentialStore,
    codec: Arc<TokenCodec>,
}

impl AuthenticationPipeline {
    #[must_use]
    pub fn new(credentials: CredentialStore, codec: Arc<TokenCodec>) -> Self {
        Self { credentials, codec }
    }

    /// Resolve the access token carried by `headers`.
    ///
    /// # Errors
    /// `Unauthorized` for any missing, unknown, forged or expired token.
    pub async fn require_identity(&self, headers: &HeaderMap) -> Result<Identity, AuthError> {
        let token = extract_access_token(headers);
        self.authenticate(token.as_deref()).await
    }

    /// # Errors
    /// `Unauthorized` for any missing, unknown, forged or expired token.
    pub async fn authenticate(&self, token: Option<&str>) -> Result<Identity, AuthError> {
        let Some(token) = token else {
            debug!("No access token presented");
            return Err(AuthError::Unauthorized);
        };

        let user_id = TokenCodec::peek_subject(token).map_err(|err| {
            debug!("Undecodable access token: {err}");
            AuthError::Unauthorized
        })?;

        let user = match self.credentials.find_by_id(user_id).await {
            Ok(user) => user,
            Err(AuthError::NotFound) => {
                debug!("Access token for unknown user {user_id}");
                return Err(AuthError::Unauthorized);
            }
            Err(err) => {
                error!("Failed to load user for access token: {err}");
                return Err(AuthError::Unauthorized);
            }
        };

        let claims = self
            .codec
            .verify(token, &user.secret, TokenKind::Access)
            .map_err(|err| {
            debug!("Access token rejected for user {user_id}: {err}");
            AuthError::Unauthorized
        })?;

        Ok(Identity {
            id: user.id,
            email: claims.email,
        })
    }
}

/// Route guard; place with `route_layer` ahead of handlers taking `Extension<Identity>`.
///
/// # Errors
/// `Unauthorized` when the request carries no valid access token.
pub async fn guard(
    Extension(auth_state): Extension<Arc<AuthState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let identity = auth_state
        .pipeline()
        .require_identity(request.headers())
        .await?;
    request.extensions_mut().insert(identity);
    Ok(next.run(request).await)
}

/// Access token from the `accessToken` cookie, falling back to a bearer header.
pub fn extract_access_token(headers: &HeaderMap) -> Option<String> {
    read_cookie(headers, ACCESS_TOKEN_COOKIE).or_else(|| extract_bearer_token(headers))
}

/// Value of cookie `name`, if present and non-empty.
pub(super) fn read_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|header| header.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| {
            let mut parts = pair.trim().splitn(2, '=');
            let key = parts.next()?.trim();
            let val = parts.next()?.trim();
            (key == name && !val.is_empty()).then(|| val.to_string())
        })
        .next()
}

fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let trimmed = value.trim();
    let token = trimmed
        .strip_prefix("Bearer ")
        .or_else(|| trimmed.strip_prefix("bearer "))?
        .trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::handlers::auth::codec::TokenSubject;
    use crate::api::handlers::auth::hashing::Argon2Hasher;
    use crate::api::handlers::auth::storage::MemoryStore;
    use anyhow::Result;
    use axum::http::HeaderValue;
    use secrecy::SecretString;
    use std::time::Duration;

    struct Fixture {
        pipeline: AuthenticationPipeline,
        credentials: CredentialStore,
        codec: Arc<TokenCodec>,
    }

    fn fixture() -> Result<Fixture> {
        let credentials = CredentialStore::new(
            Arc::new(MemoryStore::new()),
            Arc::new(Argon2Hasher::with_params(8, 1, 1)?),
        );
        let codec = Arc::new(TokenCodec::new(
            SecretString::from("server-secret"),
            Duration::from_secs(900),
            Duration::from_secs(3600),
        ));
        Ok(Fixture {
            pipeline: AuthenticationPipeline::new(credentials.clone(), codec.clone()),
            credentials,
            codec,
        })
    }

    #[test]
    fn extract_access_token_prefers_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            HeaderValue::from_static("sessionId=abc; accessToken=from-cookie"),
        );
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer from-header"));
        assert_eq!(
            extract_access_token(&headers),
            Some("from-cookie".to_string())
        );
    }

    #[test]
    fn extract_access_token_falls_back_to_bearer() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer  abc "));
        assert_eq!(extract_access_token(&headers), Some("abc".to_string()));
    }

    #[test]
    fn extract_access_token_ignores_empty_values() {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_static("accessToken="));
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer "));
        assert_eq!(extract_access_token(&headers), None);
    }

    #[test]
    fn read_cookie_matches_whole_name() {
        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            HeaderValue::from_static("xaccessToken=nope; refreshToken=r1"),
        );
        assert_eq!(read_cookie(&headers, ACCESS_TOKEN_COOKIE), None);
        assert_eq!(
            read_cookie(&headers, "refreshToken"),
            Some("r1".to_string())
        );
    }

    #[tokio::test]
    async fn valid_token_yields_identity() -> Result<()> {
        let fx = fixture()?;
        let user = fx
            .credentials
            .sign_up("A", "a@test.com", "Passw0rd!1")
            .await?;
        let subject = TokenSubject {
            user_id: user.id,
            email: user.email.clone(),
        };
        let token = fx.codec.issue(&subject, &user.secret, TokenKind::Access)?;

        let identity = fx.pipeline.authenticate(Some(&token)).await?;
        assert_eq!(
            identity,
            Identity {
                id: user.id,
                email: "a@test.com".to_string()
            }
        );
        Ok(())
    }

    #[tokio::test]
    async fn every_failure_is_unauthorized() -> Result<()> {
        let fx = fixture()?;
        let user = fx
            .credentials
            .sign_up("A", "a@test.com", "Passw0rd!1")
            .await?;

        let ghost = TokenSubject {
            user_id: Uuid::new_v4(),
            email: "ghost@test.com".to_string(),
        };
        let unknown_user = fx.codec.issue(&ghost, &user.secret, TokenKind::Access)?;

        let subject = TokenSubject {
            user_id: user.id,
            email: user.email.clone(),
        };
        let wrong_key = fx
            .codec
            .issue(&subject, &SecretString::from("other"), TokenKind::Access)?;
        let expired = fx
            .codec
            .issue_at(&subject, &user.secret, TokenKind::Access, 1_000)?;
        let refresh_as_access = fx
            .codec
            .issue(&subject, &user.secret, TokenKind::Refresh)?;

        let cases = [
            None,
            Some("garbage"),
            Some(unknown_user.as_str()),
            Some(wrong_key.as_str()),
            Some(expired.as_str()),
            Some(refresh_as_access.as_str()),
        ];
        for token in cases {
            let result = fx.pipeline.authenticate(token).await;
            assert!(matches!(result, Err(AuthError::Unauthorized)), "{token:?}");
        }
        Ok(())
    }
}
