//! Signed claims tokens keyed per user.
//!
//! Tokens are compact JWS strings (`header.payload.signature`, base64url
//! without padding) signed with `HS256`. The `HMAC` key is the server secret
//! followed by the user's own secret, so each user's tokens live under a
//! separate key.

use base64ct::{Base64UrlUnpadded, Encoding};
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use thiserror::Error;
use ulid::Ulid;
use uuid::Uuid;

type HmacSha256 = Hmac<Sha256>;

const ALG: &str = "HS256";
const TYP: &str = "JWT";

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("invalid token format")]
    TokenFormat,
    #[error("invalid base64url encoding")]
    Base64,
    #[error("invalid json")]
    Json(#[from] serde_json::Error),
    #[error("unsupported algorithm: {0}")]
    UnsupportedAlg(String),
    #[error("invalid signing key")]
    InvalidKey,
    #[error("invalid signature")]
    InvalidSignature,
    #[error("token expired")]
    Expired,
    #[error("expected {expected:?} token, got {actual:?}")]
    WrongKind {
        expected: TokenKind,
        actual: TokenKind,
    },
    #[error("invalid subject")]
    InvalidSubject,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TokenHeader {
    pub alg: String,
    pub typ: String,
}

impl TokenHeader {
    fn hs256() -> Self {
        Self {
            alg: ALG.to_string(),
            typ: TYP.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TokenClaims {
    pub sub: String,
    pub email: String,
    pub iat: i64,
    pub exp: i64,
    /// Access and refresh tokens share a key, so the kind is signed in too.
    pub kind: TokenKind,
    /// Random per-token id; keeps two tokens minted in the same second distinct.
    pub jti: String,
}

/// Who a token is issued for. Timestamps and `jti` are filled in at issue time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenSubject {
    pub user_id: Uuid,
    pub email: String,
}

#[derive(Clone, Debug)]
pub struct TokenCodec {
    server_secret: SecretString,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl TokenCodec {
    #[must_use]
    pub fn new(server_secret: SecretString, access_ttl: Duration, refresh_ttl: Duration) -> Self {
        Self {
            server_secret,
            access_ttl,
            refresh_ttl,
        }
    }

    #[must_use]
    pub fn ttl(&self, kind: TokenKind) -> Duration {
        match kind {
            TokenKind::Access => self.access_ttl,
            TokenKind::Refresh => self.refresh_ttl,
        }
    }

    /// Sign a token for `subject` using the current time.
    ///
    /// # Errors
    ///
    /// Returns an error if the claims cannot be encoded or the key is rejected.
    pub fn issue(
        &self,
        subject: &TokenSubject,
        user_secret: &SecretString,
        kind: TokenKind,
    ) -> Result<String, TokenError> {
        self.issue_at(subject, user_secret, kind, unix_now())
    }

    /// Sign a token for `subject` as if issued at `now_unix_seconds`.
    ///
    /// # Errors
    ///
    /// Returns an error if the claims cannot be encoded or the key is rejected.
    pub fn issue_at(
        &self,
        subject: &TokenSubject,
        user_secret: &SecretString,
        kind: TokenKind,
        now_unix_seconds: i64,
    ) -> Result<String, TokenError> {
        let ttl = i64::try_from(self.ttl(kind).as_secs()).unwrap_or(i64::MAX);
        let claims = TokenClaims {
            sub: subject.user_id.to_string(),
            email: subject.email.clone(),
            iat: now_unix_seconds,
            exp: now_unix_seconds.saturating_add(ttl),
            kind,
            jti: Ulid::new().to_string(),
        };

        let header_b64 = b64e_json(&TokenHeader::hs256())?;
        let claims_b64 = b64e_json(&claims)?;
        let signing_input = format!("{header_b64}.{claims_b64}");

        let mut mac = self.mac(user_secret)?;
        mac.update(signing_input.as_bytes());
        let signature_b64 = Base64UrlUnpadded::encode_string(&mac.finalize().into_bytes());

        Ok(format!("{signing_input}.{signature_b64}"))
    }

    /// Verify signature, kind and expiry against the current time.
    ///
    /// # Errors
    ///
    /// Returns an error if the token is malformed, signed with a different key,
    /// not of `kind`, or expired.
    pub fn verify(
        &self,
        token: &str,
        user_secret: &SecretString,
        kind: TokenKind,
    ) -> Result<TokenClaims, TokenError> {
        self.verify_at(token, user_secret, kind, unix_now())
    }

    /// Verify signature, kind and expiry against `now_unix_seconds`.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - the token is not three segments of valid base64url/json,
    /// - the header names an algorithm other than `HS256`,
    /// - the signature does not match the key for `user_secret`,
    /// - the `kind` claim differs from `kind`,
    /// - `exp` is not in the future.
    pub fn verify_at(
        &self,
        token: &str,
        user_secret: &SecretString,
        kind: TokenKind,
        now_unix_seconds: i64,
    ) -> Result<TokenClaims, TokenError> {
        let (header_b64, claims_b64, sig_b64) = split_token(token)?;

        let header: TokenHeader = b64d_json(header_b64)?;
        if header.alg != ALG {
            return Err(TokenError::UnsupportedAlg(header.alg));
        }

        let signature = Base64UrlUnpadded::decode_vec(sig_b64).map_err(|_| TokenError::Base64)?;
        let mut mac = self.mac(user_secret)?;
        mac.update(header_b64.as_bytes());
        mac.update(b".");
        mac.update(claims_b64.as_bytes());
        mac.verify_slice(&signature)
            .map_err(|_| TokenError::InvalidSignature)?;

        let claims: TokenClaims = b64d_json(claims_b64)?;
        if claims.kind != kind {
            return Err(TokenError::WrongKind {
                expected: kind,
                actual: claims.kind,
            });
        }
        if claims.exp <= now_unix_seconds {
            return Err(TokenError::Expired);
        }

        Ok(claims)
    }

    /// Read the claimed subject without checking the signature.
    ///
    /// Only use the result to decide whose secret to verify with; it is
    /// attacker-controlled until `verify` succeeds.
    ///
    /// # Errors
    ///
    /// Returns an error if the token is malformed or `sub` is not a user id.
    pub fn peek_subject(token: &str) -> Result<Uuid, TokenError> {
        let (_, claims_b64, _) = split_token(token)?;
        let claims: TokenClaims = b64d_json(claims_b64)?;
        Uuid::parse_str(&claims.sub).map_err(|_| TokenError::InvalidSubject)
    }

    fn mac(&self, user_secret: &SecretString) -> Result<HmacSha256, TokenError> {
        let server = self.server_secret.expose_secret().as_bytes();
        let user = user_secret.expose_secret().as_bytes();
        let mut key = Vec::with_capacity(server.len() + user.len());
        key.extend_from_slice(server);
        key.extend_from_slice(user);
        HmacSha256::new_from_slice(&key).map_err(|_| TokenError::InvalidKey)
    }
}

fn split_token(token: &str) -> Result<(&str, &str, &str), TokenError> {
    let mut parts = token.split('.');
    let header_b64 = parts.next().ok_or(TokenError::TokenFormat)?;
    let claims_b64 = parts.next().ok_or(TokenError::TokenFormat)?;
    let sig_b64 = parts.next().ok_or(TokenError::TokenFormat)?;
    if parts.next().is_some() || header_b64.is_empty() || claims_b64.is_empty() {
        return Err(TokenError::TokenFormat);
    }
    Ok((header_b64, claims_b64, sig_b64))
}

fn b64e_json<T: Serialize>(value: &T) -> Result<String, TokenError> {
    let json = serde_json::to_vec(value)?;
    Ok(Base64UrlUnpadded::encode_string(&json))
}

fn b64d_json<T: for<'de> Deserialize<'de>>(s: &str) -> Result<T, TokenError> {
    let bytes = Base64UrlUnpadded::decode_vec(s).map_err(|_| TokenError::Base64)?;
    Ok(serde_json::from_slice(&bytes)?)
}

pub(crate) fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| i64::try_from(d.as_secs()).unwrap_or(i64::MAX))
}
