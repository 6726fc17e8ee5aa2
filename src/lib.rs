//! # Tessera (token session authentication)
//!
//! `tessera` authenticates users and keeps them signed in with a pair of
//! signed tokens: a short-lived access token and a long-lived refresh token.
//!
//! ## Signing keys
//!
//! Every token is signed with `HMAC-SHA256` keyed by the server secret
//! concatenated with a random secret stored on the user record. Leaking the
//! server secret alone is not enough to forge tokens, and rotating one user's
//! secret revokes every token that user holds without touching anyone else.
//!
//! ## Refresh sessions
//!
//! A user has at most one live refresh session. Sign-in, sign-up and refresh
//! replace it in a single atomic upsert; sign-out deletes it. A refresh token
//! is accepted only when it is both the stored token for its user and
//! cryptographically valid, so a rotated or revoked token stops working even
//! before it expires.
//!
//! ## Request authentication
//!
//! Protected routes run the authentication pipeline first. Missing tokens,
//! unknown users, bad signatures and expired tokens all produce the same
//! `401 Unauthorized` so callers cannot tell which check failed.

pub mod api;
pub mod cli;

#[cfg(test)]
pub(crate) mod test_support;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};
