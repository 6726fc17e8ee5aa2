//! Auth handlers and supporting modules.
//!
//! ## Token keys
//!
//! Access and refresh tokens are `HS256` JWS strings keyed by the server
//! secret followed by the user's own random secret. A token minted for one
//! user never verifies under another user's key.
//!
//! ## Refresh rotation
//!
//! Each user has at most one stored refresh token. Every sign-in, sign-up and
//! refresh replaces it with a single upsert, so the previous token stops
//! working the moment a new one is issued. Sign-out deletes it.
//!
//! > **Warning:** Changing the server secret invalidates every outstanding token.

pub(crate) mod codec;
pub(crate) mod credentials;
mod error;
pub(crate) mod hashing;
pub(crate) mod pipeline;
pub(crate) mod postgres;
pub(crate) mod registry;
pub(crate) mod service;
pub(crate) mod session;
mod state;
pub(crate) mod storage;
pub(crate) mod types;
mod utils;

pub use error::AuthError;
pub use hashing::{Argon2Hasher, PasswordHasher};
pub use pipeline::{guard, Identity};
pub use postgres::PgStore;
pub use state::{AuthConfig, AuthState};
pub use storage::{MemoryStore, RefreshSessionRepository, UserRepository};
