//! API handlers for tessera.

pub mod auth;
pub mod health;
