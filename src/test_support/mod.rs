//! Container helpers for tests that need a real PostgreSQL.

pub mod postgres;
pub mod runtime;
