//! Password hashing collaborator.
//!
//! Hashes are PHC strings so parameters and salt travel with the hash and
//! `compare` needs nothing else.

use anyhow::{anyhow, Result};
use argon2::{
    password_hash::SaltString, Algorithm, Argon2, Params, PasswordHash,
    PasswordHasher as _, PasswordVerifier, Version,
};
use rand::rngs::OsRng;

pub trait PasswordHasher: Send + Sync {
    /// Fresh random salt, encoded for `hash`.
    fn salt(&self) -> String;

    /// # Errors
    /// Returns an error if the salt is malformed or hashing fails.
    fn hash(&self, password: &str, salt: &str) -> Result<String>;

    /// `Ok(false)` on mismatch; errors only for a malformed stored hash.
    ///
    /// # Errors
    /// Returns an error if `hash` is not a valid PHC string.
    fn compare(&self, password: &str, hash: &str) -> Result<bool>;
}

/// Argon2id with configurable cost.
#[derive(Clone, Debug)]
pub struct Argon2Hasher {
    params: Params,
}

impl Default for Argon2Hasher {
    fn default() -> Self {
        Self {
            params: Params::default(),
        }
    }
}

impl Argon2Hasher {
    /// Custom memory (KiB), iteration and parallelism costs.
    ///
    /// # Errors
    /// Returns an error if argon2 rejects the parameters.
    pub fn with_params(m_cost: u32, t_cost: u32, p_cost: u32) -> Result<Self> {
        let params = Params::new(m_cost, t_cost, p_cost, None)
            .map_err(|err| anyhow!("invalid Argon2 parameters: {err}"))?;
        Ok(Self { params })
    }

    fn argon2(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }
}

impl PasswordHasher for Argon2Hasher {
    fn salt(&self) -> String {
        SaltString::generate(&mut OsRng).as_str().to_string()
    }

    fn hash(&self, password: &str, salt: &str) -> Result<String> {
        let salt = SaltString::from_b64(salt).map_err(|err| anyhow!("invalid salt: {err}"))?;
        let hash = self
            .argon2()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|err| anyhow!("failed to hash password: {err}"))?;
        Ok(hash.to_string())
    }

    fn compare(&self, password: &str, hash: &str) -> Result<bool> {
        let parsed =
            PasswordHash::new(hash).map_err(|err| anyhow!("invalid password hash: {err}"))?;
        // Parameters come from the PHC string, not from `self`.
        Ok(self
            .argon2()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok())
    }
}
