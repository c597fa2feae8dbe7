//! Password hashing and credential verification.
//!
//! The hasher is injected wherever credentials are checked so tests can use
//! a cheaper cost factor. Verification is a pure comparison: a mismatch is
//! an ordinary `false`, never an error.

use bcrypt::{DEFAULT_COST, hash, verify};

/// Hashing and checking of user passwords.
pub trait PasswordHasher: Send + Sync {
    /// Hashes a plaintext password for storage.
    fn hash(&self, password: &str) -> anyhow::Result<String>;

    /// Checks a presented password against a stored hash.
    ///
    /// Returns `false` for a mismatch and for a stored hash that cannot be
    /// parsed; bcrypt's comparison is resistant to timing side-channels.
    fn verify(&self, password: &str, stored_hash: &str) -> bool;
}

/// bcrypt-backed implementation.
pub struct BcryptPasswordHasher {
    cost: u32,
}

impl BcryptPasswordHasher {
    pub fn new(cost: u32) -> Self {
        Self { cost }
    }
}

impl Default for BcryptPasswordHasher {
    fn default() -> Self {
        Self { cost: DEFAULT_COST }
    }
}

impl PasswordHasher for BcryptPasswordHasher {
    fn hash(&self, password: &str) -> anyhow::Result<String> {
        Ok(hash(password, self.cost)?)
    }

    fn verify(&self, password: &str, stored_hash: &str) -> bool {
        match verify(password, stored_hash) {
            Ok(matches) => matches,
            Err(err) => {
                tracing::warn!("stored password hash could not be checked: {}", err);
                false
            }
        }
    }
}
