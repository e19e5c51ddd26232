//! Password hashing and verification
//!
//! Argon2id with per-hash random salts. Hashing happens exactly where a
//! plaintext password enters the system (register, seed, password change);
//! no other write path touches the hash column.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;

/// Minimum accepted password length.
pub const MIN_PASSWORD_LEN: usize = 8;

#[derive(Debug, thiserror::Error)]
pub enum PasswordError {
    #[error("password hashing failed: {0}")]
    Hash(argon2::password_hash::Error),
}

impl From<argon2::password_hash::Error> for PasswordError {
    fn from(err: argon2::password_hash::Error) -> Self {
        Self::Hash(err)
    }
}

/// Hash a plaintext password with a fresh random salt.
///
/// Two calls with the same input produce different hashes; the salt is
/// embedded in the PHC output string.
pub fn hash_password(plaintext: &str) -> Result<String, PasswordError> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(plaintext.as_bytes(), &salt)?
        .to_string();

    Ok(hash)
}

/// Verify a plaintext password against a stored PHC hash.
///
/// A mismatch is an `Ok(false)`, not an error; only a malformed stored hash
/// errors.
pub fn verify_password(plaintext: &str, stored_hash: &str) -> Result<bool, PasswordError> {
    let parsed = PasswordHash::new(stored_hash)?;

    match Argon2::default().verify_password(plaintext.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(err) => Err(err.into()),
    }
}

/// Length check applied to every new password.
pub fn meets_length_requirement(plaintext: &str) -> bool {
    plaintext.len() >= MIN_PASSWORD_LEN
}
