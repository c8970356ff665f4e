//! Credential hashing primitive.
//!
//! Passwords are stored as argon2id PHC strings; the rest of the crate treats
//! the hash as opaque and only calls these two functions.

use anyhow::{anyhow, Result};
use argon2::{
    password_hash::SaltString, Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
};
use rand::rngs::OsRng;

/// Hash a raw password into a PHC string for storage.
pub(crate) fn hash_password(raw: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(raw.as_bytes(), &salt)
        .map_err(|err| anyhow!("failed to hash password: {err}"))?;
    Ok(hash.to_string())
}

/// Compare a raw password against a stored PHC string.
pub(crate) fn verify_password(raw: &str, stored: &str) -> bool {
    PasswordHash::new(stored)
        .map(|hash| {
            Argon2::default()
                .verify_password(raw.as_bytes(), &hash)
                .is_ok()
        })
        .unwrap_or(false)
}
