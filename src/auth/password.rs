//! Password hashing and verification using Argon2
//!
//! Argon2id with default parameters; hashes are stored as PHC strings
//! carrying their own salt.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};

use crate::types::VaultError;

/// Hash a password, returning the PHC-formatted string.
pub fn hash_password(password: &str) -> Result<String, VaultError> {
    let salt = SaltString::generate(&mut OsRng);

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| VaultError::Auth(format!("failed to hash password: {e}")))
}

/// Check a password against a stored hash.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, VaultError> {
    let parsed = PasswordHash::new(hash)
        .map_err(|e| VaultError::Auth(format!("invalid password hash format: {e}")))?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}
