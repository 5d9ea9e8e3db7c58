use crate::error::ServerError;
use argon2::password_hash::SaltString;
use argon2::password_hash::rand_core::OsRng;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use log::warn;

/// Hashes `password` into a PHC string with a fresh random salt.
pub fn hash_password(hasher: &Argon2<'_>, password: &str) -> Result<String, ServerError> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = hasher.hash_password(password.as_bytes(), &salt)?;
    Ok(hash.to_string())
}

/// Checks `candidate` against a stored PHC hash. Unreadable hashes never match.
pub fn verify_password(hasher: &Argon2<'_>, candidate: &str, stored_hash: &str) -> bool {
    let parsed_hash = match PasswordHash::new(stored_hash) {
        Ok(hash) => hash,
        Err(err) => {
            warn!("failed to parse stored password hash: {}", err);
            return false;
        }
    };

    hasher
        .verify_password(candidate.as_bytes(), &parsed_hash)
        .is_ok()
}
