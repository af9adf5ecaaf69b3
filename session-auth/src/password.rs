//! Password hashing.
//!
//! Hashes are Argon2id PHC strings with a random salt, so hashing the same
//! password twice gives two different strings that both verify.

/// Hashes a password with a freshly generated salt.
pub fn hash_password(password: &str) -> String {
    password_auth::generate_hash(password)
}

/// Returns `true` when `password` matches `hash`.
///
/// A malformed hash never matches.
pub fn verify_password(password: &str, hash: &str) -> bool {
    match password_auth::verify_password(password, hash) {
        Ok(()) => true,
        Err(password_auth::VerifyError::PasswordInvalid) => false,
        Err(err) => {
            tracing::warn!(err = %err, "stored password hash could not be parsed");
            false
        }
    }
}
