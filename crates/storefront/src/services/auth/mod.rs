//! Credential verification and session tokens.
//!
//! Member passwords are stored as `hash(password + salt)`. Legacy rows use
//! bcrypt (`$2a$`, `$2b$`, `$2y$`); newer rows may use argon2 PHC strings
//! (`$argon2id$...`). [`HashPasswordVerifier`] accepts both.

mod error;
pub mod token;

pub use error::{AuthError, TokenError};
pub use token::{JwtTokenIssuer, SessionClaims, TOKEN_TTL, TokenIssuer};

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordVerifier as _},
};

/// Checks a candidate password against a stored hash.
pub trait PasswordVerifier: Send + Sync {
    /// Returns `Ok(false)` on mismatch.
    ///
    /// # Errors
    ///
    /// Returns an error if `hash` cannot be parsed.
    fn verify(&self, password: &str, hash: &str) -> Result<bool, AuthError>;
}

/// Verifier dispatching on the hash prefix (bcrypt or argon2).
#[derive(Debug, Clone, Copy, Default)]
pub struct HashPasswordVerifier;

impl PasswordVerifier for HashPasswordVerifier {
    fn verify(&self, password: &str, hash: &str) -> Result<bool, AuthError> {
        if hash.starts_with("$2") {
            return Ok(bcrypt::verify(password, hash)?);
        }

        if hash.starts_with("$argon2") {
            let parsed = PasswordHash::new(hash).map_err(|e| AuthError::Argon2(e.to_string()))?;
            return Ok(Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok());
        }

        Err(AuthError::UnsupportedHash)
    }
}
