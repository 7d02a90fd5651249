//! Authentication error types.

use thiserror::Error;

/// Errors that can occur while checking credentials or handling tokens.
#[derive(Debug, Error)]
pub enum AuthError {
    /// The stored credential is not a hash format we understand.
    #[error("unsupported password hash format")]
    UnsupportedHash,

    /// The stored bcrypt hash is malformed.
    #[error("bcrypt error: {0}")]
    Bcrypt(#[from] bcrypt::BcryptError),

    /// The stored argon2 hash is malformed.
    #[error("argon2 hash error: {0}")]
    Argon2(String),
}

/// Errors from signing or verifying session tokens.
#[derive(Debug, Error)]
pub enum TokenError {
    /// The token's `exp` is in the past.
    #[error("token expired")]
    Expired,

    /// Signature, structure or claims are invalid.
    #[error("invalid token: {0}")]
    Invalid(String),

    /// Signing failed.
    #[error("token signing failed: {0}")]
    Signing(String),
}
