//! Error types for the authentication service.

use thiserror::Error;

/// Result type for authentication operations.
pub type AuthResult<T> = Result<T, AuthError>;

/// Errors that can occur during authentication flows.
///
/// Expected outcomes (wrong password, unknown user, bad code) are encoded in
/// the success value, never here; these variants are for genuine failures.
#[derive(Debug, Error)]
pub enum AuthError {
    /// The underlying store failed.
    #[error(transparent)]
    Store(#[from] huddle_store::StoreError),

    /// Password hashing failed.
    #[error("password hashing failed: {0}")]
    Hash(String),
}
