//! Error types for the credential vault.

use thiserror::Error;

/// Result type for vault operations.
pub type VaultResult<T> = Result<T, VaultError>;

/// Errors that can occur while deriving or loading key material.
#[derive(Debug, Error)]
pub enum VaultError {
    /// Key derivation failed.
    #[error("key derivation failed: {0}")]
    KeyDerivation(String),

    /// Reading or writing the salt file failed.
    #[error("salt file I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// The salt file exists but does not hold exactly SALT_SIZE bytes.
    #[error("salt file is malformed (expected {expected} bytes, got {actual})")]
    InvalidSaltFile { expected: usize, actual: usize },
}
