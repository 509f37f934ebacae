//! Error types for the second-factor service.

use thiserror::Error;

/// Result type for second-factor operations.
pub type TwoFactorResult<T> = Result<T, TwoFactorError>;

/// Errors that can occur in second-factor flows. Verification misses are
/// encoded as `false` in the success value, not here.
#[derive(Debug, Error)]
pub enum TwoFactorError {
    /// The underlying store failed.
    #[error(transparent)]
    Store(#[from] huddle_store::StoreError),

    /// Backup-code delivery failed.
    #[error("backup code delivery to {0} failed")]
    Delivery(String),
}
