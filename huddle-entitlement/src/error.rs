//! Error types for the entitlement service.

use thiserror::Error;

/// Result type for entitlement operations.
pub type EntitlementResult<T> = Result<T, EntitlementError>;

/// Errors that can occur in entitlement flows. Expected rejections (trial
/// already active, trial expired) are encoded in the outcome types instead.
#[derive(Debug, Error)]
pub enum EntitlementError {
    /// The underlying store failed.
    #[error(transparent)]
    Store(#[from] huddle_store::StoreError),
}
