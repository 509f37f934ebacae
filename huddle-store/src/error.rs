//! Error types for the persistent store.

use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur in store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A uniqueness constraint was violated (duplicate email, license key, …).
    #[error("{0} already exists")]
    AlreadyExists(&'static str),

    /// The referenced row does not exist.
    #[error("{0} not found")]
    NotFound(&'static str),

    /// Database I/O or encryption failure.
    #[error("storage error: {0}")]
    Storage(String),

    /// JSON-in-column (de)serialization failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Maps an insert error, surfacing unique-constraint violations as
/// [`StoreError::AlreadyExists`] for the given entity name. Other constraint
/// failures (NOT NULL, CHECK, foreign key) stay storage errors.
pub(crate) fn map_insert_err(entity: &'static str, e: rusqlite::Error) -> StoreError {
    if let rusqlite::Error::SqliteFailure(f, _) = &e {
        if f.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
            || f.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY
        {
            return StoreError::AlreadyExists(entity);
        }
    }
    StoreError::Storage(format!("failed to insert {entity}: {e}"))
}
