//! The store handle and its connection discipline.

use crate::error::{StoreError, StoreResult};
use crate::schema;
use chrono::{DateTime, SecondsFormat, Utc};
use huddle_vault::VaultKey;
use rusqlite::Connection;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Handle to the encrypted identity and entitlement database.
///
/// The handle is cheap to clone and safe to share across threads: it holds
/// only the database path and the key material. Every operation opens its own
/// connection, performs one transactional unit of work, and drops the
/// connection — no handle is held across a suspension point. Construct it
/// once at startup and inject it into the services that need it.
#[derive(Clone)]
pub struct Store {
    path: PathBuf,
    key: Arc<VaultKey>,
}

impl Store {
    /// Opens (or creates) the store, configuring encryption and applying
    /// schema migrations. Idempotent: re-opening an existing database only
    /// applies whatever additive migrations are still missing.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened with the given key or a
    /// migration fails. Migrations never leave the schema half-applied; each
    /// added column commits in its own transaction.
    pub fn open(path: impl AsRef<Path>, key: Arc<VaultKey>) -> StoreResult<Self> {
        let store = Self {
            path: path.as_ref().to_path_buf(),
            key,
        };
        let mut conn = store.connect()?;
        schema::init_schema(&mut conn)?;
        debug!(path = %store.path.display(), "store opened");
        Ok(store)
    }

    /// Opens a connection with encryption and pragmas configured.
    ///
    /// The SQLCipher key pragma must be the first statement on the
    /// connection; everything else fails with "file is not a database"
    /// otherwise.
    pub(crate) fn connect(&self) -> StoreResult<Connection> {
        let conn = Connection::open(&self.path)
            .map_err(|e| StoreError::Storage(format!("failed to open database: {e}")))?;
        conn.pragma_update(None, "key", self.key.to_sqlcipher_literal())
            .map_err(|e| StoreError::Storage(format!("failed to apply key: {e}")))?;
        conn.busy_timeout(Duration::from_secs(5))
            .map_err(|e| StoreError::Storage(format!("failed to set busy timeout: {e}")))?;
        conn.pragma_update(None, "foreign_keys", "ON")
            .map_err(|e| StoreError::Storage(format!("failed to enable foreign keys: {e}")))?;
        Ok(conn)
    }
}

/// Formats a timestamp for storage. One fixed format so that string
/// comparison in SQL agrees with chronological order.
pub(crate) fn fmt_ts(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Parses a stored timestamp.
pub(crate) fn parse_ts(s: &str) -> StoreResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StoreError::Storage(format!("invalid stored timestamp {s:?}: {e}")))
}
