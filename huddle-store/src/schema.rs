//! Schema creation and additive migrations.
//!
//! `init_schema` is idempotent: the base tables are created with
//! `IF NOT EXISTS`, then columns added in later releases are detected by
//! introspecting `PRAGMA table_info` and applied with `ALTER TABLE … ADD
//! COLUMN`, one transaction per column. Migrations are never destructive and
//! tolerate re-entry at any point.

use crate::error::{StoreError, StoreResult};
use rusqlite::Connection;
use std::collections::HashSet;
use tracing::{debug, info};

/// Base schema. Columns introduced after the first release live in
/// [`ADDITIVE_COLUMNS`] instead so that fresh and upgraded databases converge
/// on the same shape.
const BASE_SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS users (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        email TEXT NOT NULL,
        password_hash TEXT NOT NULL,
        name TEXT NOT NULL,
        company TEXT NOT NULL,
        verified INTEGER NOT NULL DEFAULT 0,
        verification_code TEXT,
        totp_secret TEXT,
        backup_codes TEXT,
        created_at TEXT NOT NULL
    );
    CREATE UNIQUE INDEX IF NOT EXISTS idx_users_email ON users (lower(email));

    CREATE TABLE IF NOT EXISTS sessions (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id INTEGER NOT NULL REFERENCES users(id),
        token TEXT NOT NULL UNIQUE,
        expires_at TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS reset_tokens (
        email TEXT PRIMARY KEY,
        code TEXT NOT NULL,
        expires_at TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS trial_activations (
        machine_id TEXT PRIMARY KEY,
        user_id INTEGER,
        activated_at TEXT NOT NULL,
        expires_at TEXT NOT NULL,
        state TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS license_applications (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id INTEGER NOT NULL,
        machine_id TEXT NOT NULL,
        tier TEXT NOT NULL,
        status TEXT NOT NULL DEFAULT 'pending',
        requested_at TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS active_licenses (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        license_key TEXT NOT NULL UNIQUE,
        key_hash TEXT NOT NULL,
        machine_id TEXT NOT NULL,
        tier TEXT NOT NULL,
        activated_at TEXT NOT NULL,
        expires_at TEXT,
        validation_count INTEGER NOT NULL DEFAULT 0,
        active INTEGER NOT NULL DEFAULT 1
    );

    CREATE TABLE IF NOT EXISTS license_migrations (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        old_key TEXT NOT NULL,
        old_machine_id TEXT NOT NULL,
        new_machine_id TEXT NOT NULL,
        reason TEXT NOT NULL,
        status TEXT NOT NULL DEFAULT 'pending',
        requested_at TEXT NOT NULL
    );
";

/// Columns added after the base schema shipped: (table, column, type).
const ADDITIVE_COLUMNS: &[(&str, &str, &str)] = &[
    ("users", "enrollment_qr", "BLOB"),
    ("users", "enrollment_secret", "TEXT"),
    ("users", "enrollment_codes", "TEXT"),
    ("users", "enrollment_sent_at", "TEXT"),
    ("license_applications", "is_migrated", "INTEGER NOT NULL DEFAULT 0"),
    ("license_applications", "migrated_to", "TEXT"),
    ("license_applications", "migration_reason", "TEXT"),
    ("active_licenses", "application_id", "INTEGER"),
    ("license_migrations", "new_key", "TEXT"),
    ("license_migrations", "new_application_id", "INTEGER"),
];

/// Creates missing tables and applies additive column migrations.
pub(crate) fn init_schema(conn: &mut Connection) -> StoreResult<()> {
    conn.execute_batch(BASE_SCHEMA)
        .map_err(|e| StoreError::Storage(format!("failed to create base schema: {e}")))?;

    for (table, column, col_type) in ADDITIVE_COLUMNS {
        let existing = table_columns(conn, table)?;
        if existing.contains(*column) {
            continue;
        }
        let tx = conn
            .transaction()
            .map_err(|e| StoreError::Storage(format!("failed to begin migration: {e}")))?;
        tx.execute_batch(&format!("ALTER TABLE {table} ADD COLUMN {column} {col_type}"))
            .map_err(|e| {
                StoreError::Storage(format!("failed to add {table}.{column}: {e}"))
            })?;
        tx.commit()
            .map_err(|e| StoreError::Storage(format!("failed to commit migration: {e}")))?;
        info!(table, column, "applied additive migration");
    }

    debug!("schema initialized");
    Ok(())
}

/// Returns the set of column names currently present on `table`.
///
/// `table` must be one of the fixed names in this module; `PRAGMA table_info`
/// cannot be parameterized.
fn table_columns(conn: &Connection, table: &str) -> StoreResult<HashSet<String>> {
    let mut stmt = conn
        .prepare(&format!("PRAGMA table_info({table})"))
        .map_err(|e| StoreError::Storage(format!("failed to introspect {table}: {e}")))?;
    let names = stmt
        .query_map([], |row| row.get::<_, String>(1))
        .map_err(|e| StoreError::Storage(format!("failed to introspect {table}: {e}")))?;

    let mut columns = HashSet::new();
    for name in names {
        columns
            .insert(name.map_err(|e| StoreError::Storage(format!("failed to read column: {e}")))?);
    }
    Ok(columns)
}
