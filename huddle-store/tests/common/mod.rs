//! Shared test helpers for store tests.

#![allow(dead_code)]

use huddle_store::Store;
use huddle_vault::{VaultKey, KEY_SIZE};
use std::sync::Arc;
use tempfile::TempDir;

/// Fixed key so tests never pay for Argon2 derivation.
pub fn test_key() -> Arc<VaultKey> {
    Arc::new(VaultKey::from_bytes([0x11; KEY_SIZE]))
}

/// Opens an encrypted store in a fresh temp directory. The directory guard
/// must be kept alive for the duration of the test.
pub fn open_store() -> (TempDir, Store) {
    let dir = TempDir::new().unwrap();
    let store = Store::open(dir.path().join("huddle.db"), test_key()).unwrap();
    (dir, store)
}
