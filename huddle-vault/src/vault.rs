//! The process-wide credential vault.

use crate::error::{VaultError, VaultResult};
use crate::key::{derive_key, KdfParams, Salt, VaultKey, SALT_SIZE};
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// Holds the derived store encryption key for the lifetime of the process.
///
/// Constructed once at startup; the key is derived a single time and shared
/// read-only by every database connection.
#[derive(Clone)]
pub struct CredentialVault {
    key: Arc<VaultKey>,
}

impl CredentialVault {
    /// Opens the vault, loading the salt from `salt_path` or creating it.
    ///
    /// A fresh salt is generated and written exactly once on first run;
    /// subsequent opens with the same password yield identical key material.
    ///
    /// # Errors
    ///
    /// Returns an error if the salt file is unreadable or malformed, or if
    /// key derivation fails.
    pub fn open(salt_path: &Path, password: &str, params: &KdfParams) -> VaultResult<Self> {
        let salt = load_or_create_salt(salt_path)?;
        let key = derive_key(password, &salt, params)?;
        debug!(salt_path = %salt_path.display(), "credential vault opened");
        Ok(Self { key: Arc::new(key) })
    }

    /// Creates a vault from an already-derived key (tests, ephemeral stores).
    #[must_use]
    pub fn from_key(key: VaultKey) -> Self {
        Self { key: Arc::new(key) }
    }

    /// Returns the current key material.
    #[must_use]
    pub fn key(&self) -> &Arc<VaultKey> {
        &self.key
    }
}

fn load_or_create_salt(path: &Path) -> VaultResult<Salt> {
    if path.exists() {
        let bytes = std::fs::read(path)?;
        if bytes.len() != SALT_SIZE {
            return Err(VaultError::InvalidSaltFile {
                expected: SALT_SIZE,
                actual: bytes.len(),
            });
        }
        let mut buf = [0u8; SALT_SIZE];
        buf.copy_from_slice(&bytes);
        Ok(Salt::from_bytes(buf))
    } else {
        let salt = Salt::random();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, salt.as_bytes())?;
        Ok(salt)
    }
}
