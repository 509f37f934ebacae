//! Credential vault for the Huddle identity store.
//!
//! Derives the symmetric key that encrypts the on-disk database and holds it
//! for the lifetime of the process. Nothing but the current key material is
//! exposed; every database connection reads the same derived key.
//!
//! # Design Principles
//!
//! - **Derive once**: the Argon2id derivation runs a single time at startup
//! - **Zeroize on drop**: key material never outlives the vault
//! - **Stable across restarts**: the salt is persisted next to the database
//!   so the same password always yields the same key

mod error;
mod key;
mod vault;

pub use error::{VaultError, VaultResult};
pub use key::{derive_key, KdfParams, Salt, VaultKey, KEY_SIZE, SALT_SIZE};
pub use vault::CredentialVault;
