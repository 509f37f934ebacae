//! Authentication service for Huddle.
//!
//! Resolves (email, password) pairs to authenticated identities, handles
//! registration, email verification, and the password-reset flow. One
//! configuration-supplied privileged account bypasses the store entirely;
//! every other identity lives in [`huddle_store`].
//!
//! Side effects are confined to the store and the injected mail transport;
//! nothing here does other I/O.

mod error;
mod password;
mod root;
mod service;

pub use error::{AuthError, AuthResult};
pub use password::{hash_password, verify_password};
pub use root::RootAccount;
pub use service::{AuthService, Identity};
