//! The configuration-supplied privileged account.
//!
//! Loaded at startup, never embedded in source. Authentication against it
//! skips the store entirely and compares the secret in constant time.

use subtle::ConstantTimeEq;

/// Environment variable holding the privileged account's email.
pub const ROOT_EMAIL_VAR: &str = "HUDDLE_ROOT_EMAIL";
/// Environment variable holding the privileged account's secret.
pub const ROOT_SECRET_VAR: &str = "HUDDLE_ROOT_SECRET";

/// Descriptor for the privileged account.
#[derive(Clone)]
pub struct RootAccount {
    email: String,
    secret: String,
}

impl RootAccount {
    /// Creates a descriptor from explicit values.
    #[must_use]
    pub fn new(email: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            secret: secret.into(),
        }
    }

    /// Loads the descriptor from the environment. Returns `None` when either
    /// variable is unset; the deployment then simply has no root account.
    #[must_use]
    pub fn from_env() -> Option<Self> {
        let email = std::env::var(ROOT_EMAIL_VAR).ok()?;
        let secret = std::env::var(ROOT_SECRET_VAR).ok()?;
        Some(Self::new(email, secret))
    }

    /// Returns the account email.
    #[must_use]
    pub fn email(&self) -> &str {
        &self.email
    }

    /// Case-insensitive email match.
    #[must_use]
    pub fn matches_email(&self, email: &str) -> bool {
        self.email.eq_ignore_ascii_case(email)
    }

    /// Byte-for-byte secret comparison in constant time.
    #[must_use]
    pub fn verify_secret(&self, candidate: &str) -> bool {
        self.secret.as_bytes().ct_eq(candidate.as_bytes()).into()
    }
}

impl std::fmt::Debug for RootAccount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RootAccount")
            .field("email", &self.email)
            .field("secret", &"[REDACTED]")
            .finish()
    }
}
