//! Second-factor (TOTP) service for Huddle.
//!
//! Implements RFC 6238 time-based one-time passwords with single-use backup
//! codes. Per-user state is a small machine: `disabled` →
//! `pending-enrollment` (cached artifacts, no secret persisted) → `enabled`
//! (secret and codes persisted), with `enabled` → `disabled` as the only
//! other transition.

mod codes;
mod error;
mod service;
mod totp;

pub use codes::{generate_backup_codes, generate_secret, provisioning_uri, BACKUP_CODE_LEN};
pub use error::{TwoFactorError, TwoFactorResult};
pub use service::TwoFactorService;
pub use totp::{verify_token, verify_token_at, token_at, TOTP_DIGITS, TOTP_STEP_SECS};
