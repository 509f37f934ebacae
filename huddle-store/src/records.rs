//! Record types owned by the store.
//!
//! Every entity here is owned exclusively by the store; callers get
//! short-lived, request-scoped copies.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Surrogate user identifier (SQLite rowid).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(i64);

impl UserId {
    /// Reserved identity for the configuration-supplied privileged account.
    /// Never collides with store rows, which start at 1.
    pub const ROOT: UserId = UserId(0);

    /// Creates a user id from a raw rowid.
    #[must_use]
    pub const fn from_raw(id: i64) -> Self {
        Self(id)
    }

    /// Returns the raw rowid.
    #[must_use]
    pub const fn as_i64(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Cached second-factor enrollment artifacts, kept so the enrollment dialog
/// can be re-shown without regenerating secret or codes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnrollmentArtifacts {
    /// PNG bytes of the provisioning QR code rendered by the UI.
    pub qr_png: Vec<u8>,
    /// The pending base32 secret.
    pub secret: String,
    /// Backup codes generated alongside the secret.
    pub codes: Vec<String>,
    /// When the bundle was produced (and possibly mailed).
    pub sent_at: DateTime<Utc>,
}

/// A user account.
#[derive(Debug, Clone)]
pub struct User {
    pub id: UserId,
    /// Unique case-insensitively.
    pub email: String,
    /// Argon2 PHC-string hash.
    pub password_hash: String,
    pub name: String,
    pub company: String,
    pub verified: bool,
    /// Present only while email verification is pending.
    pub verification_code: Option<String>,
    /// Present only while the second factor is enabled.
    pub totp_secret: Option<String>,
    /// Remaining single-use backup codes, in issue order.
    pub backup_codes: Option<Vec<String>>,
    pub enrollment: Option<EnrollmentArtifacts>,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Returns true if a second factor is enabled for this account.
    #[must_use]
    pub fn totp_enabled(&self) -> bool {
        self.totp_secret.is_some()
    }
}

/// An authenticated session.
#[derive(Debug, Clone)]
pub struct Session {
    pub user_id: UserId,
    /// Opaque unique token handed to the UI.
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// A pending password-reset token. At most one live token per email.
#[derive(Debug, Clone)]
pub struct ResetToken {
    pub email: String,
    /// Random 6-digit code.
    pub code: String,
    pub expires_at: DateTime<Utc>,
}

/// Trial lifecycle state. `Expired` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrialState {
    Active,
    Expired,
}

impl TrialState {
    pub(crate) fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Expired => "expired",
        }
    }

    pub(crate) fn parse(s: &str) -> Self {
        match s {
            "active" => Self::Active,
            _ => Self::Expired, // fallback
        }
    }
}

/// One trial activation per machine, ever.
#[derive(Debug, Clone)]
pub struct TrialActivation {
    pub machine_id: String,
    pub user_id: Option<UserId>,
    pub activated_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub state: TrialState,
}

/// License tiers offered by the application workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LicenseTier {
    Basic,
    Pro,
    Enterprise,
}

impl LicenseTier {
    pub(crate) fn as_str(&self) -> &'static str {
        match self {
            Self::Basic => "basic",
            Self::Pro => "pro",
            Self::Enterprise => "enterprise",
        }
    }

    pub(crate) fn parse(s: &str) -> Self {
        match s {
            "pro" => Self::Pro,
            "enterprise" => Self::Enterprise,
            _ => Self::Basic, // fallback
        }
    }
}

/// Administrative review status shared by applications and migrations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReviewStatus {
    Pending,
    Approved,
    Rejected,
}

impl ReviewStatus {
    pub(crate) fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }

    pub(crate) fn parse(s: &str) -> Self {
        match s {
            "approved" => Self::Approved,
            "rejected" => Self::Rejected,
            _ => Self::Pending, // fallback
        }
    }
}

/// A user's request for a license of a given tier on a given machine.
#[derive(Debug, Clone)]
pub struct LicenseApplication {
    pub id: i64,
    pub user_id: UserId,
    pub machine_id: String,
    pub tier: LicenseTier,
    pub status: ReviewStatus,
    pub requested_at: DateTime<Utc>,
    /// Migration lineage, set when this application superseded another.
    pub is_migrated: bool,
    pub migrated_to: Option<String>,
    pub migration_reason: Option<String>,
}

/// An issued license bound to one machine.
#[derive(Debug, Clone)]
pub struct ActiveLicense {
    pub id: i64,
    pub license_key: String,
    pub key_hash: String,
    pub machine_id: String,
    pub tier: LicenseTier,
    pub activated_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    pub validation_count: i64,
    pub active: bool,
    /// Back-reference to the originating application, when known.
    pub application_id: Option<i64>,
}

/// Fields needed to insert a new active license.
#[derive(Debug, Clone)]
pub struct NewLicense {
    pub license_key: String,
    pub key_hash: String,
    pub machine_id: String,
    pub tier: LicenseTier,
    pub expires_at: Option<DateTime<Utc>>,
    pub application_id: Option<i64>,
}

/// A request to move a license from one machine to another.
#[derive(Debug, Clone)]
pub struct LicenseMigration {
    pub id: i64,
    pub old_key: String,
    pub old_machine_id: String,
    pub new_machine_id: String,
    pub reason: String,
    pub status: ReviewStatus,
    pub requested_at: DateTime<Utc>,
    /// Set once an approved migration results in a re-issued key.
    pub new_key: Option<String>,
    pub new_application_id: Option<i64>,
}
