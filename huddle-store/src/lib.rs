//! Encrypted identity and entitlement store for Huddle.
//!
//! One SQLCipher-encrypted SQLite file holds users, sessions, reset tokens,
//! second-factor material, and the trial/license entitlement records. The
//! store owns every entity; higher layers get request-scoped copies and
//! mutate only through the operations here.
//!
//! # Architecture
//!
//! - [`Store`] is a cheap cloneable handle (path + key material); every
//!   operation opens its own connection and commits one unit of work
//! - Uniqueness violations surface as [`StoreError::AlreadyExists`], never as
//!   a generic failure
//! - Schema evolution is additive-only: missing columns are detected by
//!   introspection at open and added inside per-column transactions

mod entitlements;
mod error;
mod records;
mod schema;
mod store;
mod tokens;
mod users;

pub use error::{StoreError, StoreResult};
pub use records::{
    ActiveLicense, EnrollmentArtifacts, LicenseApplication, LicenseMigration, LicenseTier,
    NewLicense, ResetToken, ReviewStatus, Session, TrialActivation, TrialState, User, UserId,
};
pub use store::Store;
pub use tokens::RESET_TOKEN_TTL_MINUTES;
