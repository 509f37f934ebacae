//! Entitlement service for Huddle.
//!
//! Manages the trial lifecycle (one 30-day trial per machine, ever), license
//! application submission, and active-license bookkeeping. Each flow is a
//! small state machine persisted in [`huddle_store`].
//!
//! Cryptographic validation of license keys is an external collaborator
//! behind the [`LicenseActivator`] contract; nothing here guesses at the key
//! format.

mod error;
mod licensing;
mod machine;
mod trial;

pub use error::{EntitlementError, EntitlementResult};
pub use licensing::{mask_key, EntitlementService, LicenseActivator, LicenseSummary};
pub use machine::machine_fingerprint;
pub use trial::{TrialOutcome, TrialStatus, TRIAL_DAYS};
