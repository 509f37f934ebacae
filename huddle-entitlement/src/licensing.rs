//! License applications, migration requests, and license listings.

use crate::error::EntitlementResult;
use chrono::{DateTime, Utc};
use huddle_store::{LicenseTier, Store, UserId};
use tracing::info;

/// Contract for the external component that cryptographically activates a
/// license key against a machine. Returns whether activation succeeded and a
/// message for the UI.
pub trait LicenseActivator: Send + Sync {
    fn activate(&self, key: &str, machine_id: &str) -> (bool, String);
}

/// A license row shaped for display: the raw key never leaves the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LicenseSummary {
    pub masked_key: String,
    pub tier: LicenseTier,
    pub machine_id: String,
    pub activated_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    pub validation_count: i64,
    pub active: bool,
}

/// Masks a license key for display: first 8 characters, then an ellipsis.
#[must_use]
pub fn mask_key(key: &str) -> String {
    let prefix: String = key.chars().take(8).collect();
    if key.chars().count() > 8 {
        format!("{prefix}…")
    } else {
        prefix
    }
}

/// Entitlement flows over the persistent store. Trial operations live in the
/// trial module; this file covers applications, migrations, and listings.
#[derive(Clone)]
pub struct EntitlementService {
    store: Store,
}

impl EntitlementService {
    #[must_use]
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    pub(crate) fn store(&self) -> &Store {
        &self.store
    }

    /// Submits a license application. Review is administrative and happens
    /// out of band; this only records the pending request.
    pub fn create_application(
        &self,
        user_id: UserId,
        machine_id: &str,
        tier: LicenseTier,
    ) -> EntitlementResult<i64> {
        let id = self.store.insert_application(user_id, machine_id, tier)?;
        info!(application_id = id, ?tier, "license application submitted");
        Ok(id)
    }

    /// Requests moving a license from one machine to another. Approval is
    /// administrative; this only records the pending request.
    pub fn request_migration(
        &self,
        old_key: &str,
        old_machine_id: &str,
        new_machine_id: &str,
        reason: &str,
    ) -> EntitlementResult<i64> {
        let id = self
            .store
            .insert_migration(old_key, old_machine_id, new_machine_id, reason)?;
        info!(
            migration_id = id,
            masked_key = %mask_key(old_key),
            "license migration requested"
        );
        Ok(id)
    }

    /// Lists a user's licenses with masked keys, newest first.
    pub fn list_licenses(&self, user_id: UserId) -> EntitlementResult<Vec<LicenseSummary>> {
        let licenses = self.store.licenses_for_user(user_id)?;
        Ok(licenses
            .into_iter()
            .map(|l| LicenseSummary {
                masked_key: mask_key(&l.license_key),
                tier: l.tier,
                machine_id: l.machine_id,
                activated_at: l.activated_at,
                expires_at: l.expires_at,
                validation_count: l.validation_count,
                active: l.active,
            })
            .collect())
    }
}
