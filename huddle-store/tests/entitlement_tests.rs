mod common;

use chrono::{Duration, Utc};
use common::open_store;
use huddle_store::{LicenseTier, NewLicense, ReviewStatus, StoreError, TrialState};
use pretty_assertions::assert_eq;

// ── Trials ───────────────────────────────────────────────────────

#[test]
fn trial_roundtrip() {
    let (_dir, store) = open_store();
    let now = Utc::now();
    store
        .insert_trial("machine-1", None, now, now + Duration::days(30))
        .unwrap();

    let trial = store.trial("machine-1").unwrap().unwrap();
    assert_eq!(trial.state, TrialState::Active);
    assert!(trial.user_id.is_none());
    assert_eq!(trial.expires_at - trial.activated_at, Duration::days(30));
}

#[test]
fn one_trial_per_machine() {
    let (_dir, store) = open_store();
    let now = Utc::now();
    store
        .insert_trial("machine-1", None, now, now + Duration::days(30))
        .unwrap();
    let err = store
        .insert_trial("machine-1", None, now, now + Duration::days(30))
        .unwrap_err();
    assert!(matches!(err, StoreError::AlreadyExists("trial activation")));
}

#[test]
fn trial_state_transition_keeps_expiry() {
    let (_dir, store) = open_store();
    let now = Utc::now();
    store
        .insert_trial("machine-1", None, now, now + Duration::days(30))
        .unwrap();
    let before = store.trial("machine-1").unwrap().unwrap();

    store.set_trial_state("machine-1", TrialState::Expired).unwrap();
    let after = store.trial("machine-1").unwrap().unwrap();
    assert_eq!(after.state, TrialState::Expired);
    assert_eq!(after.expires_at, before.expires_at);
}

#[test]
fn unknown_machine_has_no_trial() {
    let (_dir, store) = open_store();
    assert!(store.trial("machine-x").unwrap().is_none());
    assert!(matches!(
        store.set_trial_state("machine-x", TrialState::Expired),
        Err(StoreError::NotFound(_))
    ));
}

// ── Applications ─────────────────────────────────────────────────

#[test]
fn application_starts_pending() {
    let (_dir, store) = open_store();
    let user = store
        .create_user("ann@example.com", "h", "Ann", "Acme", "111111")
        .unwrap();

    let id = store
        .insert_application(user, "machine-1", LicenseTier::Pro)
        .unwrap();
    assert!(id > 0);

    let apps = store.applications_for_user(user).unwrap();
    assert_eq!(apps.len(), 1);
    assert_eq!(apps[0].status, ReviewStatus::Pending);
    assert_eq!(apps[0].tier, LicenseTier::Pro);
    assert!(!apps[0].is_migrated);
}

#[test]
fn migration_lineage_recorded_on_application() {
    let (_dir, store) = open_store();
    let user = store
        .create_user("ann@example.com", "h", "Ann", "Acme", "111111")
        .unwrap();
    let id = store
        .insert_application(user, "machine-1", LicenseTier::Basic)
        .unwrap();

    store
        .mark_application_migrated(id, "machine-2", "laptop replaced")
        .unwrap();
    let app = &store.applications_for_user(user).unwrap()[0];
    assert!(app.is_migrated);
    assert_eq!(app.migrated_to.as_deref(), Some("machine-2"));
    assert_eq!(app.migration_reason.as_deref(), Some("laptop replaced"));
}

// ── Active licenses ──────────────────────────────────────────────

fn sample_license(app_id: Option<i64>) -> NewLicense {
    NewLicense {
        license_key: "HUD-PRO-1234-5678-9ABC".to_string(),
        key_hash: "deadbeef".to_string(),
        machine_id: "machine-1".to_string(),
        tier: LicenseTier::Pro,
        expires_at: Some(Utc::now() + Duration::days(365)),
        application_id: app_id,
    }
}

#[test]
fn duplicate_license_key_rejected() {
    let (_dir, store) = open_store();
    store.insert_license(&sample_license(None)).unwrap();
    let err = store.insert_license(&sample_license(None)).unwrap_err();
    assert!(matches!(err, StoreError::AlreadyExists("license")));
}

#[test]
fn licenses_listed_via_application_backref() {
    let (_dir, store) = open_store();
    let user = store
        .create_user("ann@example.com", "h", "Ann", "Acme", "111111")
        .unwrap();
    let app_id = store
        .insert_application(user, "machine-1", LicenseTier::Pro)
        .unwrap();
    store.insert_license(&sample_license(Some(app_id))).unwrap();

    let licenses = store.licenses_for_user(user).unwrap();
    assert_eq!(licenses.len(), 1);
    assert_eq!(licenses[0].license_key, "HUD-PRO-1234-5678-9ABC");
    assert_eq!(licenses[0].validation_count, 0);
    assert!(licenses[0].active);

    // A license with no back-reference belongs to nobody's listing.
    let other = store.create_user("bob@example.com", "h", "Bob", "Acme", "1").unwrap();
    assert!(store.licenses_for_user(other).unwrap().is_empty());
}

#[test]
fn validation_counter_increments() {
    let (_dir, store) = open_store();
    let user = store
        .create_user("ann@example.com", "h", "Ann", "Acme", "111111")
        .unwrap();
    let app_id = store
        .insert_application(user, "machine-1", LicenseTier::Pro)
        .unwrap();
    store.insert_license(&sample_license(Some(app_id))).unwrap();

    store.record_validation("HUD-PRO-1234-5678-9ABC").unwrap();
    store.record_validation("HUD-PRO-1234-5678-9ABC").unwrap();
    assert_eq!(store.licenses_for_user(user).unwrap()[0].validation_count, 2);

    assert!(matches!(
        store.record_validation("NO-SUCH-KEY"),
        Err(StoreError::NotFound(_))
    ));
}

// ── Migrations ───────────────────────────────────────────────────

#[test]
fn migration_lifecycle() {
    let (_dir, store) = open_store();
    let id = store
        .insert_migration("HUD-PRO-1234", "machine-1", "machine-2", "new laptop")
        .unwrap();

    let m = store.migration(id).unwrap().unwrap();
    assert_eq!(m.status, ReviewStatus::Pending);
    assert!(m.new_key.is_none());

    store
        .set_migration_outcome(id, ReviewStatus::Approved, Some("HUD-PRO-9999"), Some(42))
        .unwrap();
    let m = store.migration(id).unwrap().unwrap();
    assert_eq!(m.status, ReviewStatus::Approved);
    assert_eq!(m.new_key.as_deref(), Some("HUD-PRO-9999"));
    assert_eq!(m.new_application_id, Some(42));
}

#[test]
fn unknown_migration_is_none() {
    let (_dir, store) = open_store();
    assert!(store.migration(999).unwrap().is_none());
}
