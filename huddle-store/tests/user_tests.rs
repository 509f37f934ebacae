mod common;

use chrono::Utc;
use common::open_store;
use huddle_store::{EnrollmentArtifacts, StoreError};
use pretty_assertions::assert_eq;

// ── Creation & lookup ────────────────────────────────────────────

#[test]
fn created_user_is_unverified() {
    let (_dir, store) = open_store();
    store
        .create_user("ann@example.com", "hash", "Ann", "Acme", "111111")
        .unwrap();

    let user = store.user_by_email("ann@example.com").unwrap().unwrap();
    assert!(!user.verified);
    assert_eq!(user.verification_code.as_deref(), Some("111111"));
    assert_eq!(user.company, "Acme");
    assert!(user.totp_secret.is_none());
    assert!(user.backup_codes.is_none());
}

#[test]
fn duplicate_email_rejected() {
    let (_dir, store) = open_store();
    store
        .create_user("ann@example.com", "h1", "Ann", "Acme", "111111")
        .unwrap();
    let err = store
        .create_user("ann@example.com", "h2", "Other", "Corp", "222222")
        .unwrap_err();
    assert!(matches!(err, StoreError::AlreadyExists("user")));
}

#[test]
fn duplicate_email_rejected_case_insensitively() {
    let (_dir, store) = open_store();
    store
        .create_user("Ann@Example.com", "h1", "Ann", "Acme", "111111")
        .unwrap();
    let err = store
        .create_user("ann@example.COM", "h2", "Other", "Corp", "222222")
        .unwrap_err();
    assert!(matches!(err, StoreError::AlreadyExists("user")));
}

#[test]
fn lookup_is_case_insensitive() {
    let (_dir, store) = open_store();
    let id = store
        .create_user("Ann@Example.com", "h", "Ann", "Acme", "111111")
        .unwrap();
    let user = store.user_by_email("ANN@EXAMPLE.COM").unwrap().unwrap();
    assert_eq!(user.id, id);
    assert_eq!(user.email, "Ann@Example.com"); // original casing preserved
}

#[test]
fn unknown_email_is_none() {
    let (_dir, store) = open_store();
    assert!(store.user_by_email("nobody@example.com").unwrap().is_none());
}

// ── Email verification ───────────────────────────────────────────

#[test]
fn exact_code_verifies_once() {
    let (_dir, store) = open_store();
    store
        .create_user("ann@example.com", "h", "Ann", "Acme", "111111")
        .unwrap();

    assert!(store.mark_verified("ann@example.com", "111111").unwrap());
    let user = store.user_by_email("ann@example.com").unwrap().unwrap();
    assert!(user.verified);
    assert!(user.verification_code.is_none());

    // Already verified: the same call no longer matches.
    assert!(!store.mark_verified("ann@example.com", "111111").unwrap());
}

#[test]
fn wrong_code_leaves_unverified() {
    let (_dir, store) = open_store();
    store
        .create_user("ann@example.com", "h", "Ann", "Acme", "111111")
        .unwrap();

    assert!(!store.mark_verified("ann@example.com", "999999").unwrap());
    assert!(!store.user_by_email("ann@example.com").unwrap().unwrap().verified);
}

#[test]
fn verify_unknown_email_is_false() {
    let (_dir, store) = open_store();
    assert!(!store.mark_verified("nobody@example.com", "111111").unwrap());
}

// ── Second-factor material ───────────────────────────────────────

#[test]
fn set_and_clear_totp() {
    let (_dir, store) = open_store();
    let id = store
        .create_user("ann@example.com", "h", "Ann", "Acme", "111111")
        .unwrap();

    let codes = vec!["AB12CD34".to_string(), "EF56GH78".to_string()];
    store.set_totp(id, "SECRETBASE32", &codes).unwrap();

    let user = store.user_by_id(id).unwrap().unwrap();
    assert!(user.totp_enabled());
    assert_eq!(user.backup_codes.as_deref(), Some(&codes[..]));

    store.clear_totp(id).unwrap();
    let user = store.user_by_id(id).unwrap().unwrap();
    assert!(!user.totp_enabled());
    assert!(user.backup_codes.is_none());
}

#[test]
fn re_enable_overwrites_material() {
    let (_dir, store) = open_store();
    let id = store
        .create_user("ann@example.com", "h", "Ann", "Acme", "111111")
        .unwrap();

    store
        .set_totp(id, "FIRSTSECRET", &["AAAA1111".to_string()])
        .unwrap();
    store
        .set_totp(id, "SECONDSECRET", &["BBBB2222".to_string()])
        .unwrap();

    let user = store.user_by_id(id).unwrap().unwrap();
    assert_eq!(user.totp_secret.as_deref(), Some("SECONDSECRET"));
    assert_eq!(user.backup_codes.unwrap(), vec!["BBBB2222".to_string()]);
}

#[test]
fn backup_code_is_single_use() {
    let (_dir, store) = open_store();
    let id = store
        .create_user("ann@example.com", "h", "Ann", "Acme", "111111")
        .unwrap();
    store
        .set_totp(id, "S", &["AB12CD34".to_string(), "EF56GH78".to_string()])
        .unwrap();

    // Case-insensitive match, removed on first use.
    assert!(store.take_backup_code(id, "ab12cd34").unwrap());
    assert!(!store.take_backup_code(id, "AB12CD34").unwrap());

    let user = store.user_by_id(id).unwrap().unwrap();
    assert_eq!(user.backup_codes.unwrap(), vec!["EF56GH78".to_string()]);
}

#[test]
fn backup_code_miss_leaves_set_unchanged() {
    let (_dir, store) = open_store();
    let id = store
        .create_user("ann@example.com", "h", "Ann", "Acme", "111111")
        .unwrap();
    store.set_totp(id, "S", &["AB12CD34".to_string()]).unwrap();

    assert!(!store.take_backup_code(id, "ZZ99ZZ99").unwrap());
    let user = store.user_by_id(id).unwrap().unwrap();
    assert_eq!(user.backup_codes.unwrap().len(), 1);
}

#[test]
fn exhausted_backup_codes_reject_everything() {
    let (_dir, store) = open_store();
    let id = store
        .create_user("ann@example.com", "h", "Ann", "Acme", "111111")
        .unwrap();
    store.set_totp(id, "S", &["AB12CD34".to_string()]).unwrap();

    assert!(store.take_backup_code(id, "AB12CD34").unwrap());
    assert!(!store.take_backup_code(id, "AB12CD34").unwrap());
    assert_eq!(
        store.user_by_id(id).unwrap().unwrap().backup_codes.unwrap().len(),
        0
    );
}

// ── Enrollment artifact cache ────────────────────────────────────

#[test]
fn enrollment_cache_roundtrip() {
    let (_dir, store) = open_store();
    let id = store
        .create_user("ann@example.com", "h", "Ann", "Acme", "111111")
        .unwrap();

    let artifacts = EnrollmentArtifacts {
        qr_png: vec![0x89, 0x50, 0x4E, 0x47],
        secret: "PENDINGSECRET".to_string(),
        codes: vec!["AB12CD34".to_string()],
        sent_at: Utc::now(),
    };
    store.cache_enrollment(id, &artifacts).unwrap();

    let cached = store.enrollment(id).unwrap().unwrap();
    assert_eq!(cached.qr_png, artifacts.qr_png);
    assert_eq!(cached.secret, artifacts.secret);
    assert_eq!(cached.codes, artifacts.codes);

    store.clear_enrollment(id).unwrap();
    assert!(store.enrollment(id).unwrap().is_none());
}

#[test]
fn password_hash_replaceable() {
    let (_dir, store) = open_store();
    store
        .create_user("ann@example.com", "old-hash", "Ann", "Acme", "111111")
        .unwrap();

    assert!(store.update_password_hash("ann@example.com", "new-hash").unwrap());
    let user = store.user_by_email("ann@example.com").unwrap().unwrap();
    assert_eq!(user.password_hash, "new-hash");

    assert!(!store.update_password_hash("nobody@example.com", "x").unwrap());
}
