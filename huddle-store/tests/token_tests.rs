mod common;

use chrono::{Duration, Utc};
use common::open_store;

// ── Reset tokens ─────────────────────────────────────────────────

#[test]
fn token_roundtrip_and_single_use() {
    let (_dir, store) = open_store();
    store.put_reset_token("ann@example.com", "482913").unwrap();

    let token = store.reset_token("ann@example.com").unwrap().unwrap();
    assert_eq!(token.code, "482913");

    assert!(store.consume_reset_token("ann@example.com", "482913").unwrap());
    // Consumed: gone for good.
    assert!(!store.consume_reset_token("ann@example.com", "482913").unwrap());
    assert!(store.reset_token("ann@example.com").unwrap().is_none());
}

#[test]
fn wrong_code_does_not_consume() {
    let (_dir, store) = open_store();
    store.put_reset_token("ann@example.com", "482913").unwrap();

    assert!(!store.consume_reset_token("ann@example.com", "000000").unwrap());
    // Token still live after the miss.
    assert!(store.consume_reset_token("ann@example.com", "482913").unwrap());
}

#[test]
fn newer_token_supersedes_older() {
    let (_dir, store) = open_store();
    store.put_reset_token("ann@example.com", "111111").unwrap();
    store.put_reset_token("ann@example.com", "222222").unwrap();

    assert!(!store.consume_reset_token("ann@example.com", "111111").unwrap());
    assert!(store.consume_reset_token("ann@example.com", "222222").unwrap());
}

#[test]
fn token_keyed_case_insensitively() {
    let (_dir, store) = open_store();
    // Same account, different casing: one live token, not two.
    store.put_reset_token("Ann@Example.com", "111111").unwrap();
    store.put_reset_token("ann@example.com", "222222").unwrap();

    assert!(!store.consume_reset_token("Ann@Example.com", "111111").unwrap());
    assert!(store.consume_reset_token("ANN@EXAMPLE.COM", "222222").unwrap());
    assert!(store.reset_token("ann@example.com").unwrap().is_none());
}

#[test]
fn token_valid_just_before_expiry() {
    let (_dir, store) = open_store();
    store
        .put_reset_token_expiring("ann@example.com", "482913", Utc::now() + Duration::seconds(1))
        .unwrap();
    assert!(store.consume_reset_token("ann@example.com", "482913").unwrap());
}

#[test]
fn token_invalid_just_after_expiry() {
    let (_dir, store) = open_store();
    store
        .put_reset_token_expiring("ann@example.com", "482913", Utc::now() - Duration::seconds(1))
        .unwrap();
    assert!(!store.consume_reset_token("ann@example.com", "482913").unwrap());
    assert!(store.reset_token("ann@example.com").unwrap().is_none());
}

#[test]
fn default_expiry_is_fifteen_minutes() {
    let (_dir, store) = open_store();
    let before = Utc::now();
    let token = store.put_reset_token("ann@example.com", "482913").unwrap();
    let ttl = token.expires_at - before;
    assert!(ttl >= Duration::minutes(14) && ttl <= Duration::minutes(16));
}

#[test]
fn tokens_are_per_email() {
    let (_dir, store) = open_store();
    store.put_reset_token("ann@example.com", "111111").unwrap();
    store.put_reset_token("bob@example.com", "222222").unwrap();

    assert!(store.consume_reset_token("ann@example.com", "111111").unwrap());
    assert!(store.consume_reset_token("bob@example.com", "222222").unwrap());
}

// ── Sessions ─────────────────────────────────────────────────────

#[test]
fn session_roundtrip() {
    let (_dir, store) = open_store();
    let id = store
        .create_user("ann@example.com", "h", "Ann", "Acme", "111111")
        .unwrap();

    let session = store.create_session(id, Duration::hours(1)).unwrap();
    let found = store.session_by_token(&session.token).unwrap().unwrap();
    assert_eq!(found.user_id, id);

    store.delete_session(&session.token).unwrap();
    assert!(store.session_by_token(&session.token).unwrap().is_none());
}

#[test]
fn session_tokens_are_unique() {
    let (_dir, store) = open_store();
    let id = store
        .create_user("ann@example.com", "h", "Ann", "Acme", "111111")
        .unwrap();
    let a = store.create_session(id, Duration::hours(1)).unwrap();
    let b = store.create_session(id, Duration::hours(1)).unwrap();
    assert_ne!(a.token, b.token);
}

#[test]
fn expired_session_is_invisible() {
    let (_dir, store) = open_store();
    let id = store
        .create_user("ann@example.com", "h", "Ann", "Acme", "111111")
        .unwrap();

    let session = store.create_session(id, Duration::seconds(-1)).unwrap();
    assert!(store.session_by_token(&session.token).unwrap().is_none());
}

#[test]
fn purge_removes_only_expired_sessions() {
    let (_dir, store) = open_store();
    let id = store
        .create_user("ann@example.com", "h", "Ann", "Acme", "111111")
        .unwrap();

    let dead = store.create_session(id, Duration::seconds(-10)).unwrap();
    let live = store.create_session(id, Duration::hours(1)).unwrap();

    assert_eq!(store.purge_expired_sessions().unwrap(), 1);
    assert!(store.session_by_token(&live.token).unwrap().is_some());
    let _ = dead;
}

#[test]
fn unknown_token_is_none() {
    let (_dir, store) = open_store();
    assert!(store.session_by_token("no-such-token").unwrap().is_none());
    // Deleting a missing session is not an error.
    store.delete_session("no-such-token").unwrap();
}
