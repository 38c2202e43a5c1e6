//! Contract Test: Failure Policy
//!
//! This test verifies which conditions stop a pass and what a stopped pass
//! leaves behind.
//!
//! Constraints verified:
//! - No resolved address: fatal, zero provider calls
//! - Unknown host: fatal, no mutation attempted
//! - First failed remote call: fatal, nothing further attempted
//! - A failed pass never rewrites the snapshot
//! - Provider errors keep their code and message
//!
//! If this test fails, a failing run may leave inconsistent state behind.

mod common;

use cf_ddns_core::Error;
use common::*;
use tokio_test::assert_err;

#[tokio::test]
async fn no_address_resolved_makes_no_provider_calls() {
    let probe = FakeProbe::new();
    let store = FakeRecordStore::with_records(vec![record("r1", "10.0.0.1")]);
    let cache = CountingCache::new();

    let err = assert_err!(engine(&probe, &store, &cache, minimal_config()).run().await);

    assert!(matches!(err, Error::NoAddressResolved));
    assert_eq!(probe.public_call_count(), 1, "exactly one unbound probe");
    assert_eq!(store.call_count(), 0);
    assert_eq!(cache.load_call_count(), 0);
}

#[tokio::test]
async fn all_interfaces_failing_is_no_address_resolved() {
    let probe = FakeProbe::new();
    let store = FakeRecordStore::new();
    let cache = CountingCache::new();
    let config = minimal_config().with_interfaces(vec!["eth0".into(), "wlan0".into()]);

    let err = assert_err!(engine(&probe, &store, &cache, config).run().await);

    assert!(matches!(err, Error::NoAddressResolved));
    assert_eq!(store.call_count(), 0);
}

#[tokio::test]
async fn create_failure_is_fatal_and_keeps_cache() {
    let probe = FakeProbe::new()
        .with_interface("eth0", [192, 168, 1, 2], "10.0.0.1")
        .with_interface("eth1", [192, 168, 2, 2], "10.0.0.2");
    let store = FakeRecordStore::with_records(vec![record("r3", "10.0.0.3")]);
    let cache = CountingCache::new();
    cache.seed(vec![record("r3", "10.0.0.3")]).await;
    let before = cache.snapshot().await;
    store.fail_next(StoreOp::Create, 1004, "DNS Validation Error: already exists");
    let config = minimal_config().with_interfaces(vec!["eth0".into(), "eth1".into()]);

    let err = assert_err!(engine(&probe, &store, &cache, config).run().await);

    let text = err.to_string();
    assert!(text.contains("1004"), "diagnostic carries the code: {text}");
    assert!(text.contains("already exists"), "diagnostic carries the message: {text}");
    assert!(matches!(err, Error::Provider { code: 1004, .. }));

    // Stopped at the first failure: no second create, no delete
    assert_eq!(store.create_call_count(), 1);
    assert_eq!(store.delete_call_count(), 0);

    assert_eq!(cache.store_call_count(), 0);
    assert_eq!(cache.snapshot().await, before);
}

#[tokio::test]
async fn delete_failure_after_inserts_is_fatal() {
    let probe = FakeProbe::unbound("10.0.0.2");
    let store = FakeRecordStore::with_records(vec![record("r1", "10.0.0.1")]);
    let cache = CountingCache::new();
    store.fail_next(StoreOp::Delete, 10000, "Authentication error");

    let err = assert_err!(engine(&probe, &store, &cache, minimal_config()).run().await);

    assert!(matches!(err, Error::Provider { code: 10000, .. }));
    // Partial application is accepted: the insert already happened
    assert_eq!(store.addresses(), vec!["10.0.0.1", "10.0.0.2"]);
    assert_eq!(cache.store_call_count(), 0);
}

#[tokio::test]
async fn list_failure_is_fatal() {
    let probe = FakeProbe::unbound("10.0.0.1");
    let store = FakeRecordStore::new();
    let cache = CountingCache::new();
    store.fail_next(StoreOp::List, 9109, "Invalid access token");

    let err = assert_err!(engine(&probe, &store, &cache, minimal_config()).run().await);

    assert_eq!(err.to_string(), "Invalid access token (code: 9109)");
    assert_eq!(store.mutation_count(), 0);
}

#[tokio::test]
async fn unknown_host_fails_before_mutation() {
    let probe = FakeProbe::unbound("10.0.0.1");
    let store = FakeRecordStore::new();
    store.forget_host();
    let cache = CountingCache::new();

    let err = assert_err!(engine(&probe, &store, &cache, minimal_config()).run().await);

    assert!(matches!(err, Error::UnknownHost(ref host) if host == HOSTNAME));
    assert_eq!(store.host_exists_call_count(), 1);
    assert_eq!(store.mutation_count(), 0);
    assert_eq!(cache.store_call_count(), 0);
}

#[tokio::test]
async fn known_host_without_a_records_gets_inserted() {
    let probe = FakeProbe::unbound("10.0.0.1");
    let store = FakeRecordStore::new();
    let cache = CountingCache::new();

    tokio_test::assert_ok!(engine(&probe, &store, &cache, minimal_config()).run().await);

    assert_eq!(store.host_exists_call_count(), 1);
    assert_eq!(store.addresses(), vec!["10.0.0.1"]);
}

#[tokio::test]
async fn host_check_is_skipped_when_not_required() {
    let probe = FakeProbe::unbound("10.0.0.1");
    let store = FakeRecordStore::new();
    store.forget_host();
    let cache = CountingCache::new();
    let mut config = minimal_config();
    config.policy.require_known_host = false;

    tokio_test::assert_ok!(engine(&probe, &store, &cache, config).run().await);

    assert_eq!(store.host_exists_call_count(), 0);
    assert_eq!(store.create_call_count(), 1);
}
