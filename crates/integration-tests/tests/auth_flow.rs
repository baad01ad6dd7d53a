//! End-to-end flows through the cache, gate, and publisher.
//!
//! These tests wire the real components together and script the external
//! collaborators: the identity service and the verification authority.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;

use ridgeline_auth::cache::AdminStatusCache;
use ridgeline_auth::gate::AdminGate;
use ridgeline_auth::models::SessionChange;
use ridgeline_auth::publisher::AuthPublisher;
use ridgeline_auth::store::MemoryStore;
use ridgeline_auth::verify::AdminVerifier;
use ridgeline_core::UserId;

use ridgeline_integration_tests::{
    CountingVerifier, FailingVerifier, FakeClock, ScriptedIdentity, init_tracing, session,
    wait_for_snapshot,
};

/// Wire a publisher over a fresh cache with a controllable clock.
fn harness<V: AdminVerifier + 'static>(
    verifier: V,
) -> (
    AuthPublisher<V>,
    tokio::sync::watch::Receiver<ridgeline_auth::models::AuthSnapshot>,
    Arc<AdminStatusCache>,
    Arc<FakeClock>,
) {
    init_tracing();
    let clock = Arc::new(FakeClock::new(1_700_000_000_000));
    let cache = Arc::new(AdminStatusCache::with_clock(
        Arc::new(MemoryStore::new()),
        clock.clone(),
    ));
    let gate = AdminGate::new(Arc::clone(&cache), verifier);
    let (publisher, rx) = AuthPublisher::new(gate, Arc::clone(&cache));
    (publisher, rx, cache, clock)
}

#[tokio::test]
async fn test_sign_in_verifies_once_and_caches() {
    let verifier = CountingVerifier::new(json!({ "is_admin": true }));
    let (publisher, mut rx, cache, _) = harness(verifier.clone());
    let (identity, events) = ScriptedIdentity::new(None);

    tokio::spawn(publisher.run(identity));

    events
        .send(SessionChange::SignedIn(session("u1")))
        .await
        .unwrap();
    let snapshot = wait_for_snapshot(&mut rx, |s| s.is_admin).await;
    assert_eq!(snapshot.user.unwrap().id.as_str(), "u1");
    assert_eq!(verifier.call_count(), 1);
    assert_eq!(
        cache.cached_status(&UserId::parse("u1").unwrap()),
        Some(true)
    );

    // A token refresh within the TTL resolves from the cache.
    events
        .send(SessionChange::TokenRefreshed(session("u1")))
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert!(rx.borrow().is_admin);
    assert_eq!(verifier.call_count(), 1);
}

#[tokio::test]
async fn test_ttl_expiry_forces_reverification() {
    let verifier = CountingVerifier::new(json!({ "is_admin": true }));
    let (publisher, mut rx, _, clock) = harness(verifier.clone());
    let (identity, events) = ScriptedIdentity::new(Some(session("u1")));

    tokio::spawn(publisher.run(identity));
    wait_for_snapshot(&mut rx, |s| s.is_admin).await;
    assert_eq!(verifier.call_count(), 1);

    // Six minutes later the cached status is no longer trusted.
    clock.advance(6 * 60 * 1000);
    events
        .send(SessionChange::TokenRefreshed(session("u1")))
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert!(rx.borrow().is_admin);
    assert_eq!(verifier.call_count(), 2);
}

#[tokio::test]
async fn test_fresh_cache_survives_refresh() {
    let verifier = CountingVerifier::new(json!({ "is_admin": true }));
    let (publisher, mut rx, _, clock) = harness(verifier.clone());
    let (identity, events) = ScriptedIdentity::new(Some(session("u1")));

    tokio::spawn(publisher.run(identity));
    wait_for_snapshot(&mut rx, |s| s.is_admin).await;

    // Four minutes: still within the TTL window.
    clock.advance(4 * 60 * 1000);
    events
        .send(SessionChange::TokenRefreshed(session("u1")))
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert_eq!(verifier.call_count(), 1);
}

#[tokio::test]
async fn test_verification_failure_fails_closed() {
    let verifier = FailingVerifier::new();
    let (publisher, mut rx, cache, _) = harness(verifier.clone());
    let (identity, events) = ScriptedIdentity::new(None);

    tokio::spawn(publisher.run(identity));

    events
        .send(SessionChange::SignedIn(session("u1")))
        .await
        .unwrap();
    let snapshot = wait_for_snapshot(&mut rx, |s| s.user.is_some()).await;
    assert!(!snapshot.is_admin);

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(verifier.call_count(), 1);
    // Failures are never cached, so the user stays non-admin...
    assert!(!rx.borrow().is_admin);
    assert_eq!(cache.cached_status(&UserId::parse("u1").unwrap()), None);

    // ...and the next event retries the authority.
    events
        .send(SessionChange::TokenRefreshed(session("u1")))
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(verifier.call_count(), 2);
}

#[tokio::test]
async fn test_sign_out_purges_cache_and_resets_state() {
    let verifier = CountingVerifier::new(json!({ "is_admin": true }));
    let (publisher, mut rx, cache, _) = harness(verifier.clone());
    let (identity, events) = ScriptedIdentity::new(Some(session("u1")));

    tokio::spawn(publisher.run(identity));
    wait_for_snapshot(&mut rx, |s| s.is_admin).await;

    events.send(SessionChange::SignedOut).await.unwrap();
    let snapshot = wait_for_snapshot(&mut rx, |s| s.user.is_none() && !s.is_loading).await;

    assert!(!snapshot.is_admin);
    assert_eq!(cache.cached_status(&UserId::parse("u1").unwrap()), None);
}

#[tokio::test]
async fn test_user_switch_never_reuses_previous_status() {
    // u1 verifies as admin; after switching to u2 the cached u1 status must
    // not leak, even though it is still fresh.
    let verifier = CountingVerifier::new(json!({ "is_admin": true }));
    let (publisher, mut rx, cache, _) = harness(verifier.clone());
    let (identity, events) = ScriptedIdentity::new(None);

    tokio::spawn(publisher.run(identity));

    events
        .send(SessionChange::SignedIn(session("u1")))
        .await
        .unwrap();
    wait_for_snapshot(&mut rx, |s| s.is_admin).await;

    events.send(SessionChange::SignedOut).await.unwrap();
    wait_for_snapshot(&mut rx, |s| s.user.is_none() && !s.is_loading).await;

    events
        .send(SessionChange::SignedIn(session("u2")))
        .await
        .unwrap();
    let snapshot =
        wait_for_snapshot(&mut rx, |s| {
            s.user.as_ref().is_some_and(|u| u.id.as_str() == "u2") && s.is_admin
        })
        .await;

    assert!(snapshot.is_admin);
    // u2 required its own authority round trip.
    assert_eq!(verifier.call_count(), 2);
    assert_eq!(
        cache.cached_status(&UserId::parse("u2").unwrap()),
        Some(true)
    );
}
