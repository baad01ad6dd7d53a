//! Admin status gate.
//!
//! Answers "is the current user an admin" with minimal calls to the
//! verification authority, while never serving stale-user or expired data.
//! Verification failures degrade to `false` for that invocation and write
//! nothing, so the next read retries the authority.

use std::sync::Arc;

use serde_json::Value;

use ridgeline_core::{AccessToken, UserId};

use crate::cache::AdminStatusCache;
use crate::verify::AdminVerifier;

/// Field of the authority's payload carrying the answer.
const IS_ADMIN_FIELD: &str = "is_admin";

/// Orchestrates the cache and the verification authority.
pub struct AdminGate<V> {
    cache: Arc<AdminStatusCache>,
    verifier: V,
}

impl<V: AdminVerifier> AdminGate<V> {
    /// Create a gate over a shared cache and a verifier.
    #[must_use]
    pub const fn new(cache: Arc<AdminStatusCache>, verifier: V) -> Self {
        Self { cache, verifier }
    }

    /// Resolve the admin status for `user_id`.
    ///
    /// Returns the cached status when a valid entry exists; otherwise calls
    /// the verification authority, caches the answer, and returns it. Any
    /// authority failure resolves to `false` (fail-closed) without caching.
    pub async fn check_admin_role(&self, access_token: &AccessToken, user_id: &UserId) -> bool {
        // The unguarded path always publishes its result.
        self.check_admin_role_guarded(access_token, user_id, || true)
            .await
            .unwrap_or(false)
    }

    /// Resolve the admin status, discarding the result if it went stale.
    ///
    /// `still_current` is consulted after the verification round trip and
    /// before any cache write; when it reports `false` (the session changed
    /// while the check was in flight) the result is dropped and `None` is
    /// returned, so a check racing a sign-out can never re-create a cache
    /// entry for a signed-out user.
    pub async fn check_admin_role_guarded(
        &self,
        access_token: &AccessToken,
        user_id: &UserId,
        still_current: impl Fn() -> bool + Send,
    ) -> Option<bool> {
        if let Some(cached) = self.cache.cached_status(user_id) {
            return Some(cached);
        }

        match self.verifier.verify(access_token).await {
            Ok(payload) => {
                let is_admin = payload_grants_admin(&payload);
                if !still_current() {
                    tracing::debug!(user_id = %user_id, "Discarding stale admin verification");
                    return None;
                }
                self.cache.set_status(user_id, is_admin);
                Some(is_admin)
            }
            Err(e) => {
                let event_id = sentry::capture_error(&e);
                tracing::error!(
                    error = %e,
                    sentry_event_id = %event_id,
                    user_id = %user_id,
                    "Admin verification failed, treating user as non-admin"
                );
                // No cache write: the next read retries the authority.
                still_current().then_some(false)
            }
        }
    }
}

/// Whether the authority's payload grants admin.
///
/// Only a payload whose `is_admin` field is exactly JSON `true` grants
/// admin. `"true"`, `1`, `null`, or a missing field all deny; a merely
/// truthy payload must never be enough.
fn payload_grants_admin(payload: &Value) -> bool {
    payload.get(IS_ADMIN_FIELD) == Some(&Value::Bool(true))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use serde_json::json;

    use crate::store::MemoryStore;
    use crate::verify::VerifyError;

    use super::*;

    /// Verifier that always answers with the same payload and counts calls.
    struct StaticVerifier {
        payload: Value,
        calls: AtomicUsize,
    }

    impl StaticVerifier {
        fn new(payload: Value) -> Self {
            Self {
                payload,
                calls: AtomicUsize::new(0),
            }
        }

        fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl AdminVerifier for &StaticVerifier {
        async fn verify(&self, _access_token: &AccessToken) -> Result<Value, VerifyError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.payload.clone())
        }
    }

    /// Verifier whose every call fails, counting calls.
    struct FailingVerifier {
        calls: AtomicUsize,
    }

    impl FailingVerifier {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl AdminVerifier for &FailingVerifier {
        async fn verify(&self, _access_token: &AccessToken) -> Result<Value, VerifyError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(VerifyError::Status {
                status: 503,
                body: "unavailable".to_owned(),
            })
        }
    }

    fn cache() -> Arc<AdminStatusCache> {
        Arc::new(AdminStatusCache::new(Arc::new(MemoryStore::new())))
    }

    fn user(id: &str) -> UserId {
        UserId::parse(id).unwrap()
    }

    fn token() -> AccessToken {
        AccessToken::from("tok")
    }

    #[tokio::test]
    async fn test_miss_verifies_and_caches() {
        let cache = cache();
        let verifier = StaticVerifier::new(json!({ "is_admin": true }));
        let gate = AdminGate::new(cache.clone(), &verifier);

        assert!(gate.check_admin_role(&token(), &user("u1")).await);
        assert_eq!(verifier.call_count(), 1);
        assert_eq!(cache.cached_status(&user("u1")), Some(true));
    }

    #[tokio::test]
    async fn test_cache_hit_skips_authority() {
        let cache = cache();
        cache.set_status(&user("u1"), true);
        let verifier = StaticVerifier::new(json!({ "is_admin": false }));
        let gate = AdminGate::new(cache, &verifier);

        assert!(gate.check_admin_role(&token(), &user("u1")).await);
        assert_eq!(verifier.call_count(), 0);
    }

    #[tokio::test]
    async fn test_negative_answer_is_cached() {
        let cache = cache();
        let verifier = StaticVerifier::new(json!({ "is_admin": false }));
        let gate = AdminGate::new(cache.clone(), &verifier);

        assert!(!gate.check_admin_role(&token(), &user("u1")).await);
        assert_eq!(cache.cached_status(&user("u1")), Some(false));
    }

    #[tokio::test]
    async fn test_failure_fails_closed_without_caching() {
        let cache = cache();
        let verifier = FailingVerifier::new();
        let gate = AdminGate::new(cache.clone(), &verifier);

        assert!(!gate.check_admin_role(&token(), &user("u1")).await);
        assert_eq!(cache.cached_status(&user("u1")), None);

        // Nothing was cached, so an immediate retry hits the authority again.
        assert!(!gate.check_admin_role(&token(), &user("u1")).await);
        assert_eq!(verifier.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_only_strict_true_grants_admin() {
        for payload in [
            json!({ "is_admin": "true" }),
            json!({ "is_admin": 1 }),
            json!({ "is_admin": null }),
            json!({}),
            json!(null),
            json!({ "admin": true }),
        ] {
            let verifier = StaticVerifier::new(payload.clone());
            let gate = AdminGate::new(cache(), &verifier);
            assert!(
                !gate.check_admin_role(&token(), &user("u1")).await,
                "payload {payload} must not grant admin"
            );
        }
    }

    #[tokio::test]
    async fn test_stale_guard_discards_result() {
        let cache = cache();
        let verifier = StaticVerifier::new(json!({ "is_admin": true }));
        let gate = AdminGate::new(cache.clone(), &verifier);

        let result = gate
            .check_admin_role_guarded(&token(), &user("u1"), || false)
            .await;

        assert_eq!(result, None);
        assert_eq!(cache.cached_status(&user("u1")), None);
    }

    #[tokio::test]
    async fn test_stale_guard_does_not_block_cache_hits() {
        // The guard only applies after a round trip; a synchronous cache
        // hit is current by construction.
        let cache = cache();
        cache.set_status(&user("u1"), true);
        let verifier = StaticVerifier::new(json!({ "is_admin": false }));
        let gate = AdminGate::new(cache, &verifier);

        let result = gate
            .check_admin_role_guarded(&token(), &user("u1"), || false)
            .await;

        assert_eq!(result, Some(true));
    }
}
