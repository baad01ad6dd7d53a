//! Single-slot admin status cache.
//!
//! Memoizes the verification authority's answer for at most one user at a
//! time, for at most five minutes. The cache is an explicit object holding a
//! [`StatusStore`] handle and a clock handle; constructed once per process
//! and shared by reference.
//!
//! A stored entry is only ever served when the stored user matches the
//! requested user AND the entry is younger than the TTL. Anything else is
//! treated as absent and purged on read, so a lingering entry for a previous
//! user can never be read as valid for a new one.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use ridgeline_core::UserId;

use crate::store::{ADMIN_STATUS_KEY, StatusStore};

/// Maximum age after which a cached status is no longer trusted.
pub const ADMIN_STATUS_TTL_MS: i64 = 5 * 60 * 1000;

/// Source of the current time, injectable for deterministic TTL tests.
pub trait Clock: Send + Sync {
    /// Current time as milliseconds since the Unix epoch.
    fn now_ms(&self) -> i64;
}

/// Wall-clock time.
#[derive(Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> i64 {
        Utc::now().timestamp_millis()
    }
}

/// The single cached record.
///
/// Serialized as JSON under [`ADMIN_STATUS_KEY`]. The layout is not
/// versioned; a shape mismatch on read is treated as absent.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AdminCacheEntry {
    /// User the status was verified for.
    pub user_id: UserId,
    /// The verified status.
    pub is_admin: bool,
    /// When the status was verified, in epoch milliseconds.
    pub timestamp: i64,
}

/// Time-bounded single-slot cache for the admin status.
///
/// Every failure of the backing store is swallowed: caching is a pure
/// optimization and degrades to always-miss, never to an error.
pub struct AdminStatusCache {
    store: Arc<dyn StatusStore>,
    clock: Arc<dyn Clock>,
}

impl AdminStatusCache {
    /// Create a cache over `store` using the system clock.
    #[must_use]
    pub fn new(store: Arc<dyn StatusStore>) -> Self {
        Self::with_clock(store, Arc::new(SystemClock))
    }

    /// Create a cache with an explicit clock.
    #[must_use]
    pub fn with_clock(store: Arc<dyn StatusStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Return the cached status for `user_id`, if one is valid.
    ///
    /// Returns `Some` only when an entry exists, its stored user equals
    /// `user_id`, and its age is strictly less than the TTL. A stale,
    /// mismatched, or malformed entry is purged and reported as absent.
    #[must_use]
    pub fn cached_status(&self, user_id: &UserId) -> Option<bool> {
        let raw = match self.store.get(ADMIN_STATUS_KEY) {
            Ok(raw) => raw?,
            Err(e) => {
                tracing::warn!(error = %e, "Admin status store unreadable, treating as miss");
                return None;
            }
        };

        let entry: AdminCacheEntry = match serde_json::from_str(&raw) {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!(error = %e, "Corrupt admin status record, purging");
                self.purge();
                return None;
            }
        };

        if entry.user_id != *user_id {
            tracing::debug!(
                cached_user = %entry.user_id,
                requested_user = %user_id,
                "Admin status cached for a different user, purging"
            );
            self.purge();
            return None;
        }

        let age_ms = self.clock.now_ms() - entry.timestamp;
        if age_ms >= ADMIN_STATUS_TTL_MS {
            tracing::debug!(age_ms, "Admin status expired, purging");
            self.purge();
            return None;
        }

        tracing::debug!(user_id = %user_id, is_admin = entry.is_admin, "Admin status cache hit");
        Some(entry.is_admin)
    }

    /// Overwrite the cache slot with a freshly verified status.
    pub fn set_status(&self, user_id: &UserId, is_admin: bool) {
        let entry = AdminCacheEntry {
            user_id: user_id.clone(),
            is_admin,
            timestamp: self.clock.now_ms(),
        };

        let raw = match serde_json::to_string(&entry) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to serialize admin status record");
                return;
            }
        };

        if let Err(e) = self.store.put(ADMIN_STATUS_KEY, raw) {
            tracing::warn!(error = %e, "Failed to write admin status record");
        }
    }

    /// Remove the cache slot unconditionally.
    pub fn clear(&self) {
        self.purge();
    }

    fn purge(&self) {
        if let Err(e) = self.store.remove(ADMIN_STATUS_KEY) {
            tracing::warn!(error = %e, "Failed to remove admin status record");
        }
    }
}
