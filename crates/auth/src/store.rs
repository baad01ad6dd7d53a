//! Session-scoped storage for the cached admin status record.
//!
//! The cache persists a single serialized JSON record under a fixed key.
//! Storage is a pure optimization: every failure here is swallowed by the
//! cache layer and degrades to a cache miss, never to an error the caller
//! sees.

use std::collections::HashMap;
use std::sync::Mutex;

use thiserror::Error;

/// Fixed key under which the admin status record is stored.
pub const ADMIN_STATUS_KEY: &str = "ridgeline_admin_status";

/// Errors that can occur reading or writing the status store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backing storage rejected the operation (quota, disabled storage).
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// Key-value storage for the cached status record.
///
/// Implementations are volatile and scoped to the current browsing session;
/// nothing stored here survives the session. All operations are best-effort
/// from the cache's point of view.
pub trait StatusStore: Send + Sync {
    /// Read the raw record stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the backing storage cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Write `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the backing storage cannot be written.
    fn put(&self, key: &str, value: String) -> Result<(), StoreError>;

    /// Remove the record stored under `key`, if any.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the backing storage cannot be modified.
    fn remove(&self, key: &str) -> Result<(), StoreError>;
}

/// In-process status store.
///
/// The default store: a mutex-guarded map that lives exactly as long as the
/// process, matching the volatility contract of the trait.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl StatusStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let entries = self
            .entries
            .lock()
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        Ok(entries.get(key).cloned())
    }

    fn put(&self, key: &str, value: String) -> Result<(), StoreError> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        entries.insert(key.to_owned(), value);
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        entries.remove(key);
        Ok(())
    }
}
