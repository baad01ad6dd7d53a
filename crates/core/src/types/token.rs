//! Bearer credential type.
//!
//! Type-safe wrapper for the opaque access token issued with a session.

use core::fmt;

use serde::{Deserialize, Serialize};

/// A bearer credential proving the current session's identity.
///
/// The token is opaque to the site; it is only ever forwarded to the
/// verification authority in an `Authorization: Bearer` header.
///
/// Implements `Debug` manually so the token value never lands in logs.
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct AccessToken(String);

impl AccessToken {
    /// Create a new access token.
    #[must_use]
    pub const fn new(token: String) -> Self {
        Self(token)
    }

    /// Get the raw token value.
    ///
    /// Only call this where the token is actually sent over the wire.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Consumes the `AccessToken` and returns its inner string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("AccessToken").field(&"[REDACTED]").finish()
    }
}

impl From<String> for AccessToken {
    fn from(token: String) -> Self {
        Self(token)
    }
}

impl From<&str> for AccessToken {
    fn from(token: &str) -> Self {
        Self(token.to_owned())
    }
}
