//! Session-related types.
//!
//! Types describing the session issued by the hosted identity service.
//! The session is not owned by this crate; it is held only to extract the
//! user identifier and the bearer credential.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use ridgeline_core::{AccessToken, Email, UserId};

/// The signed-in user as reported by the identity service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserIdentity {
    /// Stable identifier issued by the identity service.
    pub id: UserId,
    /// Email address the user signed in with.
    pub email: Email,
}

/// An active session issued by the identity service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Session {
    /// The signed-in user.
    pub user: UserIdentity,
    /// Bearer credential valid for the life of the session.
    pub access_token: AccessToken,
    /// When the access token expires.
    pub expires_at: DateTime<Utc>,
}

/// A session-change event emitted by the identity service.
///
/// Sign-in, sign-out, and token refresh all flow through the same channel
/// so the read-model publisher has a single state-update path.
#[derive(Debug, Clone)]
pub enum SessionChange {
    /// The user signed in (or an existing session was restored).
    SignedIn(Session),
    /// The session's access token was refreshed.
    TokenRefreshed(Session),
    /// The user signed out or the session ended.
    SignedOut,
}
