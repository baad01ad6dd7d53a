//! The externally observed auth state.

use super::session::{Session, UserIdentity};

/// Snapshot of the auth read model.
///
/// Republished on every identity-service event and after every admin
/// verification completes. `is_admin` may transiently read `false` for an
/// admin while a verification is in flight; callers must tolerate that
/// window.
#[derive(Debug, Clone)]
pub struct AuthSnapshot {
    /// The signed-in user, if any.
    pub user: Option<UserIdentity>,
    /// The active session, if any.
    pub session: Option<Session>,
    /// True only before the startup session restore has resolved.
    pub is_loading: bool,
    /// Whether the current user has been verified as an admin.
    pub is_admin: bool,
}

impl AuthSnapshot {
    /// State entered on process start, before the existing-session check.
    #[must_use]
    pub const fn initializing() -> Self {
        Self {
            user: None,
            session: None,
            is_loading: true,
            is_admin: false,
        }
    }

    /// State entered on sign-out or a session-absent startup check.
    #[must_use]
    pub const fn unauthenticated() -> Self {
        Self {
            user: None,
            session: None,
            is_loading: false,
            is_admin: false,
        }
    }

    /// State entered immediately on sign-in, before the admin check resolves.
    #[must_use]
    pub fn pending_admin_check(session: Session) -> Self {
        Self {
            user: Some(session.user.clone()),
            session: Some(session),
            is_loading: false,
            is_admin: false,
        }
    }

    /// State entered when the admin check for the current session resolves.
    #[must_use]
    pub fn verified(session: Session, is_admin: bool) -> Self {
        Self {
            user: Some(session.user.clone()),
            session: Some(session),
            is_loading: false,
            is_admin,
        }
    }
}
