//! Auth read-model publisher.
//!
//! Keeps the `{user, session, is_loading, is_admin}` snapshot consistent
//! with identity-service events. Two triggers funnel into one state-update
//! path: a one-time existing-session check on startup and the continuous
//! session-change subscription. The subscription is established before the
//! startup check resolves so no event racing startup is lost.
//!
//! The admin check is dispatched fire-and-forget: session transitions are
//! never delayed by the verification round trip, and the snapshot may read
//! `is_admin = false` while a check is in flight. A generation counter,
//! bumped on every sign-in and sign-out, discards in-flight results that
//! resolve after the session they were issued for has changed.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use thiserror::Error;
use tokio::sync::{mpsc, watch};

use crate::cache::AdminStatusCache;
use crate::gate::AdminGate;
use crate::models::{AuthSnapshot, Session, SessionChange};
use crate::verify::AdminVerifier;

/// Errors that can occur talking to the identity service.
#[derive(Debug, Error)]
pub enum IdentityError {
    /// The identity service could not be reached or answered abnormally.
    #[error("identity service unavailable: {0}")]
    Unavailable(String),
}

/// The hosted identity service, as seen by the publisher.
///
/// Owned by a third party; this crate only consumes its event stream and
/// its one-shot session snapshot.
pub trait IdentitySource: Send + Sync {
    /// Subscribe to session-change events.
    ///
    /// Must be called before [`IdentitySource::current_session`] so events
    /// emitted during startup are buffered rather than dropped.
    fn subscribe(&self) -> mpsc::Receiver<SessionChange>;

    /// Fetch the current session, if one exists.
    fn current_session(
        &self,
    ) -> impl Future<Output = Result<Option<Session>, IdentityError>> + Send;
}

/// Monotonic counter separating one session's checks from the next's.
#[derive(Clone, Debug, Default)]
pub struct Generation(Arc<AtomicU64>);

impl Generation {
    /// Create a counter at zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The current generation.
    #[must_use]
    pub fn current(&self) -> u64 {
        self.0.load(Ordering::SeqCst)
    }

    /// Advance to a new generation, invalidating earlier tokens.
    pub fn bump(&self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }

    /// Whether `token` still names the current generation.
    #[must_use]
    pub fn is_current(&self, token: u64) -> bool {
        self.current() == token
    }
}

/// Publishes [`AuthSnapshot`]s in response to identity-service events.
pub struct AuthPublisher<V> {
    gate: Arc<AdminGate<V>>,
    cache: Arc<AdminStatusCache>,
    generation: Generation,
    snapshot_tx: watch::Sender<AuthSnapshot>,
}

impl<V: AdminVerifier + 'static> AuthPublisher<V> {
    /// Create a publisher and the receiver its snapshots are observed on.
    ///
    /// The receiver starts in the Initializing state.
    #[must_use]
    pub fn new(
        gate: AdminGate<V>,
        cache: Arc<AdminStatusCache>,
    ) -> (Self, watch::Receiver<AuthSnapshot>) {
        let (snapshot_tx, snapshot_rx) = watch::channel(AuthSnapshot::initializing());

        (
            Self {
                gate: Arc::new(gate),
                cache,
                generation: Generation::new(),
                snapshot_tx,
            },
            snapshot_rx,
        )
    }

    /// Drive the read model until the identity event stream closes.
    ///
    /// Subscribes to session changes first, then restores any existing
    /// session, then processes events as they arrive. Identity failures on
    /// startup resolve to the Unauthenticated state rather than an error.
    pub async fn run<I: IdentitySource>(self, identity: I) {
        let mut changes = identity.subscribe();

        match identity.current_session().await {
            Ok(Some(session)) => self.handle_session(session),
            Ok(None) => {
                self.snapshot_tx.send_replace(AuthSnapshot::unauthenticated());
            }
            Err(e) => {
                tracing::warn!(error = %e, "Startup session restore failed");
                self.snapshot_tx.send_replace(AuthSnapshot::unauthenticated());
            }
        }

        while let Some(change) = changes.recv().await {
            match change {
                SessionChange::SignedIn(session) | SessionChange::TokenRefreshed(session) => {
                    self.handle_session(session);
                }
                SessionChange::SignedOut => self.handle_sign_out(),
            }
        }

        tracing::debug!("Identity event stream closed, publisher stopping");
    }

    /// A session became active: publish it immediately, verify in the
    /// background.
    fn handle_session(&self, session: Session) {
        self.generation.bump();
        let generation_token = self.generation.current();

        self.snapshot_tx
            .send_replace(AuthSnapshot::pending_admin_check(session.clone()));

        let gate = Arc::clone(&self.gate);
        let generation = self.generation.clone();
        let snapshot_tx = self.snapshot_tx.clone();

        tokio::spawn(async move {
            let guard = {
                let generation = generation.clone();
                move || generation.is_current(generation_token)
            };

            let verified = gate
                .check_admin_role_guarded(&session.access_token, &session.user.id, guard)
                .await;

            if let Some(is_admin) = verified
                && generation.is_current(generation_token)
            {
                snapshot_tx.send_replace(AuthSnapshot::verified(session, is_admin));
            }
        });
    }

    fn handle_sign_out(&self) {
        self.generation.bump();
        self.cache.clear();
        self.snapshot_tx
            .send_replace(AuthSnapshot::unauthenticated());
    }
}
