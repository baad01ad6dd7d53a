//! Integration tests for the Ridgeline auth subsystem.
//!
//! The tests wire the real cache, gate, and publisher together and drive
//! them with a scripted identity service and controllable verifiers - no
//! network, no real clock.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p ridgeline-integration-tests
//! ```
//!
//! This crate's library is test support only: scripted collaborators shared
//! by the test binaries under `tests/`.

#![cfg_attr(not(test), forbid(unsafe_code))]
#![allow(clippy::unwrap_used)] // test support code

use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;
use serde_json::Value;
use tokio::sync::{Notify, mpsc, watch};

use ridgeline_auth::cache::Clock;
use ridgeline_auth::models::{AuthSnapshot, Session, SessionChange, UserIdentity};
use ridgeline_auth::publisher::{IdentityError, IdentitySource};
use ridgeline_auth::verify::{AdminVerifier, VerifyError};
use ridgeline_core::{AccessToken, Email, UserId};

/// Initialize test logging once; honors `RUST_LOG`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ridgeline_auth=debug".into()),
        )
        .with_test_writer()
        .try_init();
}

/// Build a session for `user_id` with a dummy token.
#[must_use]
pub fn session(user_id: &str) -> Session {
    Session {
        user: UserIdentity {
            id: UserId::parse(user_id).unwrap(),
            email: Email::parse("user@example.com").unwrap(),
        },
        access_token: AccessToken::from("tok"),
        expires_at: Utc::now() + chrono::Duration::hours(1),
    }
}

/// Clock that only moves when the test advances it.
#[derive(Debug)]
pub struct FakeClock {
    now_ms: AtomicI64,
}

impl FakeClock {
    #[must_use]
    pub fn new(start_ms: i64) -> Self {
        Self {
            now_ms: AtomicI64::new(start_ms),
        }
    }

    pub fn advance(&self, delta_ms: i64) {
        self.now_ms.fetch_add(delta_ms, Ordering::SeqCst);
    }
}

impl Clock for FakeClock {
    fn now_ms(&self) -> i64 {
        self.now_ms.load(Ordering::SeqCst)
    }
}

/// Verifier answering with a fixed payload, counting authority calls.
pub struct CountingVerifier {
    payload: Value,
    calls: AtomicUsize,
}

impl CountingVerifier {
    #[must_use]
    pub fn new(payload: Value) -> Arc<Self> {
        Arc::new(Self {
            payload,
            calls: AtomicUsize::new(0),
        })
    }

    #[must_use]
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl AdminVerifier for CountingVerifier {
    async fn verify(&self, _access_token: &AccessToken) -> Result<Value, VerifyError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.payload.clone())
    }
}

/// Verifier whose every call fails with an authority error.
pub struct FailingVerifier {
    calls: AtomicUsize,
}

impl FailingVerifier {
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
        })
    }

    #[must_use]
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl AdminVerifier for FailingVerifier {
    async fn verify(&self, _access_token: &AccessToken) -> Result<Value, VerifyError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(VerifyError::Status {
            status: 500,
            body: "boom".to_owned(),
        })
    }
}

/// Verifier that blocks until the test releases it.
///
/// Used to hold a verification in flight while other events land.
pub struct SlowVerifier {
    payload: Value,
    release: Notify,
}

impl SlowVerifier {
    #[must_use]
    pub fn new(payload: Value) -> Arc<Self> {
        Arc::new(Self {
            payload,
            release: Notify::new(),
        })
    }

    pub fn release_one(&self) {
        self.release.notify_one();
    }
}

impl AdminVerifier for SlowVerifier {
    async fn verify(&self, _access_token: &AccessToken) -> Result<Value, VerifyError> {
        self.release.notified().await;
        Ok(self.payload.clone())
    }
}

/// Identity service scripted by the test.
///
/// Events are pushed through a pre-built channel; the startup session is
/// fixed at construction.
pub struct ScriptedIdentity {
    changes: Mutex<Option<mpsc::Receiver<SessionChange>>>,
    startup: Option<Session>,
}

impl ScriptedIdentity {
    #[must_use]
    pub fn new(startup: Option<Session>) -> (Self, mpsc::Sender<SessionChange>) {
        let (tx, rx) = mpsc::channel(16);
        (
            Self {
                changes: Mutex::new(Some(rx)),
                startup,
            },
            tx,
        )
    }
}

impl IdentitySource for ScriptedIdentity {
    fn subscribe(&self) -> mpsc::Receiver<SessionChange> {
        self.changes
            .lock()
            .unwrap()
            .take()
            .expect("subscribe called once")
    }

    async fn current_session(&self) -> Result<Option<Session>, IdentityError> {
        Ok(self.startup.clone())
    }
}

/// Wait until the published snapshot satisfies `pred`, or panic after two
/// seconds.
pub async fn wait_for_snapshot(
    rx: &mut watch::Receiver<AuthSnapshot>,
    pred: impl Fn(&AuthSnapshot) -> bool,
) -> AuthSnapshot {
    tokio::time::timeout(Duration::from_secs(2), async {
        loop {
            {
                let snapshot = rx.borrow_and_update();
                if pred(&snapshot) {
                    return snapshot.clone();
                }
            }
            rx.changed().await.expect("publisher alive");
        }
    })
    .await
    .expect("snapshot condition not reached in time")
}
