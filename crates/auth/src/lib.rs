//! Ridgeline authorization subsystem.
//!
//! Sits between the hosted identity service and the privileged admin-verify
//! endpoint, and answers "is the current user an admin" for the rest of the
//! site without blocking the primary auth state on the verification round
//! trip.
//!
//! # Architecture
//!
//! - [`store`] - Session-scoped storage for the single cached status record
//! - [`cache`] - Time-bounded single-slot admin status cache (5-minute TTL)
//! - [`verify`] - HTTP client for the admin verification authority
//! - [`gate`] - Orchestration: cache lookup, verification, fail-closed result
//! - [`publisher`] - Keeps the `{user, session, is_loading, is_admin}` read
//!   model consistent with identity-service events
//!
//! Every failure path inside this crate resolves to a safe default (`None`
//! or `false`) rather than propagating an error; an unverifiable user is
//! never treated as an admin.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cache;
pub mod config;
pub mod gate;
pub mod models;
pub mod publisher;
pub mod store;
pub mod verify;
