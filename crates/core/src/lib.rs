//! Ridgeline Core - Shared types library.
//!
//! This crate provides common types used across the Ridgeline site components:
//! - `auth` - Session identity and admin-authorization subsystem
//! - `integration-tests` - Cross-component flow tests
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no HTTP clients. This keeps
//! it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for user IDs, bearer tokens, and emails

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
