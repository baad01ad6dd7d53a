//! Core types for the Ridgeline site.
//!
//! This module provides type-safe wrappers for common identity concepts.

pub mod email;
pub mod token;
pub mod user;

pub use email::{Email, EmailError};
pub use token::AccessToken;
pub use user::{UserId, UserIdError};
