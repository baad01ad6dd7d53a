//! Identity and auth-state models.

pub mod session;
pub mod snapshot;

pub use session::{Session, SessionChange, UserIdentity};
pub use snapshot::AuthSnapshot;
