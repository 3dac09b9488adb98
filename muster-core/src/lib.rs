//! Muster Core - Shared Data Types
//!
//! Pure data structures with no behavior. All other crates depend on this.
//! The session types here describe what the hosted auth backend knows about
//! the signed-in volunteer; the session crates hold read-only copies and
//! only ever replace whole values.

mod error;
mod event;
mod identity;

pub use error::{SessionError, SessionResult};
pub use event::SessionEvent;
pub use identity::{new_user_id, Identity, Timestamp, UserId};
