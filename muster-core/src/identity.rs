//! Identity types for Muster principals

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// User identifier using UUIDv7 for timestamp-sortable IDs.
pub type UserId = Uuid;

/// Timestamp type using UTC timezone.
pub type Timestamp = DateTime<Utc>;

/// Generate a new UUIDv7 UserId (timestamp-sortable).
pub fn new_user_id() -> UserId {
    Uuid::now_v7()
}

/// The authenticated principal as known to the backend session layer.
///
/// Owned by the session layer; caches hold a read-only copy and replace the
/// whole value on every resolution, never individual fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Identity {
    pub user_id: UserId,
    pub email: String,
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
    pub email_verified: bool,
    pub created_at: Timestamp,
    pub last_sign_in_at: Option<Timestamp>,
}

impl Identity {
    /// Short label for log lines: display name when set, email otherwise.
    pub fn label(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.email)
    }
}
