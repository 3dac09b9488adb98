//! Diagnostics projection of the identity cache.

use muster_core::{Timestamp, UserId};
use serde::Serialize;

use crate::cache::IdentitySnapshot;

/// Read-only view of the cache entry for diagnostics surfaces.
///
/// Purely observational: reading it has no side effects, and nothing in the
/// cache consults it.
#[derive(Debug, Clone, Serialize)]
pub struct CacheMetrics {
    pub user_id: Option<UserId>,
    pub email: Option<String>,
    pub fetched_at: Option<Timestamp>,
    pub fetch_pending: bool,
    pub last_error: Option<String>,
}

impl CacheMetrics {
    pub(crate) fn from_snapshot(snapshot: &IdentitySnapshot) -> Self {
        Self {
            user_id: snapshot.identity.as_ref().map(|identity| identity.user_id),
            email: snapshot.identity.as_ref().map(|identity| identity.email.clone()),
            fetched_at: snapshot.fetched_at,
            fetch_pending: snapshot.fetch_pending,
            last_error: snapshot.last_error.as_ref().map(|err| err.to_string()),
        }
    }
}
