//! Backend session layer contract.
//!
//! This trait abstracts the hosted auth service, allowing the cache to work
//! with any backend (or a mock in tests).

use async_trait::async_trait;
use muster_core::{Identity, SessionEvent, SessionResult};
use tokio::sync::broadcast;

/// The backend session layer: a push stream of lifecycle events plus a
/// point-in-time identity query.
///
/// The push and pull sides describe the same underlying session, so a
/// subscriber that applies every event on top of one initial query always
/// converges on the backend's view.
#[async_trait]
pub trait SessionEventSource: Send + Sync {
    /// Point-in-time query for the current identity.
    ///
    /// Resolves to `Ok(None)` when no session exists; errors are reserved
    /// for transport and decoding failures.
    async fn current_identity(&self) -> SessionResult<Option<Identity>>;

    /// Subscribe to the session lifecycle event stream.
    ///
    /// Dropping the receiver unsubscribes.
    fn subscribe(&self) -> broadcast::Receiver<SessionEvent>;

    /// Terminate the backend session.
    ///
    /// Callers must not mutate any cache directly on success; the cache
    /// reacts to the resulting `SignedOut` push event.
    async fn sign_out(&self) -> SessionResult<()>;
}
