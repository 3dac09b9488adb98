//! Session bootstrap: the bridge from backend push events to the cache.
//!
//! Exactly one bootstrap may be active per cache. It subscribes to the
//! event stream before running the initial pull, so an event pushed during
//! startup can never be lost to the race, and it is the only push-driven
//! writer of the cache.

use std::sync::Arc;

use muster_core::{SessionError, SessionEvent, SessionResult};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::cache::IdentityCache;

/// Owns the subscription to the backend session event stream.
///
/// Dropping the bootstrap aborts its task, which drops the broadcast
/// receiver (unsubscribing on every exit path) and releases the
/// single-instance claim so a later bootstrap may start.
pub struct SessionBootstrap {
    cache: Arc<IdentityCache>,
    task: JoinHandle<()>,
}

impl SessionBootstrap {
    /// Start the bootstrap for `cache`.
    ///
    /// Fails with [`SessionError::AlreadyBootstrapped`] if another bootstrap
    /// is active for the same cache; duplicate push handlers would apply
    /// every event twice. Must be called from within a Tokio runtime.
    pub fn spawn(cache: Arc<IdentityCache>) -> SessionResult<Self> {
        if !cache.claim_bootstrap() {
            return Err(SessionError::AlreadyBootstrapped);
        }
        // Subscribe before the initial pull so nothing pushed during
        // startup is missed.
        let events = cache.source().subscribe();
        let task = tokio::spawn(run(Arc::clone(&cache), events));
        Ok(Self { cache, task })
    }

    /// Whether the event-processing task is still running.
    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }
}

impl Drop for SessionBootstrap {
    fn drop(&mut self) {
        self.task.abort();
        self.cache.release_bootstrap();
    }
}

async fn run(cache: Arc<IdentityCache>, mut events: broadcast::Receiver<SessionEvent>) {
    // Initial pull; a failure is recorded in the cache and consumers may
    // retry, so the event loop starts regardless.
    let _ = cache.fetch_once().await;

    loop {
        match events.recv().await {
            Ok(event) => apply_event(&cache, event),
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                // Events were dropped; a gapped stream cannot be trusted,
                // so resynchronize with a pull.
                tracing::warn!(skipped, "session event stream lagged, resynchronizing");
                let _ = cache.fetch_once().await;
            }
            Err(broadcast::error::RecvError::Closed) => {
                tracing::debug!("session event stream closed");
                break;
            }
        }
    }
}

/// Apply one push event to the cache.
pub(crate) fn apply_event(cache: &IdentityCache, event: SessionEvent) {
    match event {
        SessionEvent::SignedOut => cache.clear(),
        // No session existed at startup.
        SessionEvent::InitialSession { identity: None } => cache.clear(),
        SessionEvent::InitialSession {
            identity: Some(identity),
        }
        | SessionEvent::SignedIn {
            identity: Some(identity),
        }
        | SessionEvent::IdentityUpdated {
            identity: Some(identity),
        }
        | SessionEvent::TokenRefreshed {
            identity: Some(identity),
        } => cache.write(identity),
        event => {
            // The event should have carried an identity. Never leave a
            // stale one in place when the backend implies absence.
            tracing::warn!(
                event = event.event_type(),
                "session event missing identity payload, clearing cache"
            );
            cache.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use muster_test_utils::{identity_fixture, MockSessionSource};

    #[test]
    fn test_apply_signed_in_writes_identity() {
        let cache = IdentityCache::new(MockSessionSource::new());

        apply_event(
            &cache,
            SessionEvent::SignedIn {
                identity: Some(identity_fixture("rowan")),
            },
        );

        assert_eq!(cache.snapshot().identity, Some(identity_fixture("rowan")));
    }

    #[test]
    fn test_apply_signed_out_clears() {
        let cache = IdentityCache::new(MockSessionSource::new());
        apply_event(
            &cache,
            SessionEvent::SignedIn {
                identity: Some(identity_fixture("rowan")),
            },
        );

        apply_event(&cache, SessionEvent::SignedOut);

        assert!(cache.snapshot().identity.is_none());
    }

    #[test]
    fn test_apply_initial_session_without_identity_clears() {
        let cache = IdentityCache::new(MockSessionSource::new());
        apply_event(&cache, SessionEvent::InitialSession { identity: None });
        assert!(cache.snapshot().identity.is_none());
        assert!(cache.snapshot().fetched_at.is_some());
    }

    #[test]
    fn test_apply_token_refresh_counts_as_fresh_resolution() {
        let cache = IdentityCache::new(MockSessionSource::new());
        apply_event(
            &cache,
            SessionEvent::SignedIn {
                identity: Some(identity_fixture("rowan")),
            },
        );
        let first = cache.snapshot().fetched_at;
        std::thread::sleep(std::time::Duration::from_millis(2));

        apply_event(
            &cache,
            SessionEvent::TokenRefreshed {
                identity: Some(identity_fixture("rowan")),
            },
        );

        assert!(cache.snapshot().fetched_at > first);
    }

    #[test]
    fn test_missing_payload_is_treated_as_clear() {
        let cache = IdentityCache::new(MockSessionSource::new());
        apply_event(
            &cache,
            SessionEvent::SignedIn {
                identity: Some(identity_fixture("rowan")),
            },
        );

        apply_event(&cache, SessionEvent::IdentityUpdated { identity: None });

        assert!(cache.snapshot().identity.is_none());
    }

    #[tokio::test]
    async fn test_second_bootstrap_fails_loudly() {
        let source = MockSessionSource::new();
        let cache = IdentityCache::new(source);

        let first = SessionBootstrap::spawn(Arc::clone(&cache)).expect("first bootstrap");
        let second = SessionBootstrap::spawn(Arc::clone(&cache));

        assert!(matches!(second, Err(SessionError::AlreadyBootstrapped)));
        drop(first);
    }

    #[tokio::test]
    async fn test_bootstrap_can_restart_after_teardown() {
        let source = MockSessionSource::new();
        let cache = IdentityCache::new(source);

        let first = SessionBootstrap::spawn(Arc::clone(&cache)).expect("first bootstrap");
        drop(first);
        let second = SessionBootstrap::spawn(Arc::clone(&cache));

        assert!(second.is_ok());
    }
}

// ============================================================================
// PROPERTY-BASED TESTS
// ============================================================================
