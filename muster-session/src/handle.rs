//! Consumer-facing read contract.
//!
//! An [`IdentityHandle`] is what a view, route guard, or background job
//! holds to answer "who is signed in". Handles are cheap, independent, and
//! attach or detach at any time; none of them can mutate the cache beyond
//! triggering deduplicated fetches.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use muster_core::{Identity, SessionError};
use tokio::sync::watch;

use crate::cache::{FetchOutcome, IdentityCache, IdentitySnapshot};

/// State of the signed-in identity as seen by one consumer.
#[derive(Debug, Clone)]
pub struct IdentityState {
    /// Cached identity, possibly stale while a re-fetch is in flight.
    pub identity: Option<Identity>,
    /// True while a fetch is pending and no fresh cached value exists.
    pub is_loading: bool,
    /// Error from the most recent failed fetch, regardless of which
    /// consumer initiated it.
    pub error: Option<SessionError>,
}

impl IdentityState {
    pub fn is_authenticated(&self) -> bool {
        self.identity.is_some()
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// A consumer's view onto the identity cache.
///
/// Created via [`IdentityCache::watch`]. Dropping the handle detaches the
/// consumer; the cache and any in-flight fetch are unaffected.
pub struct IdentityHandle {
    cache: Arc<IdentityCache>,
    rx: watch::Receiver<IdentitySnapshot>,
    staleness_window: Option<Duration>,
}

impl IdentityHandle {
    pub(crate) fn new(cache: Arc<IdentityCache>, staleness_window: Option<Duration>) -> Self {
        let rx = cache.subscribe();
        Self {
            cache,
            rx,
            staleness_window,
        }
    }

    /// Synchronous, side-effect-free view of the current state.
    pub fn state(&self) -> IdentityState {
        let snapshot = self.rx.borrow().clone();
        self.state_of(&snapshot)
    }

    /// Resolve the identity, fetching only when the cached value is absent
    /// or older than the staleness window.
    ///
    /// A fresh cached identity returns immediately with `is_loading` false
    /// and no query issued. Otherwise this joins the shared single-flight
    /// fetch and returns the state after it resolves.
    pub async fn current(&mut self) -> IdentityState {
        let snapshot = self.rx.borrow_and_update().clone();
        if self.is_fresh(&snapshot) {
            return self.state_of(&snapshot);
        }
        let _ = self.cache.fetch_once().await;
        let latest = self.rx.borrow_and_update().clone();
        self.state_of(&latest)
    }

    /// Wait for the next cache change and return the new state.
    ///
    /// Fires on every mutation: push-driven writes, sign-outs, and fetches
    /// initiated by any consumer.
    pub async fn changed(&mut self) -> IdentityState {
        // The cache owns the sender and this handle owns the cache, so the
        // channel cannot close while we wait.
        let _ = self.rx.changed().await;
        let snapshot = self.rx.borrow_and_update().clone();
        self.state_of(&snapshot)
    }

    /// Force a pull even when the cache looks fresh.
    ///
    /// Joins an already-pending fetch rather than duplicating work.
    pub async fn refresh(&self) -> FetchOutcome {
        self.cache.fetch_once().await
    }

    fn state_of(&self, snapshot: &IdentitySnapshot) -> IdentityState {
        let fresh = self.is_fresh(snapshot);
        IdentityState {
            is_loading: snapshot.fetch_pending && !fresh,
            identity: snapshot.identity.clone(),
            error: snapshot.last_error.clone(),
        }
    }

    fn is_fresh(&self, snapshot: &IdentitySnapshot) -> bool {
        if snapshot.identity.is_none() {
            return false;
        }
        let Some(window) = self.staleness_window else {
            // No window configured: any cached identity is trusted.
            return true;
        };
        let Some(fetched_at) = snapshot.fetched_at else {
            return false;
        };
        match Utc::now().signed_duration_since(fetched_at).to_std() {
            Ok(age) => age < window,
            // A resolution stamped in the future can only be fresher than
            // the window allows for.
            Err(_) => true,
        }
    }
}
