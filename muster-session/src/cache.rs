//! Process-wide identity cache with single-flight fetching.
//!
//! The cache holds exactly one slot: the last-known authenticated identity.
//! Mutations come from two places only: the session bootstrap applying push
//! events, and the single-flight fetch path recording pull results. Every
//! other consumer reads snapshots and subscribes to change notifications.
//!
//! # Resolution ordering
//!
//! Every resolution (push write, clear, pull completion) carries a number
//! from one monotonic counter. Push resolutions take their number at apply
//! time; a pull takes its number when the query starts. A pull result is
//! applied only if no higher-numbered resolution landed while the query was
//! in flight; otherwise it is discarded and the newer state stands. This is
//! what keeps a slow fetch from resurrecting an identity that a `SignedOut`
//! push already cleared.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use chrono::Utc;
use futures_util::future::{BoxFuture, FutureExt, Shared};
use muster_core::{Identity, SessionError, Timestamp};
use tokio::sync::{oneshot, watch};

use crate::handle::IdentityHandle;
use crate::metrics::CacheMetrics;
use crate::source::SessionEventSource;

/// Outcome of one underlying identity query, shared by every waiter that
/// joined the fetch.
pub type FetchOutcome = Result<Option<Identity>, SessionError>;

type SharedFetch = Shared<BoxFuture<'static, FetchOutcome>>;

/// Read-only projection of the cache entry.
///
/// Returned by [`IdentityCache::snapshot`] and published on the
/// change-notification channel after every mutation.
#[derive(Debug, Clone, Default)]
pub struct IdentitySnapshot {
    /// Last resolved identity; `None` means signed out or never established.
    pub identity: Option<Identity>,
    /// When the identity was last successfully resolved. Updated on
    /// successful resolutions only, never on reads.
    pub fetched_at: Option<Timestamp>,
    /// Whether an identity query is currently in flight.
    pub fetch_pending: bool,
    /// Error from the most recent failed fetch, cleared by the next
    /// successful resolution.
    pub last_error: Option<SessionError>,
}

impl IdentitySnapshot {
    pub fn is_authenticated(&self) -> bool {
        self.identity.is_some()
    }
}

struct CacheInner {
    identity: Option<Identity>,
    fetched_at: Option<Timestamp>,
    last_error: Option<SessionError>,
    pending: Option<SharedFetch>,
    pending_seq: Option<u64>,
    next_seq: u64,
    last_applied_seq: u64,
}

impl CacheInner {
    fn new() -> Self {
        Self {
            identity: None,
            fetched_at: None,
            last_error: None,
            pending: None,
            pending_seq: None,
            next_seq: 0,
            last_applied_seq: 0,
        }
    }

    fn take_seq(&mut self) -> u64 {
        self.next_seq += 1;
        self.next_seq
    }

    /// Record a successful resolution: replace the identity wholesale,
    /// stamp the time, drop any stale error and pending handle.
    fn apply(&mut self, seq: u64, identity: Option<Identity>) {
        self.last_applied_seq = seq;
        self.identity = identity;
        self.fetched_at = Some(Utc::now());
        self.last_error = None;
        self.pending = None;
        self.pending_seq = None;
    }
}

/// The process-wide identity cache.
///
/// Constructed once per process (or per tab in embedded use) via
/// [`IdentityCache::new`] and shared as an `Arc`. All field mutations are
/// synchronous under one lock; only the underlying network query suspends.
pub struct IdentityCache {
    source: Arc<dyn SessionEventSource>,
    inner: Mutex<CacheInner>,
    changes: watch::Sender<IdentitySnapshot>,
    bootstrapped: AtomicBool,
    self_ref: Weak<IdentityCache>,
}

impl IdentityCache {
    /// Create the cache with all fields empty.
    pub fn new(source: Arc<dyn SessionEventSource>) -> Arc<Self> {
        let (changes, _) = watch::channel(IdentitySnapshot::default());
        Arc::new_cyclic(|self_ref| Self {
            source,
            inner: Mutex::new(CacheInner::new()),
            changes,
            bootstrapped: AtomicBool::new(false),
            self_ref: self_ref.clone(),
        })
    }

    /// The backend session layer this cache pulls from.
    pub fn source(&self) -> &Arc<dyn SessionEventSource> {
        &self.source
    }

    /// Side-effect-free read of the current entry. Never triggers a fetch.
    pub fn snapshot(&self) -> IdentitySnapshot {
        let inner = self.lock_inner();
        snapshot_of(&inner)
    }

    /// Subscribe to change notifications. The receiver yields the snapshot
    /// published by each mutation, in publication order.
    pub fn subscribe(&self) -> watch::Receiver<IdentitySnapshot> {
        self.changes.subscribe()
    }

    /// Create a consumer handle. `staleness_window` bounds how old a cached
    /// identity may be before reads trigger a re-fetch; `None` trusts any
    /// cached value.
    pub fn watch(self: &Arc<Self>, staleness_window: Option<Duration>) -> IdentityHandle {
        IdentityHandle::new(Arc::clone(self), staleness_window)
    }

    /// Diagnostics projection of the current entry.
    pub fn metrics(&self) -> CacheMetrics {
        CacheMetrics::from_snapshot(&self.snapshot())
    }

    /// Single-flight pull of the current identity.
    ///
    /// If a query is already in flight, returns a handle to it instead of
    /// starting a new one; all joined callers resolve to the same outcome.
    /// The slot is claimed synchronously at call time, before the returned
    /// future is first polled. A failure is recorded in `last_error` but
    /// leaves the previously cached identity intact. Must be called from
    /// within a Tokio runtime.
    pub fn fetch_once(&self) -> impl Future<Output = FetchOutcome> + Send + 'static {
        self.shared_fetch()
    }

    /// Unconditionally record a pushed identity.
    pub(crate) fn write(&self, identity: Identity) {
        let mut inner = self.lock_inner();
        let seq = inner.take_seq();
        inner.apply(seq, Some(identity));
        self.publish(&inner);
    }

    /// Record a signed-out state. The entry stays populated but empty.
    pub(crate) fn clear(&self) {
        let mut inner = self.lock_inner();
        let seq = inner.take_seq();
        inner.apply(seq, None);
        self.publish(&inner);
    }

    pub(crate) fn claim_bootstrap(&self) -> bool {
        self.bootstrapped
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    pub(crate) fn release_bootstrap(&self) {
        self.bootstrapped.store(false, Ordering::SeqCst);
    }

    fn lock_inner(&self) -> MutexGuard<'_, CacheInner> {
        // Every mutation leaves the entry coherent, so the state inside a
        // poisoned lock is still a valid snapshot.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, inner: &CacheInner) {
        self.changes.send_replace(snapshot_of(inner));
    }

    fn shared_fetch(&self) -> SharedFetch {
        let mut inner = self.lock_inner();
        if let Some(pending) = &inner.pending {
            return pending.clone();
        }

        let seq = inner.take_seq();
        let (tx, rx) = oneshot::channel::<FetchOutcome>();
        let source = Arc::clone(&self.source);
        let weak = self.self_ref.clone();
        // The query runs on its own task so it completes and releases the
        // single-flight slot even if every waiter is dropped. If the cache
        // itself is gone by then, the result has no observer and is ignored.
        tokio::spawn(async move {
            let outcome = source.current_identity().await;
            if let Some(cache) = weak.upgrade() {
                cache.complete_fetch(seq, &outcome);
            }
            let _ = tx.send(outcome);
        });

        let shared: SharedFetch = rx
            .map(|received| received.unwrap_or(Err(SessionError::FetchAbandoned)))
            .boxed()
            .shared();
        inner.pending = Some(shared.clone());
        inner.pending_seq = Some(seq);
        self.publish(&inner);
        shared
    }

    fn complete_fetch(&self, seq: u64, outcome: &FetchOutcome) {
        let mut inner = self.lock_inner();
        // Release the slot only if it is still ours; a push may have
        // dropped it and a newer fetch may occupy it by now.
        if inner.pending_seq == Some(seq) {
            inner.pending = None;
            inner.pending_seq = None;
        }
        if seq <= inner.last_applied_seq {
            // Superseded while in flight; the newer resolution wins and
            // this result is discarded entirely.
            self.publish(&inner);
            return;
        }
        match outcome {
            Ok(identity) => inner.apply(seq, identity.clone()),
            Err(err) => {
                // Stale-but-present beats signed-out on a transient blip.
                inner.last_error = Some(err.clone());
            }
        }
        self.publish(&inner);
    }
}

fn snapshot_of(inner: &CacheInner) -> IdentitySnapshot {
    IdentitySnapshot {
        identity: inner.identity.clone(),
        fetched_at: inner.fetched_at,
        fetch_pending: inner.pending.is_some(),
        last_error: inner.last_error.clone(),
    }
}
