//! Muster Test Utilities
//!
//! Centralized test infrastructure for the Muster workspace:
//! - A programmable mock of the backend session layer
//! - Deterministic identity fixtures
//! - Proptest generators for session types

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use chrono::DateTime;
use muster_core::{Identity, SessionError, SessionEvent, SessionResult};
use muster_session::SessionEventSource;
use proptest::prelude::*;
use tokio::sync::{broadcast, watch};
use uuid::Uuid;

// ============================================================================
// FIXTURES
// ============================================================================

/// Deterministic identity fixture: the same name always produces the same
/// identity, so fixtures compare equal across calls.
pub fn identity_fixture(name: &str) -> Identity {
    let mut bytes = [0u8; 16];
    for (i, byte) in name.bytes().enumerate() {
        bytes[i % 16] = bytes[i % 16].wrapping_add(byte);
    }
    Identity {
        user_id: Uuid::from_bytes(bytes),
        email: format!("{name}@example.org"),
        display_name: Some(name.to_string()),
        avatar_url: None,
        email_verified: true,
        created_at: DateTime::from_timestamp(1_736_932_200, 0).expect("valid fixture timestamp"),
        last_sign_in_at: None,
    }
}

// ============================================================================
// MOCK SESSION SOURCE
// ============================================================================

/// Programmable mock of the backend session layer.
///
/// Tests script the outcome of identity queries, count how many queries the
/// code under test actually issued, push lifecycle events, and hold queries
/// open to control resolution timing.
pub struct MockSessionSource {
    outcome: Mutex<SessionResult<Option<Identity>>>,
    queued: Mutex<VecDeque<SessionResult<Option<Identity>>>>,
    query_count: AtomicUsize,
    gate: watch::Sender<bool>,
    events: broadcast::Sender<SessionEvent>,
}

impl MockSessionSource {
    /// A source whose queries resolve to "no session".
    pub fn new() -> Arc<Self> {
        let (gate, _) = watch::channel(true);
        let (events, _) = broadcast::channel(64);
        Arc::new(Self {
            outcome: Mutex::new(Ok(None)),
            queued: Mutex::new(VecDeque::new()),
            query_count: AtomicUsize::new(0),
            gate,
            events,
        })
    }

    /// A source whose queries resolve to the given identity.
    pub fn with_identity(identity: Identity) -> Arc<Self> {
        let source = Self::new();
        source.set_identity(Some(identity));
        source
    }

    /// Set the steady-state outcome of future queries.
    pub fn set_outcome(&self, outcome: SessionResult<Option<Identity>>) {
        *lock(&self.outcome) = outcome;
    }

    pub fn set_identity(&self, identity: Option<Identity>) {
        self.set_outcome(Ok(identity));
    }

    pub fn fail_with(&self, error: SessionError) {
        self.set_outcome(Err(error));
    }

    /// Queue a one-shot outcome consumed by the next query, ahead of the
    /// steady-state outcome.
    pub fn queue_outcome(&self, outcome: SessionResult<Option<Identity>>) {
        lock(&self.queued).push_back(outcome);
    }

    /// How many identity queries have been issued so far.
    pub fn query_count(&self) -> usize {
        self.query_count.load(Ordering::SeqCst)
    }

    /// Push a lifecycle event to all subscribers.
    pub fn push(&self, event: SessionEvent) {
        let _ = self.events.send(event);
    }

    /// Hold all queries open until the returned gate is released or
    /// dropped. Queries still count toward `query_count` while held.
    pub fn hold_queries(&self) -> QueryGate {
        self.gate.send_replace(false);
        QueryGate {
            gate: self.gate.clone(),
        }
    }
}

/// Releases held queries when dropped.
pub struct QueryGate {
    gate: watch::Sender<bool>,
}

impl QueryGate {
    pub fn release(self) {}
}

impl Drop for QueryGate {
    fn drop(&mut self) {
        let _ = self.gate.send_replace(true);
    }
}

#[async_trait]
impl SessionEventSource for MockSessionSource {
    async fn current_identity(&self) -> SessionResult<Option<Identity>> {
        self.query_count.fetch_add(1, Ordering::SeqCst);
        let mut open = self.gate.subscribe();
        let _ = open.wait_for(|open| *open).await;
        if let Some(queued) = lock(&self.queued).pop_front() {
            return queued;
        }
        lock(&self.outcome).clone()
    }

    fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    async fn sign_out(&self) -> SessionResult<()> {
        self.push(SessionEvent::SignedOut);
        Ok(())
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

/// Generate an arbitrary identity.
pub fn arb_identity() -> impl Strategy<Value = Identity> {
    (
        any::<[u8; 16]>(),
        "[a-z]{3,12}",
        proptest::option::of("[A-Za-z ]{1,24}"),
        any::<bool>(),
    )
        .prop_map(|(id_bytes, name, display_name, email_verified)| Identity {
            user_id: Uuid::from_bytes(id_bytes),
            email: format!("{name}@example.org"),
            display_name,
            avatar_url: None,
            email_verified,
            created_at: DateTime::from_timestamp(1_736_932_200, 0).expect("valid fixture timestamp"),
            last_sign_in_at: None,
        })
}

/// Generate an arbitrary session lifecycle event, including payload-less
/// variants of events that normally carry an identity.
pub fn arb_session_event() -> impl Strategy<Value = SessionEvent> {
    prop_oneof![
        proptest::option::of(arb_identity())
            .prop_map(|identity| SessionEvent::InitialSession { identity }),
        proptest::option::of(arb_identity())
            .prop_map(|identity| SessionEvent::SignedIn { identity }),
        Just(SessionEvent::SignedOut),
        proptest::option::of(arb_identity())
            .prop_map(|identity| SessionEvent::IdentityUpdated { identity }),
        proptest::option::of(arb_identity())
            .prop_map(|identity| SessionEvent::TokenRefreshed { identity }),
    ]
}
