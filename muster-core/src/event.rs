//! Session Lifecycle Events
//!
//! This module defines the events the backend session layer pushes to
//! connected clients whenever the signed-in identity changes.

use crate::identity::Identity;
use serde::{Deserialize, Serialize};

/// Session lifecycle event pushed by the backend.
///
/// The identity payload is optional on the wire: the backend may emit an
/// event whose payload was dropped or never attached. Consumers decide how
/// to treat an expected-but-missing payload; this type only records what
/// arrived.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SessionEvent {
    /// Identity resolved during startup, before any explicit sign-in.
    /// An absent payload means no session existed at startup.
    InitialSession { identity: Option<Identity> },

    /// The user completed a sign-in.
    SignedIn { identity: Option<Identity> },

    /// The user signed out; no identity accompanies this event.
    SignedOut,

    /// The identity's attributes changed (profile edit, email change).
    IdentityUpdated { identity: Option<Identity> },

    /// The access token was refreshed; the identity is re-attached so
    /// receivers can treat the refresh as a fresh resolution.
    TokenRefreshed { identity: Option<Identity> },
}

impl SessionEvent {
    /// Get the event type as a string for logging/debugging.
    pub fn event_type(&self) -> &'static str {
        match self {
            SessionEvent::InitialSession { .. } => "InitialSession",
            SessionEvent::SignedIn { .. } => "SignedIn",
            SessionEvent::SignedOut => "SignedOut",
            SessionEvent::IdentityUpdated { .. } => "IdentityUpdated",
            SessionEvent::TokenRefreshed { .. } => "TokenRefreshed",
        }
    }

    /// Whether this event kind semantically carries an identity.
    ///
    /// `InitialSession` is excluded: an absent payload there means "no
    /// session at startup", which is a valid state rather than a dropped
    /// payload.
    pub fn expects_identity(&self) -> bool {
        matches!(
            self,
            SessionEvent::SignedIn { .. }
                | SessionEvent::IdentityUpdated { .. }
                | SessionEvent::TokenRefreshed { .. }
        )
    }

    /// The identity payload, if one arrived.
    pub fn identity(&self) -> Option<&Identity> {
        match self {
            SessionEvent::InitialSession { identity }
            | SessionEvent::SignedIn { identity }
            | SessionEvent::IdentityUpdated { identity }
            | SessionEvent::TokenRefreshed { identity } => identity.as_ref(),
            SessionEvent::SignedOut => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::new_user_id;
    use chrono::Utc;

    fn sample_identity() -> Identity {
        Identity {
            user_id: new_user_id(),
            email: "vol@example.org".to_string(),
            display_name: None,
            avatar_url: None,
            email_verified: true,
            created_at: Utc::now(),
            last_sign_in_at: None,
        }
    }

    #[test]
    fn test_event_type_names() {
        let event = SessionEvent::SignedIn {
            identity: Some(sample_identity()),
        };
        assert_eq!(event.event_type(), "SignedIn");
        assert_eq!(SessionEvent::SignedOut.event_type(), "SignedOut");
    }

    #[test]
    fn test_expects_identity() {
        assert!(SessionEvent::SignedIn { identity: None }.expects_identity());
        assert!(SessionEvent::IdentityUpdated { identity: None }.expects_identity());
        assert!(SessionEvent::TokenRefreshed { identity: None }.expects_identity());
        assert!(!SessionEvent::InitialSession { identity: None }.expects_identity());
        assert!(!SessionEvent::SignedOut.expects_identity());
    }

    #[test]
    fn test_identity_accessor() {
        let identity = sample_identity();
        let event = SessionEvent::TokenRefreshed {
            identity: Some(identity.clone()),
        };
        assert_eq!(event.identity(), Some(&identity));
        assert_eq!(SessionEvent::SignedOut.identity(), None);
    }

    #[test]
    fn test_event_serialization() {
        let event = SessionEvent::SignedIn {
            identity: Some(sample_identity()),
        };

        let json = serde_json::to_string(&event).expect("Failed to serialize");
        let deserialized: SessionEvent = serde_json::from_str(&json).expect("Failed to deserialize");

        assert_eq!(event, deserialized);
    }

    #[test]
    fn test_event_wire_tag() {
        let json = serde_json::to_value(SessionEvent::SignedOut).expect("Failed to serialize");
        assert_eq!(json["type"], "SignedOut");
    }
}

// ============================================================================
// PROPERTY-BASED TESTS
// ============================================================================

#[cfg(test)]
mod prop_tests {
    use super::*;
    use crate::identity::Identity;
    use chrono::DateTime;
    use proptest::prelude::*;
    use uuid::Uuid;

    fn arb_identity() -> impl Strategy<Value = Identity> {
        (any::<[u8; 16]>(), "[a-z]{3,12}", any::<bool>()).prop_map(
            |(id_bytes, name, email_verified)| Identity {
                user_id: Uuid::from_bytes(id_bytes),
                email: format!("{name}@example.org"),
                display_name: None,
                avatar_url: None,
                email_verified,
                created_at: DateTime::from_timestamp(1_736_932_200, 0)
                    .expect("valid fixture timestamp"),
                last_sign_in_at: None,
            },
        )
    }

    fn arb_event() -> impl Strategy<Value = SessionEvent> {
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

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// Property: every event survives a wire round trip unchanged.
        #[test]
        fn prop_event_round_trips(event in arb_event()) {
            let json = serde_json::to_string(&event).expect("serialize");
            let decoded: SessionEvent = serde_json::from_str(&json).expect("deserialize");
            prop_assert_eq!(event, decoded);
        }

        /// Property: the identity accessor agrees with expects_identity for
        /// payload-carrying events.
        #[test]
        fn prop_identity_accessor_consistent(event in arb_event()) {
            if event.identity().is_some() {
                prop_assert_ne!(event.event_type(), "SignedOut");
            }
        }
    }
}
