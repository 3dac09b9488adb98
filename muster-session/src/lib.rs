//! Muster Session - Identity Cache and Bootstrap
//!
//! This crate is the client-side source of truth for "who is signed in".
//! It holds exactly one identity slot per process, kept consistent with the
//! backend session layer two ways at once:
//!
//! - **Push**: [`SessionBootstrap`] subscribes to the backend's lifecycle
//!   event stream and translates each event into a cache mutation.
//! - **Pull**: [`IdentityCache::fetch_once`] runs the point-in-time
//!   identity query with single-flight deduplication, so any number of
//!   concurrent consumers cost at most one network round trip.
//!
//! Consumers hold an [`IdentityHandle`]: a cheap, read-only view that
//! resolves from cache when fresh, joins the shared fetch when not, and
//! wakes on every cache change regardless of who caused it.
//!
//! # Wiring
//!
//! ```ignore
//! let source = BackendSessionSource::connect(&config)?;
//! let cache = IdentityCache::new(source);
//! let _bootstrap = SessionBootstrap::spawn(Arc::clone(&cache))?;
//!
//! let mut identity = cache.watch(config.staleness_window());
//! let state = identity.current().await;
//! if state.is_authenticated() { /* render signed-in surface */ }
//! ```

mod bootstrap;
mod cache;
mod handle;
mod metrics;
mod source;

pub use bootstrap::SessionBootstrap;
pub use cache::{FetchOutcome, IdentityCache, IdentitySnapshot};
pub use handle::{IdentityHandle, IdentityState};
pub use metrics::CacheMetrics;
pub use source::SessionEventSource;

// Re-export core types for convenience
pub use muster_core::{Identity, SessionError, SessionEvent, SessionResult, Timestamp, UserId};
