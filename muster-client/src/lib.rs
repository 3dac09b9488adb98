//! Muster Client - Hosted Auth Backend Bindings
//!
//! Concrete [`muster_session::SessionEventSource`] for the platform's
//! hosted auth service: REST for the point-in-time identity query and
//! sign-out, a reconnecting WebSocket pump for pushed lifecycle events,
//! and TOML configuration.
//!
//! ```ignore
//! let config = ClientConfig::load()?;
//! let source = BackendSessionSource::connect(&config)?;
//! let cache = IdentityCache::new(source);
//! ```

pub mod auth_api;
pub mod config;
pub mod error;
mod realtime;
pub mod source;

pub use auth_api::AuthApiClient;
pub use config::{ClientConfig, ConfigError, ReconnectConfig};
pub use error::ClientError;
pub use source::BackendSessionSource;
