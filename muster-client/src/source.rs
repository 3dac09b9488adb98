//! `SessionEventSource` backed by the hosted auth service.

use crate::auth_api::AuthApiClient;
use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::realtime;
use async_trait::async_trait;
use muster_core::{Identity, SessionEvent, SessionResult};
use muster_session::SessionEventSource;
use std::sync::Arc;
use tokio::sync::broadcast;

/// Sized for bursts around sign-in flows; the bootstrap resynchronizes
/// with a pull if it ever lags past this.
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// The backend session layer: REST for point-in-time queries and sign-out,
/// WebSocket for pushed lifecycle events.
pub struct BackendSessionSource {
    api: AuthApiClient,
    events: broadcast::Sender<SessionEvent>,
}

impl BackendSessionSource {
    /// Validate the config, build the REST client, and start the realtime
    /// pump. Must be called from within a Tokio runtime.
    pub fn connect(config: &ClientConfig) -> Result<Arc<Self>, ClientError> {
        config.validate()?;
        let api = AuthApiClient::new(config)?;
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        realtime::spawn_event_pump(
            config.ws_endpoint.clone(),
            config.reconnect.clone(),
            events.clone(),
        );
        Ok(Arc::new(Self { api, events }))
    }
}

#[async_trait]
impl SessionEventSource for BackendSessionSource {
    async fn current_identity(&self) -> SessionResult<Option<Identity>> {
        self.api
            .current_identity()
            .await
            .map_err(ClientError::into_query_error)
    }

    fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    async fn sign_out(&self) -> SessionResult<()> {
        self.api
            .sign_out()
            .await
            .map_err(ClientError::into_sign_out_error)
    }
}
