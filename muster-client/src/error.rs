//! Error types for the backend client.

use crate::config::ConfigError;
use muster_core::SessionError;

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("WebSocket error: {0}")]
    WebSocket(Box<tokio_tungstenite::tungstenite::Error>),
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("Unexpected response: {0}")]
    InvalidResponse(String),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl From<tokio_tungstenite::tungstenite::Error> for ClientError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        Self::WebSocket(Box::new(err))
    }
}

impl ClientError {
    /// Collapse into the shared session error at the source boundary.
    ///
    /// Session errors are cloneable values handed to every single-flight
    /// waiter, so only the message crosses over.
    pub fn into_query_error(self) -> SessionError {
        SessionError::QueryFailed {
            reason: self.to_string(),
        }
    }

    pub fn into_sign_out_error(self) -> SessionError {
        SessionError::SignOutFailed {
            reason: self.to_string(),
        }
    }
}
