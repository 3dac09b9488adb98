//! REST bindings for the hosted auth service.

use crate::config::{ClientConfig, ConfigError};
use crate::error::ClientError;
use muster_core::{Identity, Timestamp};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::StatusCode;
use serde::Deserialize;
use std::time::Duration;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct AuthApiClient {
    client: reqwest::Client,
    base_url: String,
    auth_headers: HeaderMap,
}

impl AuthApiClient {
    pub fn new(config: &ClientConfig) -> Result<Self, ClientError> {
        let timeout = Duration::from_millis(config.request_timeout_ms);
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        let auth_headers = build_auth_headers(config)?;
        Ok(Self {
            client,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            auth_headers,
        })
    }

    /// Point-in-time query for the signed-in user.
    ///
    /// `Ok(None)` when no session exists; the auth service answers 401 for
    /// a missing or expired session, which is not an error here.
    pub async fn current_identity(&self) -> Result<Option<Identity>, ClientError> {
        let url = format!("{}/auth/v1/user", self.base_url);
        let response = self
            .client
            .get(&url)
            .headers(self.auth_headers.clone())
            .send()
            .await?;

        match response.status() {
            StatusCode::UNAUTHORIZED | StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => {
                let payload: UserPayload = response.json().await?;
                Ok(Some(payload.into_identity()?))
            }
            status => Err(ClientError::InvalidResponse(format!(
                "identity query returned {status}"
            ))),
        }
    }

    /// Terminate the backend session. The session layer pushes the
    /// resulting `SignedOut` event to every connected client.
    pub async fn sign_out(&self) -> Result<(), ClientError> {
        let url = format!("{}/auth/v1/logout", self.base_url);
        let response = self
            .client
            .post(&url)
            .headers(self.auth_headers.clone())
            .send()
            .await?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(ClientError::InvalidResponse(format!(
                "sign-out returned {}",
                response.status()
            )))
        }
    }
}

fn build_auth_headers(config: &ClientConfig) -> Result<HeaderMap, ClientError> {
    let mut headers = HeaderMap::new();
    let api_key = HeaderValue::from_str(&config.api_key).map_err(|_| {
        ConfigError::InvalidValue {
            field: "api_key",
            reason: "contains characters not valid in a header".to_string(),
        }
    })?;
    headers.insert("apikey", api_key);

    if let Some(token) = &config.access_token {
        let bearer = HeaderValue::from_str(&format!("Bearer {token}")).map_err(|_| {
            ConfigError::InvalidValue {
                field: "access_token",
                reason: "contains characters not valid in a header".to_string(),
            }
        })?;
        headers.insert(AUTHORIZATION, bearer);
    }
    Ok(headers)
}

/// Wire shape of the auth service's user record.
#[derive(Debug, Deserialize)]
struct UserPayload {
    id: Uuid,
    email: Option<String>,
    email_confirmed_at: Option<Timestamp>,
    created_at: Timestamp,
    last_sign_in_at: Option<Timestamp>,
    #[serde(default)]
    user_metadata: UserMetadata,
}

#[derive(Debug, Default, Deserialize)]
struct UserMetadata {
    full_name: Option<String>,
    avatar_url: Option<String>,
}

impl UserPayload {
    fn into_identity(self) -> Result<Identity, ClientError> {
        let email = self
            .email
            .filter(|email| !email.is_empty())
            .ok_or_else(|| ClientError::InvalidResponse("user record missing email".to_string()))?;

        Ok(Identity {
            user_id: self.id,
            email,
            display_name: self.user_metadata.full_name,
            avatar_url: self.user_metadata.avatar_url,
            email_verified: self.email_confirmed_at.is_some(),
            created_at: self.created_at,
            last_sign_in_at: self.last_sign_in_at,
        })
    }
}
