use std::time::Duration;

use reqwest::{Client, Error as ReqwestError};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info};

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Error, Debug)]
pub enum SignalingError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] ReqwestError),
    #[error("gateway error: {message} (code: {code})")]
    Api { message: String, code: String },
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Client for the signaling gateway: creates and destroys broadcast
/// sessions and resolves viewer join credentials. The media plane behind
/// the issued tokens is not this client's concern.
#[derive(Debug, Clone)]
pub struct SignalingClient {
    client: Client,
    base_url: String,
    auth_token: Option<String>,
}

/// Credentials for one live broadcast, returned by `POST /live/start`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamSession {
    pub session_id: String,
    pub room_name: String,
    pub token: String,
    pub url: String,
}

/// Join credentials for one viewer, returned by `GET /live/{id}/watch`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WatchInfo {
    pub room_name: String,
    pub token: String,
    pub url: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub cover_url: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct StartBroadcastRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StopBroadcastRequest<'a> {
    stream_id: &'a str,
}

impl SignalingClient {
    pub fn new(base_url: &str) -> Result<Self, SignalingError> {
        Self::with_timeout(base_url, DEFAULT_REQUEST_TIMEOUT)
    }

    /// Every request carries a bounded timeout so a flaky gateway can
    /// never hold a lifecycle transition open indefinitely.
    pub fn with_timeout(base_url: &str, timeout: Duration) -> Result<Self, SignalingError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            auth_token: None,
        })
    }

    pub fn with_auth_token(mut self, token: String) -> Self {
        self.auth_token = Some(token);
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn auth_headers(&self) -> reqwest::header::HeaderMap {
        let mut headers = reqwest::header::HeaderMap::new();
        if let Some(token) = &self.auth_token {
            if let Ok(value) = format!("Bearer {token}").parse() {
                headers.insert("Authorization", value);
            }
        }
        headers
    }

    /// Ask the gateway to create a broadcast session and allocate its room.
    pub async fn start_broadcast(
        &self,
        request: &StartBroadcastRequest,
    ) -> Result<StreamSession, SignalingError> {
        let url = format!("{}/live/start", self.base_url);
        let response = self
            .client
            .post(&url)
            .headers(self.auth_headers())
            .json(request)
            .send()
            .await?;

        if response.status().is_success() {
            let session: StreamSession = response.json().await?;
            info!(session_id = %session.session_id, room = %session.room_name, "broadcast session created");
            Ok(session)
        } else {
            Err(Self::api_error(response).await)
        }
    }

    /// Ask the gateway to destroy a broadcast session. The success body is
    /// ignored; callers decide whether a failure matters (teardown does
    /// not).
    pub async fn stop_broadcast(&self, stream_id: &str) -> Result<(), SignalingError> {
        let url = format!("{}/live/stop", self.base_url);
        let response = self
            .client
            .post(&url)
            .headers(self.auth_headers())
            .json(&StopBroadcastRequest { stream_id })
            .send()
            .await?;

        if response.status().is_success() {
            debug!(%stream_id, "broadcast session stopped");
            Ok(())
        } else {
            Err(Self::api_error(response).await)
        }
    }

    /// Resolve viewer join credentials for one stream. Idempotent; callers
    /// resolve exactly once per mount and never retry automatically.
    pub async fn watch(&self, stream_id: &str) -> Result<WatchInfo, SignalingError> {
        let url = format!("{}/live/{}/watch", self.base_url, stream_id);
        let response = self
            .client
            .get(&url)
            .headers(self.auth_headers())
            .send()
            .await?;

        if response.status().is_success() {
            let info: WatchInfo = response.json().await?;
            debug!(%stream_id, room = %info.room_name, "watch credentials resolved");
            Ok(info)
        } else {
            Err(Self::api_error(response).await)
        }
    }

    async fn api_error(response: reqwest::Response) -> SignalingError {
        let status = response.status();
        let body: Value = response.json().await.unwrap_or_default();
        SignalingError::Api {
            message: body["error"]
                .as_str()
                .unwrap_or("unknown gateway error")
                .to_string(),
            code: status.to_string(),
        }
    }
}
