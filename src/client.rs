//! HTTP client for the chat server: one streaming `POST /chat` per turn and
//! the one-shot `GET /get_config` at startup. No retries and no request
//! timeout; a hung stream hangs the turn (carried limitation).

use reqwest::Client;
use serde::Serialize;
use tracing::error;

use crate::config::ServerConfig;
use crate::error::ChatError;
use crate::role::Role;
use crate::session::HistoryEntry;

/// Wire body of one turn's chat request.
#[derive(Debug, Clone, Serialize)]
pub struct TurnRequest {
    pub history: Vec<HistoryEntry>,
    pub message: String,
    pub temperature: f32,
    pub model: String,
    pub role: Role,
    pub world_setting: String,
}

pub struct ChatClient {
    client: Client,
    base_url: String,
}

impl ChatClient {
    pub fn new(base_url: &str) -> Self {
        ChatClient {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Fetch the server's default configuration.
    pub async fn fetch_config(&self) -> Result<ServerConfig, ChatError> {
        let response = self
            .client
            .get(format!("{}/get_config", self.base_url))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ChatError::Status { status, body });
        }

        Ok(response.json::<ServerConfig>().await?)
    }

    /// Issue one streaming turn request. On a non-success status the body is
    /// read for logging and the turn fails; the caller renders the inline
    /// error. On success the response is returned for incremental reading.
    pub async fn send_turn(&self, request: &TurnRequest) -> Result<reqwest::Response, ChatError> {
        let response = self
            .client
            .post(format!("{}/chat", self.base_url))
            .json(request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            error!(%status, role = %request.role, "chat request rejected: {}", body);
            return Err(ChatError::Status { status, body });
        }

        Ok(response)
    }
}
