use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Shown when the backend reports `success: false` without saying why.
const UNKNOWN_ERROR: &str = "알 수 없는 오류";

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ApiError {
    /// The backend answered with `success: false`.
    #[error("{0}")]
    Application(String),

    /// Network failure, timeout, or a body that is not the expected JSON.
    #[error("transport error: {0}")]
    Transport(String),
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        ApiError::Transport(err.to_string())
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    message: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    success: bool,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Deserialize)]
struct StatusResponse {
    success: bool,
}

/// The two backend calls the chat widget depends on.
#[async_trait]
pub trait ChatApi: Send + Sync {
    /// `GET /api/status`. `Ok(false)` means the backend answered but reported
    /// itself unavailable.
    async fn status(&self) -> Result<bool, ApiError>;

    /// `POST /api/chat`, returning the reply text.
    async fn chat(&self, message: &str) -> Result<String, ApiError>;
}

#[derive(Clone)]
pub struct HttpChatApi {
    client: Client,
    base_url: String,
    status_timeout: Duration,
}

impl HttpChatApi {
    pub fn new(base_url: &str, request_timeout: Duration, status_timeout: Duration) -> Result<Self, ApiError> {
        let client = Client::builder().timeout(request_timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            status_timeout,
        })
    }
}

#[async_trait]
impl ChatApi for HttpChatApi {
    async fn status(&self) -> Result<bool, ApiError> {
        let url = format!("{}/api/status", self.base_url);

        let response = self
            .client
            .get(&url)
            .timeout(self.status_timeout)
            .send()
            .await?;

        let status: StatusResponse = response.json().await?;
        Ok(status.success)
    }

    async fn chat(&self, message: &str) -> Result<String, ApiError> {
        let url = format!("{}/api/chat", self.base_url);

        let response = self
            .client
            .post(&url)
            .json(&ChatRequest { message })
            .send()
            .await?;

        // The backend uses non-2xx codes for well-formed failures too, so the
        // body decides.
        let code = response.status();
        let chat_response: ChatResponse = response
            .json()
            .await
            .map_err(|e| ApiError::Transport(format!("unreadable response ({}): {}", code, e)))?;

        if chat_response.success {
            Ok(chat_response.message.unwrap_or_default())
        } else {
            Err(ApiError::Application(
                chat_response.error.unwrap_or_else(|| UNKNOWN_ERROR.to_string()),
            ))
        }
    }
}
