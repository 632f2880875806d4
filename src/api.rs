// src/api.rs

use crate::models::{ConfigUpdate, ProgressSnapshot, StatusSnapshot};
use crate::settings::Settings;
use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use std::fmt;
use thiserror::Error;

/// Errors raised while talking to the cycler service.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("invalid response body: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("service rejected request ({status}): {}", .message.as_deref().unwrap_or("no detail"))]
    Rejected {
        status: u16,
        message: Option<String>,
        /// State the service attached to the failure, if the body carried one.
        snapshot: Option<Box<StatusSnapshot>>,
    },
}

impl ApiError {
    /// The status snapshot attached to a rejected write, if any.
    pub fn snapshot(&self) -> Option<&StatusSnapshot> {
        match self {
            ApiError::Rejected { snapshot, .. } => snapshot.as_deref(),
            _ => None,
        }
    }
}

/// Write operations that take no payload and answer with a status snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    StartDownload,
    StopDownload,
    CleanCache,
    ToggleTask,
    ToggleLimit,
}

impl Action {
    pub fn path(&self) -> &'static str {
        match self {
            Action::StartDownload => "/api/download",
            Action::StopDownload => "/api/stop",
            Action::CleanCache => "/api/clean",
            Action::ToggleTask => "/api/toggle_task",
            Action::ToggleLimit => "/api/toggle_limit",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Action::StartDownload => "start-download",
            Action::StopDownload => "stop",
            Action::CleanCache => "clean-cache",
            Action::ToggleTask => "toggle-task",
            Action::ToggleLimit => "toggle-limit",
        };
        f.write_str(name)
    }
}

/// The request/response contract of the remote scheduling service.
#[async_trait]
pub trait PanelApi: Send + Sync + 'static {
    async fn fetch_status(&self) -> Result<StatusSnapshot, ApiError>;

    async fn fetch_progress(&self) -> Result<ProgressSnapshot, ApiError>;

    async fn post_action(&self, action: Action) -> Result<StatusSnapshot, ApiError>;

    async fn save_config(&self, update: &ConfigUpdate) -> Result<StatusSnapshot, ApiError>;
}

/// `PanelApi` over the service's HTTP JSON endpoints.
#[derive(Debug, Clone)]
pub struct HttpPanelApi {
    client: Client,
    base_url: String,
}

impl HttpPanelApi {
    pub fn new(settings: &Settings) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(settings.request_timeout)
            .build()?;

        Ok(Self {
            client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn decode<T: DeserializeOwned>(resp: Response) -> Result<T, ApiError> {
        let status = resp.status();
        let body = resp.bytes().await?;
        if status.is_success() {
            return Ok(serde_json::from_slice(&body)?);
        }
        Err(rejection(status.as_u16(), &body))
    }
}

/// Builds a `Rejected` error from a failure body. The service answers
/// failures either with `{"error": "..."}` or with a full status payload.
fn rejection(status: u16, body: &[u8]) -> ApiError {
    let value: Option<serde_json::Value> = serde_json::from_slice(body).ok();
    let object = value.as_ref().and_then(|v| v.as_object());

    let message = object
        .and_then(|o| o.get("error"))
        .and_then(|e| e.as_str())
        .map(str::to_string);

    let snapshot = object
        .filter(|o| o.contains_key("task_status") || o.contains_key("config"))
        .and_then(|_| serde_json::from_slice::<StatusSnapshot>(body).ok())
        .map(Box::new);

    ApiError::Rejected {
        status,
        message,
        snapshot,
    }
}

#[async_trait]
impl PanelApi for HttpPanelApi {
    async fn fetch_status(&self) -> Result<StatusSnapshot, ApiError> {
        let resp = self.client.get(self.endpoint("/api/status")).send().await?;
        Self::decode(resp).await
    }

    async fn fetch_progress(&self) -> Result<ProgressSnapshot, ApiError> {
        let resp = self.client.get(self.endpoint("/api/progress")).send().await?;
        Self::decode(resp).await
    }

    async fn post_action(&self, action: Action) -> Result<StatusSnapshot, ApiError> {
        let resp = self.client.post(self.endpoint(action.path())).send().await?;
        Self::decode(resp).await
    }

    async fn save_config(&self, update: &ConfigUpdate) -> Result<StatusSnapshot, ApiError> {
        let resp = self
            .client
            .post(self.endpoint("/api/set"))
            .form(update)
            .send()
            .await?;
        Self::decode(resp).await
    }
}
