//! API client for talking to a running red-alert agent

use alert_lib::{EmittedEvent, HealthResponse};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use thiserror::Error;
use url::Url;

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("invalid agent URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("agent unreachable: {0}")]
    Unreachable(#[source] reqwest::Error),

    #[error("agent watcher has been stopped")]
    Stopped,

    #[error("agent returned {status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error("failed to parse agent response: {0}")]
    Decode(#[source] reqwest::Error),
}

/// Client for the agent's HTTP API
pub struct AgentClient {
    client: Client,
    base_url: Url,
}

impl AgentClient {
    pub fn new(base_url: &str) -> Result<Self, AgentError> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(AgentError::Unreachable)?;

        let base_url = Url::parse(base_url)?;

        Ok(Self { client, base_url })
    }

    /// Fetch component health; unhealthy agents answer 503 with the same body
    pub async fn health(&self) -> Result<HealthResponse, AgentError> {
        let url = self.base_url.join("healthz")?;
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(AgentError::Unreachable)?;

        if response.status() == StatusCode::SERVICE_UNAVAILABLE {
            return response.json().await.map_err(AgentError::Decode);
        }
        Self::parse(response).await
    }

    /// Trigger a manual check on the agent
    pub async fn check(&self) -> Result<EmittedEvent, AgentError> {
        let url = self.base_url.join("check")?;
        let response = self
            .client
            .post(url)
            .send()
            .await
            .map_err(AgentError::Unreachable)?;

        if response.status() == StatusCode::CONFLICT {
            return Err(AgentError::Stopped);
        }
        Self::parse(response).await
    }

    async fn parse<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, AgentError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AgentError::Status { status, body });
        }

        response.json().await.map_err(AgentError::Decode)
    }
}
