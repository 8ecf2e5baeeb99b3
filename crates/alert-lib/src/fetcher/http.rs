//! HTTP fetcher for the Home Front Command alert feed

use super::{async_trait, SnapshotFetcher};
use crate::error::{ConfigError, FetchError};
use crate::models::{HistoryRecord, RawAlert, Snapshot};
use chrono::Utc;
use reqwest::header::{HeaderMap, HeaderValue, REFERER, USER_AGENT};
use reqwest::Client;
use std::time::Duration;
use tracing::debug;
use url::Url;

pub const DEFAULT_ALERTS_URL: &str = "https://www.oref.org.il/WarningMessages/alert/alerts.json";
pub const DEFAULT_HISTORY_URL: &str =
    "https://www.oref.org.il/WarningMessages/History/AlertsHistory.json";

/// Configuration for the feed client
#[derive(Debug, Clone)]
pub struct FetcherConfig {
    /// Active alerts endpoint
    pub alerts_url: String,
    /// Alert history endpoint
    pub history_url: String,
    /// Timeout for the active alerts request (default: 30 seconds)
    pub current_timeout: Duration,
    /// Timeout for the history request (default: 15 seconds)
    pub history_timeout: Duration,
    /// User agent sent with every request
    pub user_agent: String,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            alerts_url: DEFAULT_ALERTS_URL.to_string(),
            history_url: DEFAULT_HISTORY_URL.to_string(),
            current_timeout: Duration::from_secs(30),
            history_timeout: Duration::from_secs(15),
            user_agent: concat!("red-alert-watcher/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// Fetches snapshots and history from the feed over HTTP
pub struct OrefFetcher {
    client: Client,
    alerts_url: Url,
    history_url: Url,
    current_timeout: Duration,
    history_timeout: Duration,
}

impl OrefFetcher {
    pub fn new(config: FetcherConfig) -> Result<Self, ConfigError> {
        let alerts_url = parse_url(&config.alerts_url)?;
        let history_url = parse_url(&config.history_url)?;

        let mut headers = HeaderMap::new();
        headers.insert(REFERER, HeaderValue::from_static("https://www.oref.org.il/"));
        headers.insert(
            "X-Requested-With",
            HeaderValue::from_static("XMLHttpRequest"),
        );
        let user_agent = HeaderValue::from_str(&config.user_agent)
            .map_err(|e| ConfigError::HttpClient(format!("invalid user agent: {}", e)))?;
        headers.insert(USER_AGENT, user_agent);

        let client = Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| ConfigError::HttpClient(e.to_string()))?;

        Ok(Self {
            client,
            alerts_url,
            history_url,
            current_timeout: config.current_timeout,
            history_timeout: config.history_timeout,
        })
    }

    async fn get_body(&self, url: &Url, timeout: Duration) -> Result<String, FetchError> {
        let response = self
            .client
            .get(url.clone())
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| classify(e, timeout))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(FetchError::Status { status, body });
        }

        response.text().await.map_err(|e| classify(e, timeout))
    }
}

#[async_trait]
impl SnapshotFetcher for OrefFetcher {
    async fn fetch_current(&self) -> Result<Option<Snapshot>, FetchError> {
        let body = self.get_body(&self.alerts_url, self.current_timeout).await?;
        let snapshot = parse_snapshot(&body)?;
        debug!(active = snapshot.is_some(), "Fetched alert feed");
        Ok(snapshot)
    }

    async fn fetch_history(&self) -> Result<Vec<HistoryRecord>, FetchError> {
        let body = self.get_body(&self.history_url, self.history_timeout).await?;
        parse_history(&body)
    }
}

fn parse_url(raw: &str) -> Result<Url, ConfigError> {
    Url::parse(raw).map_err(|e| ConfigError::InvalidUrl {
        url: raw.to_string(),
        reason: e.to_string(),
    })
}

fn classify(error: reqwest::Error, timeout: Duration) -> FetchError {
    if error.is_timeout() {
        FetchError::Timeout(timeout)
    } else if error.is_decode() {
        FetchError::Decode(error.to_string())
    } else {
        FetchError::Network(error.to_string())
    }
}

/// The feed answers with an empty body (sometimes just a BOM) when idle
fn strip_body(body: &str) -> &str {
    body.trim_start_matches('\u{feff}').trim()
}

/// Parse the active alerts body into a snapshot.
///
/// Anything that is not an object with a non-empty `id` means no active
/// alerts.
pub(crate) fn parse_snapshot(body: &str) -> Result<Option<Snapshot>, FetchError> {
    let body = strip_body(body);
    if body.is_empty() {
        return Ok(None);
    }

    let value: serde_json::Value =
        serde_json::from_str(body).map_err(|e| FetchError::Decode(e.to_string()))?;
    if !value.is_object() {
        return Ok(None);
    }

    let raw: RawAlert =
        serde_json::from_value(value).map_err(|e| FetchError::Decode(e.to_string()))?;
    Ok(raw.into_snapshot(Utc::now()))
}

/// Parse the history body, accepting either an array or a single record
pub(crate) fn parse_history(body: &str) -> Result<Vec<HistoryRecord>, FetchError> {
    let body = strip_body(body);
    if body.is_empty() {
        return Ok(Vec::new());
    }

    let value: serde_json::Value =
        serde_json::from_str(body).map_err(|e| FetchError::Decode(e.to_string()))?;
    let records = match value {
        serde_json::Value::Array(items) => items
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<HistoryRecord>, _>>(),
        serde_json::Value::Null => Ok(Vec::new()),
        other => serde_json::from_value(other).map(|record| vec![record]),
    };

    records.map_err(|e| FetchError::Decode(e.to_string()))
}
