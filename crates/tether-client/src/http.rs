//! Request/response fallback over HTTP.
//!
//! Mirrors the chat operations of the WebSocket channel for environments
//! where a socket cannot be held open, plus the read-only endpoints
//! (history, stats, health) that only exist over HTTP.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tether_proto::endpoints::{HEALTH, HTTP_CHAT_PREFIX};

use crate::error::HttpError;

/// Body of `POST /send`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatRequest {
    /// Message text.
    pub message: String,
    /// Session to continue; the server creates one when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    /// Extra context for the assistant.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<Value>,
}

/// Assistant reply from `POST /send`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ChatReply {
    /// Assistant text.
    pub response: String,
    /// Session the exchange was recorded under.
    pub session_id: String,
    /// Model confidence in `[0, 1]`.
    pub confidence: f64,
    /// Context annotation computed by the server.
    #[serde(default)]
    pub context: Value,
    /// Server timestamp (ISO 8601).
    pub timestamp: String,
    /// Model name and usage.
    #[serde(default)]
    pub model_info: Value,
}

/// One stored exchange from `GET /history`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct HistoryExchange {
    /// What the user said.
    pub user_message: String,
    /// What the assistant answered.
    pub ai_response: String,
    /// Context annotation.
    #[serde(default)]
    pub context: Option<Value>,
    /// Model confidence.
    #[serde(default)]
    pub confidence: Option<f64>,
    /// When the exchange was stored.
    #[serde(default)]
    pub timestamp: Option<String>,
}

/// Result of `GET /history/{session_id}`. Newest exchange first.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct HistoryPage {
    /// Session queried.
    pub session_id: String,
    /// Exchanges, newest first.
    pub history: Vec<HistoryExchange>,
    /// Number of exchanges returned.
    pub count: usize,
}

/// Body of `POST /context`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContextUpdateRequest {
    /// Session to update.
    pub session_id: String,
    /// Free-form preference map.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preferences: Option<Value>,
    /// Topics of interest.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub topics: Option<Vec<String>>,
    /// Personality settings.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub personality: Option<Value>,
}

/// Body of `POST /feedback`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Feedback {
    /// Session the feedback is about.
    pub session_id: String,
    /// Specific exchange, if known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,
    /// Rating from 1 to 5.
    pub rating: u8,
    /// Free text.
    pub comment: String,
}

/// Plain acknowledgment returned by write endpoints.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Acknowledgement {
    /// Human-readable confirmation.
    pub message: String,
    /// Session echoed back.
    #[serde(default)]
    pub session_id: Option<String>,
}

/// A counted label in session stats.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LabelCount {
    /// Topic or emotion name.
    #[serde(alias = "topic", alias = "emotion")]
    pub label: String,
    /// Occurrences.
    pub count: u64,
}

/// Result of `GET /stats/{session_id}`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SessionStats {
    /// Session queried.
    pub session_id: String,
    /// Exchanges recorded.
    pub message_count: u64,
    /// Mean model confidence.
    pub avg_confidence: f64,
    /// Most frequent topics.
    #[serde(default)]
    pub topics: Vec<LabelCount>,
    /// Most frequent detected emotions.
    #[serde(default)]
    pub emotions: Vec<LabelCount>,
}

/// Result of `GET /health`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Health {
    /// `"healthy"` when the server is up.
    pub status: String,
    /// Server version, if reported.
    #[serde(default)]
    pub version: Option<String>,
}

/// HTTP client for the chat API.
#[derive(Debug, Clone)]
pub struct HttpFallback {
    client: reqwest::Client,
    base_url: String,
}

impl HttpFallback {
    /// Client for the server at `base_url` (scheme, host and port).
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    /// Same as [`Self::new`] with a preconfigured `reqwest` client.
    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client, base_url }
    }

    /// Server root.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `POST /send`
    pub async fn send(
        &self,
        message: &str,
        session_id: Option<&str>,
        context: Option<Value>,
    ) -> Result<ChatReply, HttpError> {
        let body = ChatRequest {
            message: message.to_string(),
            session_id: session_id.map(str::to_string),
            context,
        };
        let response = self.client.post(self.chat_url("/send")).json(&body).send().await?;
        Ok(check(response).await?.json().await?)
    }

    /// `GET /history/{session_id}?limit=N`
    pub async fn history(&self, session_id: &str, limit: u32) -> Result<HistoryPage, HttpError> {
        let response = self
            .client
            .get(self.chat_url(&format!("/history/{session_id}")))
            .query(&[("limit", limit)])
            .send()
            .await?;
        Ok(check(response).await?.json().await?)
    }

    /// `POST /context`
    pub async fn update_context(
        &self,
        update: &ContextUpdateRequest,
    ) -> Result<Acknowledgement, HttpError> {
        let response = self.client.post(self.chat_url("/context")).json(update).send().await?;
        Ok(check(response).await?.json().await?)
    }

    /// `GET /stats/{session_id}`
    pub async fn stats(&self, session_id: &str) -> Result<SessionStats, HttpError> {
        let response =
            self.client.get(self.chat_url(&format!("/stats/{session_id}"))).send().await?;
        Ok(check(response).await?.json().await?)
    }

    /// `POST /feedback`
    pub async fn feedback(&self, feedback: &Feedback) -> Result<Acknowledgement, HttpError> {
        let response = self.client.post(self.chat_url("/feedback")).json(feedback).send().await?;
        Ok(check(response).await?.json().await?)
    }

    /// `GET /health`
    pub async fn health(&self) -> Result<Health, HttpError> {
        let response = self.client.get(format!("{}{HEALTH}", self.base_url)).send().await?;
        Ok(check(response).await?.json().await?)
    }

    fn chat_url(&self, path: &str) -> String {
        format!("{}{HTTP_CHAT_PREFIX}{path}", self.base_url)
    }
}

/// Turn a non-success status into [`HttpError::Status`], preferring the
/// server's `detail` field over the raw body.
async fn check(response: reqwest::Response) -> Result<reqwest::Response, HttpError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let detail = serde_json::from_str::<Value>(&body)
        .ok()
        .and_then(|v| v.get("detail").and_then(Value::as_str).map(str::to_string))
        .unwrap_or(body);

    tracing::warn!(status = status.as_u16(), %detail, "http fallback request failed");
    Err(HttpError::Status { status: status.as_u16(), detail })
}
