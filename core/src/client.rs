use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use log::{debug, warn};
use serde::Serialize;

use crate::errors::ClientError;
use crate::mcp::McpRequest;
use crate::models::{
    AgentKind, ApiEnvelope, BackendStatus, ChatFilter, ChatPayload, NewChatPayload,
    RequestContext, SessionId, VoicePayload,
};
use crate::stream::consume_token_stream;
use crate::transport::{Transport, TransportResponse};
use crate::voice::AudioClip;

const DEFAULT_BASE_URL: &str = "http://localhost:8080";

/// How often the UI re-checks backend availability.
pub const HEALTH_POLL_INTERVAL: std::time::Duration = std::time::Duration::from_secs(30);

/// Where the backend lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub base_url: String,
    /// Full URL of the liveness endpoint, which may sit outside `base_url`.
    pub status_url: String,
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let status_url = format!("{base_url}/health");
        Self { base_url, status_url }
    }

    pub fn with_status_url(mut self, status_url: impl Into<String>) -> Self {
        self.status_url = status_url.into();
        self
    }

    /// Applies optional overrides, e.g. values baked in at build time.
    pub fn from_overrides(base_url: Option<&str>, status_url: Option<&str>) -> Self {
        let config = Self::new(base_url.filter(|s| !s.is_empty()).unwrap_or(DEFAULT_BASE_URL));
        match status_url.filter(|s| !s.is_empty()) {
            Some(url) => config.with_status_url(url),
            None => config,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}

/// Typed access to every backend endpoint the harness exercises.
#[derive(Debug, Clone)]
pub struct BackendClient<T> {
    config: ClientConfig,
    transport: T,
}

impl<T: Transport> BackendClient<T> {
    pub fn new(config: ClientConfig, transport: T) -> Self {
        Self { config, transport }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Streams a chat reply for `query`, reporting the growing text.
    pub async fn stream_chat(
        &self,
        agent: AgentKind,
        ctx: &RequestContext,
        query: &str,
        on_partial: impl FnMut(&str),
    ) -> Result<String, ClientError> {
        let url = self.config.url(agent.endpoint());
        let body = to_json(&ChatPayload::new(ctx, query))?;
        debug!("POST {url}: {body}");

        let response = self.transport.post(&url, Some(&body)).await?;
        consume_token_stream(response, on_partial).await
    }

    /// Uploads a recorded clip and streams the spoken reply's text.
    pub async fn stream_voice(
        &self,
        ctx: &RequestContext,
        clip: &AudioClip,
        on_partial: impl FnMut(&str),
    ) -> Result<String, ClientError> {
        let url = self.config.url("/mcp/voice");
        let encoded = STANDARD.encode(&clip.data);
        debug!("POST {url}: {} bytes of {}", clip.data.len(), clip.mime_type);
        let body = to_json(&VoicePayload::new(ctx, encoded))?;

        let response = self.transport.post(&url, Some(&body)).await?;
        consume_token_stream(response, on_partial).await
    }

    /// Asks the backend for a new chat session and returns its id.
    pub async fn create_chat(&self, ctx: &RequestContext) -> Result<SessionId, ClientError> {
        let url = self.config.url("/create/newChat");
        let body = to_json(&NewChatPayload::new(ctx))?;
        let response = self.transport.post(&url, Some(&body)).await?;

        let data = envelope_data(response).await?;
        data.get("sessionId")
            .and_then(serde_json::Value::as_str)
            .map(|id| SessionId::from(id.to_string()))
            .ok_or_else(|| ClientError::Decode("response has no data.sessionId".to_string()))
    }

    pub async fn list_chats(&self, filter: &ChatFilter) -> Result<serde_json::Value, ClientError> {
        let url = format!("{}{}", self.config.url("/allChats"), filter.query_string());
        let response = self.transport.get(&url).await?;
        envelope_data(response).await
    }

    pub async fn send_mcp(&self, request: &McpRequest) -> Result<serde_json::Value, ClientError> {
        let url = self.config.url("/mcp/message");
        let body = to_json(request)?;
        let response = self.transport.post(&url, Some(&body)).await?;
        envelope_data(response).await
    }

    pub async fn gmail_auth(&self) -> Result<(), ClientError> {
        let url = self.config.url("/mcp/gmail/auth");
        let response = self.transport.post(&url, None).await?;
        envelope_data(response).await.map(|_| ())
    }

    /// Any failure counts as offline.
    pub async fn check_health(&self) -> BackendStatus {
        match self.transport.get(&self.config.status_url).await {
            Ok(response) if response.is_success() => BackendStatus::Online,
            Ok(response) => {
                warn!("Backend health check returned HTTP {}", response.status);
                BackendStatus::Offline
            }
            Err(e) => {
                warn!("Backend status check failed: {e}");
                BackendStatus::Offline
            }
        }
    }
}

fn to_json(body: &impl Serialize) -> Result<serde_json::Value, ClientError> {
    serde_json::to_value(body).map_err(|e| ClientError::Encode(e.to_string()))
}

/// Decodes the `{success, data, error}` envelope and returns `data`.
///
/// The envelope is read regardless of status, since the backend reports
/// failures in it. An undecodable body on a failed status is an HTTP error.
async fn envelope_data(response: TransportResponse) -> Result<serde_json::Value, ClientError> {
    let status = response.status;
    let success = response.is_success();
    let reason = response.status_text.clone();
    let bytes = response.bytes().await?;

    let envelope: ApiEnvelope = match serde_json::from_slice(&bytes) {
        Ok(env) => env,
        Err(_) if !success => return Err(ClientError::http(status, reason)),
        Err(e) => return Err(ClientError::Decode(e.to_string())),
    };

    if envelope.success {
        Ok(envelope.data.unwrap_or(serde_json::Value::Null))
    } else {
        Err(ClientError::Backend(
            envelope.error.unwrap_or_else(|| "unknown error".to_string()),
        ))
    }
}
