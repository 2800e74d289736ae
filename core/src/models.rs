use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ── Session ──────────────────────────────────────────────────────────────────

/// Opaque client-side session identifier: `session_<unix-millis>_<suffix>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    const SUFFIX_LEN: usize = 9;

    /// Generates a fresh id from the current time and a random suffix.
    pub fn generate() -> Self {
        let suffix = Uuid::new_v4().simple().to_string();
        Self::from_parts(Utc::now().timestamp_millis(), &suffix[..Self::SUFFIX_LEN])
    }

    pub fn from_parts(timestamp_millis: i64, suffix: &str) -> Self {
        Self(format!("session_{timestamp_millis}_{suffix}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for SessionId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Everything a request needs to know about who is asking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    pub session_id: SessionId,
    pub client_id: String,
    pub employee_id: String,
    pub module: String,
}

impl RequestContext {
    pub fn new(session_id: SessionId) -> Self {
        Self {
            session_id,
            client_id: String::new(),
            employee_id: String::new(),
            module: String::new(),
        }
    }
}

// ── Chat transcript ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatTurn {
    pub role: Role,
    pub content: String,
    pub streaming: bool,
}

impl ChatTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into(), streaming: false }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: Role::Assistant, content: content.into(), streaming: false }
    }
}

/// A change to the transcript produced by a chat send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TranscriptUpdate {
    User(String),
    AssistantStarted,
    /// Full text accumulated so far for the in-progress assistant turn.
    Partial(String),
    Finished(String),
    Failed(String),
}

/// Ordered, append-only list of chat turns.
///
/// Only the trailing in-progress assistant turn may change, and its text
/// only ever grows until it is finished or failed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transcript {
    turns: Vec<ChatTurn>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn turns(&self) -> &[ChatTurn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn is_streaming(&self) -> bool {
        self.turns.last().is_some_and(|t| t.streaming)
    }

    pub fn apply(&mut self, update: TranscriptUpdate) {
        match update {
            TranscriptUpdate::User(text) => {
                self.finalize_streaming();
                self.turns.push(ChatTurn::user(text));
            }
            TranscriptUpdate::AssistantStarted => {
                self.finalize_streaming();
                self.turns.push(ChatTurn {
                    role: Role::Assistant,
                    content: String::new(),
                    streaming: true,
                });
            }
            TranscriptUpdate::Partial(text) => {
                if let Some(turn) = self.streaming_turn_mut() {
                    // partials are cumulative; never shrink the visible text
                    if text.len() >= turn.content.len() {
                        turn.content = text;
                    }
                }
            }
            TranscriptUpdate::Finished(text) => match self.streaming_turn_mut() {
                Some(turn) => {
                    turn.content = text;
                    turn.streaming = false;
                }
                None => self.turns.push(ChatTurn::assistant(text)),
            },
            TranscriptUpdate::Failed(message) => {
                let content = format!("Error: {message}");
                match self.streaming_turn_mut() {
                    Some(turn) => {
                        turn.content = content;
                        turn.streaming = false;
                    }
                    None => self.turns.push(ChatTurn::assistant(content)),
                }
            }
        }
    }

    pub fn clear(&mut self) {
        self.turns.clear();
    }

    fn streaming_turn_mut(&mut self) -> Option<&mut ChatTurn> {
        self.turns.last_mut().filter(|t| t.streaming)
    }

    fn finalize_streaming(&mut self) {
        if let Some(turn) = self.streaming_turn_mut() {
            turn.streaming = false;
        }
    }
}

// ── Agents ───────────────────────────────────────────────────────────────────

/// Which backend agent a chat message is routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AgentKind {
    #[default]
    QueryAssistant,
    LoginIssuer,
    Analyser,
    Decision,
}

impl AgentKind {
    pub const ALL: [AgentKind; 4] = [
        AgentKind::QueryAssistant,
        AgentKind::LoginIssuer,
        AgentKind::Analyser,
        AgentKind::Decision,
    ];

    pub fn endpoint(&self) -> &'static str {
        match self {
            AgentKind::QueryAssistant | AgentKind::LoginIssuer => "/stream/chat",
            AgentKind::Analyser => "/stream/analyser",
            AgentKind::Decision => "/stream/decision",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AgentKind::QueryAssistant => "query_assistant",
            AgentKind::LoginIssuer => "login_issuer",
            AgentKind::Analyser => "analyser",
            AgentKind::Decision => "decision",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            AgentKind::QueryAssistant => "Query Assistant",
            AgentKind::LoginIssuer => "Login Issuer",
            AgentKind::Analyser => "Analyser",
            AgentKind::Decision => "Decision",
        }
    }

    /// Unknown names route like the query assistant.
    pub fn parse(name: &str) -> Self {
        Self::ALL
            .into_iter()
            .find(|a| a.as_str() == name)
            .unwrap_or_default()
    }
}

// ── Request bodies ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatParams {
    pub query: String,
    pub module: String,
    pub session_id: String,
    pub client_id: String,
    pub employee_id: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatPayload {
    pub params: ChatParams,
}

impl ChatPayload {
    pub fn new(ctx: &RequestContext, query: &str) -> Self {
        Self {
            params: ChatParams {
                query: query.to_string(),
                module: ctx.module.clone(),
                session_id: ctx.session_id.to_string(),
                client_id: ctx.client_id.clone(),
                employee_id: ctx.employee_id.clone(),
            },
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewChatParams {
    pub client_id: String,
    pub employee_id: String,
    pub module: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewChatPayload {
    pub params: NewChatParams,
}

impl NewChatPayload {
    pub fn new(ctx: &RequestContext) -> Self {
        Self {
            params: NewChatParams {
                client_id: ctx.client_id.clone(),
                employee_id: ctx.employee_id.clone(),
                module: ctx.module.clone(),
            },
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VoiceParams {
    pub base64_audio: String,
    pub module: String,
    pub session_id: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct VoicePayload {
    pub jsonrpc: &'static str,
    pub params: VoiceParams,
}

impl VoicePayload {
    pub fn new(ctx: &RequestContext, base64_audio: String) -> Self {
        Self {
            jsonrpc: "2.0",
            params: VoiceParams {
                base64_audio,
                module: ctx.module.clone(),
                session_id: ctx.session_id.to_string(),
            },
        }
    }
}

/// Optional filters for listing chat sessions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChatFilter {
    pub client_id: String,
    pub employee_id: String,
}

impl ChatFilter {
    /// `?clientId=..&employeeId=..` with empty fields left out, or `""`.
    pub fn query_string(&self) -> String {
        let pairs: Vec<String> = [("clientId", &self.client_id), ("employeeId", &self.employee_id)]
            .into_iter()
            .filter(|(_, v)| !v.is_empty())
            .map(|(k, v)| format!("{k}={}", urlencoding::encode(v)))
            .collect();
        if pairs.is_empty() {
            String::new()
        } else {
            format!("?{}", pairs.join("&"))
        }
    }
}

// ── Responses ────────────────────────────────────────────────────────────────

/// `{ success, data?, error? }` wrapper used by the JSON endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiEnvelope {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub data: Option<serde_json::Value>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendStatus {
    Online,
    Offline,
}

impl BackendStatus {
    pub fn label(&self) -> &'static str {
        match self {
            BackendStatus::Online => "Online",
            BackendStatus::Offline => "Offline",
        }
    }
}
