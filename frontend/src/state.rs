use std::rc::Rc;

use gloo_timers::callback::Interval;
use harness_core::activity::{ActivityLog, now_clock_time};
use harness_core::mcp::{McpMethod, McpRequest};
use harness_core::models::{ChatPayload, NewChatPayload};
use harness_core::push::{PushChannel, PushSignal, PushStatus};
use harness_core::voice::{PlaybackMode, VoicePipeline, VoiceState};
use harness_core::{
    AgentKind, BackendClient, BackendStatus, ChatFilter, ChatSession, HEALTH_POLL_INTERVAL,
    RequestContext, RequestGate, SendOutcome, SessionId, Transcript, VoiceError,
};
use leptos::prelude::*;
use leptos::task::spawn_local;
use serde::Serialize;

use crate::api::{FetchTransport, client_config};
use crate::media::{BrowserCapture, BrowserSpeech};
use crate::models::Tab;
use crate::sse::EventSourceConnector;

type BrowserVoice = VoicePipeline<BrowserCapture, BrowserSpeech, FetchTransport>;
type BrowserPush = PushChannel<EventSourceConnector>;

/// Shared application state, provided via Leptos context.
#[derive(Clone, Copy)]
pub struct AppState {
    // --- Read signals (for components to subscribe to) ---
    pub backend_status: ReadSignal<Option<BackendStatus>>,
    pub session_id: ReadSignal<SessionId>,
    pub transcript: ReadSignal<Transcript>,
    pub is_streaming: ReadSignal<bool>,
    pub activity: ReadSignal<ActivityLog>,
    pub sessions_result: ReadSignal<String>,
    pub mcp_result: ReadSignal<String>,
    pub gmail_result: ReadSignal<String>,
    pub push_status: ReadSignal<PushStatus>,
    pub push_connected: ReadSignal<bool>,
    pub push_messages: ReadSignal<Vec<String>>,
    pub voice_state: ReadSignal<VoiceState>,
    pub voice_reply: ReadSignal<String>,
    pub voice_notice: ReadSignal<Option<String>>,
    pub can_replay: ReadSignal<bool>,

    // --- Write signals (mutated through the methods below) ---
    set_backend_status: WriteSignal<Option<BackendStatus>>,
    set_session_id: WriteSignal<SessionId>,
    set_transcript: WriteSignal<Transcript>,
    set_is_streaming: WriteSignal<bool>,
    set_activity: WriteSignal<ActivityLog>,
    set_sessions_result: WriteSignal<String>,
    set_mcp_result: WriteSignal<String>,
    set_gmail_result: WriteSignal<String>,
    set_push_status: WriteSignal<PushStatus>,
    set_push_connected: WriteSignal<bool>,
    set_voice_reply: WriteSignal<String>,
    set_voice_notice: WriteSignal<Option<String>>,
    set_can_replay: WriteSignal<bool>,

    // --- Form inputs, bound both ways ---
    pub active_tab: RwSignal<Tab>,
    pub agent: RwSignal<AgentKind>,
    pub client_id: RwSignal<String>,
    pub employee_id: RwSignal<String>,
    pub module: RwSignal<String>,
    pub filter_client_id: RwSignal<String>,
    pub filter_employee_id: RwSignal<String>,
    pub mcp_method: RwSignal<String>,
    pub mcp_query: RwSignal<String>,
    pub mcp_module: RwSignal<String>,

    chat: StoredValue<ChatSession<FetchTransport>>,
    voice: StoredValue<Rc<BrowserVoice>, LocalStorage>,
    push: StoredValue<Rc<BrowserPush>, LocalStorage>,
}

impl AppState {
    /// Create a new `AppState` and provide it in the current Leptos context.
    pub fn provide() -> Self {
        let (backend_status, set_backend_status) = signal(None::<BackendStatus>);
        let (session_id, set_session_id) = signal(SessionId::generate());
        let (transcript, set_transcript) = signal(Transcript::new());
        let (is_streaming, set_is_streaming) = signal(false);
        let (activity, set_activity) = signal(ActivityLog::new());
        let (sessions_result, set_sessions_result) = signal(String::new());
        let (mcp_result, set_mcp_result) = signal(String::new());
        let (gmail_result, set_gmail_result) = signal(String::new());
        let (push_status, set_push_status) = signal(PushStatus::Disconnected);
        let (push_connected, set_push_connected) = signal(false);
        let (push_messages, set_push_messages) = signal(Vec::<String>::new());
        let (voice_state, set_voice_state) = signal(VoiceState::Idle);
        let (voice_reply, set_voice_reply) = signal(String::new());
        let (voice_notice, set_voice_notice) = signal(None::<String>);
        let (can_replay, set_can_replay) = signal(false);

        let config = client_config();
        let client = BackendClient::new(config.clone(), FetchTransport);

        // chat and voice sends share one gate: only one of them runs at a time
        let gate = RequestGate::new();

        let voice = VoicePipeline::new(BrowserCapture, BrowserSpeech, client.clone())
            .with_gate(gate.clone())
            .with_observer(move |state| set_voice_state.set(state.clone()));

        let push = PushChannel::new(EventSourceConnector, config.url("/mcp/sse"), move |signal| {
            match signal {
                PushSignal::Opened => {
                    record(set_activity, "SSE connection opened");
                    set_push_status.set(PushStatus::Connected);
                }
                PushSignal::Event(event) => {
                    record(set_activity, event.log_line());
                    let line = event.display_line(&now_clock_time());
                    set_push_messages.update(|lines| lines.push(line));
                }
                PushSignal::Error(message) => {
                    record(set_activity, format!("SSE error: {message}"));
                    set_push_status.set(PushStatus::Error);
                }
            }
        });

        let state = Self {
            backend_status,
            session_id,
            transcript,
            is_streaming,
            activity,
            sessions_result,
            mcp_result,
            gmail_result,
            push_status,
            push_connected,
            push_messages,
            voice_state,
            voice_reply,
            voice_notice,
            can_replay,
            set_backend_status,
            set_session_id,
            set_transcript,
            set_is_streaming,
            set_activity,
            set_sessions_result,
            set_mcp_result,
            set_gmail_result,
            set_push_status,
            set_push_connected,
            set_voice_reply,
            set_voice_notice,
            set_can_replay,
            active_tab: RwSignal::new(Tab::Chat),
            agent: RwSignal::new(AgentKind::default()),
            client_id: RwSignal::new(String::new()),
            employee_id: RwSignal::new(String::new()),
            module: RwSignal::new(String::new()),
            filter_client_id: RwSignal::new(String::new()),
            filter_employee_id: RwSignal::new(String::new()),
            mcp_method: RwSignal::new(McpMethod::GetResolution.as_str().to_string()),
            mcp_query: RwSignal::new(String::new()),
            mcp_module: RwSignal::new(String::new()),
            chat: StoredValue::new(ChatSession::with_gate(client, gate)),
            voice: StoredValue::new_local(Rc::new(voice)),
            push: StoredValue::new_local(Rc::new(push)),
        };

        provide_context(state);
        state
    }

    pub fn log(&self, message: impl Into<String>) {
        record(self.set_activity, message);
    }

    pub fn clear_log(&self) {
        self.set_activity.update(ActivityLog::clear);
    }

    fn client(&self) -> BackendClient<FetchTransport> {
        self.chat.with_value(|chat| chat.client().clone())
    }

    /// Snapshot of the context fields for the next request.
    pub fn request_context(&self) -> RequestContext {
        RequestContext {
            session_id: self.session_id.get_untracked(),
            client_id: self.client_id.get_untracked(),
            employee_id: self.employee_id.get_untracked(),
            module: self.module.get_untracked(),
        }
    }

    /// Replaces the session id. The transcript on screen stays as it is.
    pub fn new_session(&self) {
        let id = SessionId::generate();
        self.log(format!("Generated new session ID: {id}"));
        self.set_session_id.set(id);
    }

    /// Whether a chat or voice send is running. Reactive.
    pub fn request_in_flight(&self) -> bool {
        self.is_streaming.get() || self.voice_state.get().is_busy()
    }

    // --- Backend status ---

    pub fn check_backend(&self) {
        let state = *self;
        let client = self.client();
        spawn_local(async move {
            let status = client.check_health().await;
            if status == BackendStatus::Offline {
                state.log("Backend status check failed");
            }
            state.set_backend_status.set(Some(status));
        });
    }

    /// Re-checks the backend every [`HEALTH_POLL_INTERVAL`] for the
    /// lifetime of the page.
    pub fn start_health_polling(&self) {
        let state = *self;
        let millis = u32::try_from(HEALTH_POLL_INTERVAL.as_millis()).unwrap_or(u32::MAX);
        Interval::new(millis, move || state.check_backend()).forget();
    }

    // --- Chat ---

    pub fn send_chat(&self, text: String) {
        let state = *self;
        let chat = self.chat.get_value();
        if chat.is_sending() || self.voice_state.get_untracked().is_busy() || text.trim().is_empty() {
            return;
        }
        let ctx = self.request_context();
        let agent = self.agent.get_untracked();
        self.log(format!(
            "Sending chat message to {}: {}",
            agent.endpoint(),
            pretty(&ChatPayload::new(&ctx, text.trim()))
        ));
        self.set_is_streaming.set(true);

        spawn_local(async move {
            let outcome = chat
                .send(&ctx, agent, &text, |update| {
                    state.set_transcript.update(|t| t.apply(update))
                })
                .await;
            match outcome {
                SendOutcome::Completed(reply) => {
                    let preview: String = reply.chars().take(100).collect();
                    state.log(format!("Chat response received: {preview}..."));
                }
                SendOutcome::Failed(e) => state.log(format!("Chat error: {e}")),
                SendOutcome::Skipped => {}
            }
            state.set_is_streaming.set(false);
        });
    }

    // --- Sessions ---

    pub fn create_session(&self) {
        let state = *self;
        let client = self.client();
        let ctx = self.request_context();
        self.log(format!("Creating new chat session: {}", pretty(&NewChatPayload::new(&ctx))));

        spawn_local(async move {
            match client.create_chat(&ctx).await {
                Ok(id) => {
                    state.log(format!("Created chat session: {id}"));
                    state.set_sessions_result.set(format!("Session created successfully: {id}"));
                    state.set_session_id.set(id);
                }
                Err(e) => {
                    state.log(format!("Create session error: {e}"));
                    state.set_sessions_result.set(format!("Error: {e}"));
                }
            }
        });
    }

    pub fn list_sessions(&self) {
        let state = *self;
        let client = self.client();
        let filter = ChatFilter {
            client_id: self.filter_client_id.get_untracked().trim().to_string(),
            employee_id: self.filter_employee_id.get_untracked().trim().to_string(),
        };
        self.log(format!(
            "Getting chat sessions from: {}{}",
            client.config().url("/allChats"),
            filter.query_string()
        ));

        spawn_local(async move {
            match client.list_chats(&filter).await {
                Ok(data) => {
                    state.log("Chat sessions received");
                    state.set_sessions_result.set(pretty(&data));
                }
                Err(e) => {
                    state.log(format!("Get sessions error: {e}"));
                    state.set_sessions_result.set(format!("Error: {e}"));
                }
            }
        });
    }

    // --- MCP ---

    pub fn send_mcp(&self) {
        let state = *self;
        let client = self.client();
        let method = McpMethod::parse(&self.mcp_method.get_untracked());
        let request = McpRequest::for_today(
            &method,
            self.mcp_query.get_untracked().trim(),
            self.mcp_module.get_untracked().trim(),
        );
        self.log(format!("Sending MCP request: {}", pretty(&request)));

        spawn_local(async move {
            match client.send_mcp(&request).await {
                Ok(data) => {
                    state.log(format!("MCP response received for {}", request.method));
                    state.set_mcp_result.set(pretty(&data));
                }
                Err(e) => {
                    state.log(format!("MCP error: {e}"));
                    state.set_mcp_result.set(format!("Error: {e}"));
                }
            }
        });
    }

    // --- Gmail ---

    pub fn gmail_auth(&self) {
        let state = *self;
        let client = self.client();
        self.log("Starting Gmail authentication");

        spawn_local(async move {
            match client.gmail_auth().await {
                Ok(()) => {
                    state.log("Gmail authentication successful");
                    state.set_gmail_result.set("Gmail authentication successful!".to_string());
                }
                Err(e) => {
                    state.log(format!("Gmail auth error: {e}"));
                    state.set_gmail_result.set(format!("Error: {e}"));
                }
            }
        });
    }

    // --- Push channel ---

    pub fn connect_push(&self) {
        let push = self.push.get_value();
        match push.connect() {
            Ok(()) => self.log("Connecting to SSE..."),
            Err(e) => self.log(format!("SSE connection error: {e}")),
        }
        self.set_push_status.set(push.status());
        self.set_push_connected.set(push.is_connected());
    }

    pub fn disconnect_push(&self) {
        let push = self.push.get_value();
        push.disconnect();
        self.set_push_status.set(push.status());
        self.set_push_connected.set(push.is_connected());
        self.log("SSE disconnected");
    }

    // --- Voice ---

    pub fn start_recording(&self) {
        let state = *self;
        let voice = self.voice.get_value();
        self.set_voice_notice.set(None);
        self.set_can_replay.set(false);

        spawn_local(async move {
            match voice.start().await {
                Ok(()) => state.log("Voice recording started"),
                Err(e) => state.voice_failed(&e),
            }
            state.set_can_replay.set(voice.can_replay());
        });
    }

    pub fn stop_recording(&self) {
        let state = *self;
        let voice = self.voice.get_value();
        let ctx = self.request_context();
        self.set_voice_reply.set(String::new());
        self.log("Voice recording stopped, sending audio");

        spawn_local(async move {
            let result = voice
                .stop_and_send(&ctx, |partial| state.set_voice_reply.set(partial.to_string()))
                .await;
            match result {
                Ok(reply) => {
                    let preview: String = reply.text.chars().take(100).collect();
                    state.log(format!("Voice response received: {preview}..."));
                    state.set_voice_reply.set(reply.text);
                    state.note_playback(reply.playback);
                }
                Err(e) => state.voice_failed(&e),
            }
            state.set_can_replay.set(voice.can_replay());
        });
    }

    pub fn replay_voice(&self) {
        let state = *self;
        let voice = self.voice.get_value();
        self.set_can_replay.set(false);

        spawn_local(async move {
            match voice.replay().await {
                Ok(playback) => state.note_playback(playback),
                Err(e) => state.voice_failed(&e),
            }
            state.set_can_replay.set(voice.can_replay());
        });
    }

    fn note_playback(&self, playback: PlaybackMode) {
        let notice = match playback {
            PlaybackMode::Spoken => None,
            PlaybackMode::TextOnly => {
                Some("Speech synthesis is not available in this browser; reply shown as text.".to_string())
            }
        };
        self.set_voice_notice.set(notice);
    }

    fn voice_failed(&self, err: &VoiceError) {
        self.log(format!("Voice error: {err}"));
        if err.is_capture_denied() {
            self.set_voice_notice
                .set(Some("Microphone access was denied. Allow it in the browser and try again.".to_string()));
        }
    }
}

fn record(set_activity: WriteSignal<ActivityLog>, message: impl Into<String>) {
    let message = message.into();
    set_activity.update(|log| log.record(message));
}

fn pretty(value: &impl Serialize) -> String {
    serde_json::to_string_pretty(value).unwrap_or_default()
}
