use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use log::{error, info};

use crate::client::BackendClient;
use crate::errors::ClientError;
use crate::models::{AgentKind, RequestContext, TranscriptUpdate};
use crate::transport::Transport;

/// Allows at most one request of a kind to be in flight.
#[derive(Debug, Clone, Default)]
pub struct RequestGate {
    busy: Arc<AtomicBool>,
}

impl RequestGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Claims the gate, or returns `None` when a request is already running.
    pub fn try_begin(&self) -> Option<InFlight> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| InFlight { busy: Arc::clone(&self.busy) })
    }
}

/// Held while a request runs; reopens the gate when dropped.
#[derive(Debug)]
pub struct InFlight {
    busy: Arc<AtomicBool>,
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.busy.store(false, Ordering::Release);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    /// Empty input, or another send was still running. No request was made.
    Skipped,
    Completed(String),
    Failed(ClientError),
}

/// Chat sends against one backend, one at a time.
#[derive(Debug, Clone)]
pub struct ChatSession<T> {
    client: BackendClient<T>,
    gate: RequestGate,
}

impl<T: Transport> ChatSession<T> {
    pub fn new(client: BackendClient<T>) -> Self {
        Self::with_gate(client, RequestGate::new())
    }

    /// Shares `gate` with other senders, so only one of them runs at a time.
    pub fn with_gate(client: BackendClient<T>, gate: RequestGate) -> Self {
        Self { client, gate }
    }

    pub fn client(&self) -> &BackendClient<T> {
        &self.client
    }

    pub fn is_sending(&self) -> bool {
        self.gate.is_busy()
    }

    /// Sends `text` to `agent`, describing the transcript changes through
    /// `on_update` as they happen.
    pub async fn send(
        &self,
        ctx: &RequestContext,
        agent: AgentKind,
        text: &str,
        mut on_update: impl FnMut(TranscriptUpdate),
    ) -> SendOutcome {
        let message = text.trim();
        if message.is_empty() {
            return SendOutcome::Skipped;
        }
        let Some(_in_flight) = self.gate.try_begin() else {
            return SendOutcome::Skipped;
        };

        on_update(TranscriptUpdate::User(message.to_string()));
        on_update(TranscriptUpdate::AssistantStarted);
        info!("Sending chat message to {} for {}", agent.endpoint(), ctx.session_id);

        let result = self
            .client
            .stream_chat(agent, ctx, message, |partial| {
                on_update(TranscriptUpdate::Partial(partial.to_string()))
            })
            .await;

        match result {
            Ok(reply) => {
                let preview: String = reply.chars().take(100).collect();
                info!("Chat response received: {preview}...");
                on_update(TranscriptUpdate::Finished(reply.clone()));
                SendOutcome::Completed(reply)
            }
            Err(e) => {
                error!("Chat error: {e}");
                on_update(TranscriptUpdate::Failed(e.to_string()));
                SendOutcome::Failed(e)
            }
        }
    }
}
