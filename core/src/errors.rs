use thiserror::Error;

/// Failure of a request against the agent backend.
/// Every variant renders as a message fit for an inline error panel.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    // ── Transport ────────────────────────────────────────────────────────────
    #[error("Network error: {0}")]
    Network(String),

    #[error("HTTP {status}: {reason}")]
    Http { status: u16, reason: String },

    // ── Payload ──────────────────────────────────────────────────────────────
    #[error("Parse error: {0}")]
    Decode(String),

    #[error("Serialize error: {0}")]
    Encode(String),

    /// The backend answered `success: false`.
    #[error("{0}")]
    Backend(String),
}

impl ClientError {
    pub fn network(message: impl Into<String>) -> Self {
        ClientError::Network(message.into())
    }

    pub fn http(status: u16, reason: impl Into<String>) -> Self {
        ClientError::Http { status, reason: reason.into() }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Failure of the voice pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VoiceError {
    #[error("Microphone access denied: {0}")]
    CaptureDenied(String),

    #[error("Recording failed: {0}")]
    Capture(String),

    #[error("Playback failed: {0}")]
    Playback(String),

    #[error("Cannot {event} while {state}")]
    InvalidTransition { state: &'static str, event: &'static str },

    #[error("Nothing to replay")]
    NothingToReplay,

    #[error("Another request is still in progress")]
    Busy,

    #[error(transparent)]
    Client(#[from] ClientError),
}

impl VoiceError {
    pub fn is_capture_denied(&self) -> bool {
        matches!(self, VoiceError::CaptureDenied(_))
    }
}
