//! UI-agnostic client for the agent backend: token stream consumption,
//! chat sends, the voice pipeline and the push channel.
//!
//! Nothing here touches the DOM. The browser frontend supplies
//! [`Transport`], [`voice::AudioCapture`], [`voice::SpeechOutput`] and
//! [`push::PushConnector`] implementations.

pub mod activity;
pub mod chat;
pub mod client;
pub mod errors;
pub mod mcp;
pub mod models;
pub mod push;
pub mod stream;
pub mod transport;
pub mod voice;

pub use chat::{ChatSession, RequestGate, SendOutcome};
pub use client::{BackendClient, ClientConfig, HEALTH_POLL_INTERVAL};
pub use errors::{ClientError, VoiceError};
pub use models::{
    AgentKind, BackendStatus, ChatFilter, ChatTurn, RequestContext, Role, SessionId, Transcript,
    TranscriptUpdate,
};
pub use transport::{ByteStream, Transport, TransportResponse};
