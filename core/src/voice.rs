//! Record → upload → streamed reply → speech, as an explicit state machine.
//!
//! Device and speech access sit behind [`AudioCapture`], [`ActiveRecording`]
//! and [`SpeechOutput`] so the pipeline runs the same against browser APIs
//! and test doubles.

use std::cell::RefCell;

use log::{debug, error, info, warn};

use crate::chat::RequestGate;
use crate::client::BackendClient;
use crate::errors::VoiceError;
use crate::models::RequestContext;
use crate::transport::Transport;

/// Encodings to record with, most preferred first.
pub const PREFERRED_MIME_TYPES: [&str; 2] = ["audio/webm;codecs=opus", "audio/mp4"];

/// First preferred encoding the runtime supports; `None` means let the
/// recorder pick its default.
pub fn choose_mime_type(is_supported: impl Fn(&str) -> bool) -> Option<&'static str> {
    PREFERRED_MIME_TYPES.into_iter().find(|m| is_supported(m))
}

/// An encoded recording.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioClip {
    pub data: Vec<u8>,
    pub mime_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureSettings {
    pub echo_cancellation: bool,
    pub noise_suppression: bool,
    pub mime_type: Option<&'static str>,
}

impl CaptureSettings {
    pub fn new(mime_type: Option<&'static str>) -> Self {
        Self { echo_cancellation: true, noise_suppression: true, mime_type }
    }
}

#[allow(async_fn_in_trait)]
pub trait AudioCapture {
    type Recording: ActiveRecording;

    fn supports_mime_type(&self, mime_type: &str) -> bool;

    /// Acquires the microphone and starts recording.
    async fn start(&self, settings: &CaptureSettings) -> Result<Self::Recording, VoiceError>;
}

#[allow(async_fn_in_trait)]
pub trait ActiveRecording {
    /// Stops recording and joins the captured fragments into one clip.
    async fn stop(&mut self) -> Result<AudioClip, VoiceError>;

    /// Hands the microphone back to the system.
    fn release(&mut self);
}

#[allow(async_fn_in_trait)]
pub trait SpeechOutput {
    fn is_available(&self) -> bool;

    /// Resolves once the utterance finished playing.
    async fn speak(&self, text: &str) -> Result<(), VoiceError>;
}

// ── State machine ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum VoiceState {
    #[default]
    Idle,
    Recording,
    Processing,
    AwaitingReply,
    Speaking,
    Error(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VoiceEvent {
    Start,
    Stop,
    Submit,
    ReplyReady,
    PlaybackDone,
    Replay,
    Reset,
    Fail(String),
}

impl VoiceEvent {
    fn name(&self) -> &'static str {
        match self {
            VoiceEvent::Start => "start recording",
            VoiceEvent::Stop => "stop recording",
            VoiceEvent::Submit => "submit audio",
            VoiceEvent::ReplyReady => "play a reply",
            VoiceEvent::PlaybackDone => "finish playback",
            VoiceEvent::Replay => "replay",
            VoiceEvent::Reset => "reset",
            VoiceEvent::Fail(_) => "fail",
        }
    }
}

impl VoiceState {
    pub fn name(&self) -> &'static str {
        match self {
            VoiceState::Idle => "idle",
            VoiceState::Recording => "recording",
            VoiceState::Processing => "processing",
            VoiceState::AwaitingReply => "awaiting reply",
            VoiceState::Speaking => "speaking",
            VoiceState::Error(_) => "in error",
        }
    }

    /// Whether a new recording may start from here.
    pub fn is_ready(&self) -> bool {
        matches!(self, VoiceState::Idle | VoiceState::Error(_))
    }

    pub fn is_busy(&self) -> bool {
        !self.is_ready() && *self != VoiceState::Recording
    }

    /// The state `event` leads to, or why it is not allowed here.
    pub fn on(&self, event: VoiceEvent) -> Result<VoiceState, VoiceError> {
        use VoiceEvent as E;
        use VoiceState as S;

        let next = match (self, &event) {
            (_, E::Fail(message)) => S::Error(message.clone()),
            (S::Idle | S::Error(_), E::Start) => S::Recording,
            (S::Idle | S::Error(_), E::Replay) => S::Speaking,
            (S::Idle | S::Error(_), E::Reset) => S::Idle,
            (S::Recording, E::Stop) => S::Processing,
            (S::Processing, E::Submit) => S::AwaitingReply,
            (S::AwaitingReply, E::ReplyReady) => S::Speaking,
            (S::Speaking, E::PlaybackDone) => S::Idle,
            (
                S::Idle | S::Recording | S::Processing | S::AwaitingReply | S::Speaking | S::Error(_),
                E::Start
                | E::Stop
                | E::Submit
                | E::ReplyReady
                | E::PlaybackDone
                | E::Replay
                | E::Reset,
            ) => {
                return Err(VoiceError::InvalidTransition {
                    state: self.name(),
                    event: event.name(),
                });
            }
        };
        Ok(next)
    }
}

/// How a reply reached the operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackMode {
    Spoken,
    /// No speech synthesis available; the text is only displayed.
    TextOnly,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoiceReply {
    pub text: String,
    pub playback: PlaybackMode,
}

// ── Pipeline ─────────────────────────────────────────────────────────────────

pub struct VoicePipeline<C: AudioCapture, S, T> {
    capture: C,
    speech: S,
    client: BackendClient<T>,
    state: RefCell<VoiceState>,
    recording: RefCell<Option<C::Recording>>,
    last_reply: RefCell<Option<String>>,
    gate: RequestGate,
    observer: Box<dyn Fn(&VoiceState)>,
}

impl<C, S, T> VoicePipeline<C, S, T>
where
    C: AudioCapture,
    S: SpeechOutput,
    T: Transport,
{
    pub fn new(capture: C, speech: S, client: BackendClient<T>) -> Self {
        Self {
            capture,
            speech,
            client,
            state: RefCell::new(VoiceState::Idle),
            recording: RefCell::new(None),
            last_reply: RefCell::new(None),
            gate: RequestGate::new(),
            observer: Box::new(|_| {}),
        }
    }

    /// Uploads only while `gate` is free, and holds it until the reply
    /// finished playing.
    pub fn with_gate(mut self, gate: RequestGate) -> Self {
        self.gate = gate;
        self
    }

    /// Registers a callback run after every state change.
    pub fn with_observer(mut self, observer: impl Fn(&VoiceState) + 'static) -> Self {
        self.observer = Box::new(observer);
        self
    }

    pub fn state(&self) -> VoiceState {
        self.state.borrow().clone()
    }

    pub fn last_reply(&self) -> Option<String> {
        self.last_reply.borrow().clone()
    }

    pub fn can_replay(&self) -> bool {
        self.last_reply.borrow().is_some() && self.state.borrow().is_ready()
    }

    /// Requests the microphone and starts recording.
    pub async fn start(&self) -> Result<(), VoiceError> {
        self.advance(VoiceEvent::Start)?;

        let mime_type = choose_mime_type(|m| self.capture.supports_mime_type(m));
        if mime_type.is_none() {
            warn!("No preferred audio encoding supported; using recorder default");
        }
        let settings = CaptureSettings::new(mime_type);

        let mut recording = match self.capture.start(&settings).await {
            Ok(recording) => recording,
            Err(e) => return Err(self.fail(e)),
        };

        // stopped or failed while waiting for the device
        if *self.state.borrow() != VoiceState::Recording {
            recording.release();
            return Err(VoiceError::Capture("recording was cancelled".to_string()));
        }

        info!("Recording started ({})", mime_type.unwrap_or("default encoding"));
        *self.recording.borrow_mut() = Some(recording);
        Ok(())
    }

    /// Stops recording, uploads the clip, streams the reply text through
    /// `on_partial` and speaks it.
    ///
    /// The microphone is released exactly once, before the upload starts.
    /// While another request holds the gate this fails with
    /// [`VoiceError::Busy`] and the recording keeps running.
    pub async fn stop_and_send(
        &self,
        ctx: &RequestContext,
        on_partial: impl FnMut(&str),
    ) -> Result<VoiceReply, VoiceError> {
        self.state.borrow().on(VoiceEvent::Stop)?;
        let Some(_in_flight) = self.gate.try_begin() else {
            warn!("Voice send refused: another request is in flight");
            return Err(VoiceError::Busy);
        };
        self.advance(VoiceEvent::Stop)?;

        let Some(mut recording) = self.recording.borrow_mut().take() else {
            return Err(self.fail(VoiceError::Capture("no active recording".to_string())));
        };
        let stopped = recording.stop().await;
        recording.release();
        drop(recording);

        let clip = stopped.map_err(|e| self.fail(e))?;
        if clip.data.is_empty() {
            return Err(self.fail(VoiceError::Capture("no audio was captured".to_string())));
        }
        debug!("Captured {} bytes of {}", clip.data.len(), clip.mime_type);

        self.advance(VoiceEvent::Submit)?;
        let text = self
            .client
            .stream_voice(ctx, &clip, on_partial)
            .await
            .map_err(|e| self.fail(e.into()))?;

        self.advance(VoiceEvent::ReplyReady)?;
        *self.last_reply.borrow_mut() = Some(text.clone());
        let playback = self.play(&text).await?;
        self.advance(VoiceEvent::PlaybackDone)?;

        Ok(VoiceReply { text, playback })
    }

    /// Speaks the last reply again.
    pub async fn replay(&self) -> Result<PlaybackMode, VoiceError> {
        let text = self.last_reply().ok_or(VoiceError::NothingToReplay)?;
        self.advance(VoiceEvent::Replay)?;
        let playback = self.play(&text).await?;
        self.advance(VoiceEvent::PlaybackDone)?;
        Ok(playback)
    }

    /// Clears an error so the panel shows idle again.
    pub fn reset(&self) -> Result<(), VoiceError> {
        self.advance(VoiceEvent::Reset)
    }

    async fn play(&self, text: &str) -> Result<PlaybackMode, VoiceError> {
        if !self.speech.is_available() {
            info!("Speech synthesis unavailable; showing reply as text");
            return Ok(PlaybackMode::TextOnly);
        }
        self.speech.speak(text).await.map_err(|e| self.fail(e))?;
        Ok(PlaybackMode::Spoken)
    }

    fn advance(&self, event: VoiceEvent) -> Result<(), VoiceError> {
        let next = self.state.borrow().on(event)?;
        self.set_state(next);
        Ok(())
    }

    fn fail(&self, err: VoiceError) -> VoiceError {
        error!("Voice error: {err}");
        self.set_state(VoiceState::Error(err.to_string()));
        err
    }

    fn set_state(&self, next: VoiceState) {
        debug!("Voice state -> {}", next.name());
        *self.state.borrow_mut() = next.clone();
        (self.observer)(&next);
    }
}

impl<C: AudioCapture, S, T> Drop for VoicePipeline<C, S, T> {
    fn drop(&mut self) {
        if let Some(mut recording) = self.recording.get_mut().take() {
            recording.release();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use futures_util::future::join;

    use super::*;
    use crate::chat::{ChatSession, SendOutcome};
    use crate::client::ClientConfig;
    use crate::errors::ClientError;
    use crate::models::AgentKind;
    use crate::models::SessionId;
    use crate::transport::testing::{Scripted, ScriptedTransport};

    #[derive(Default)]
    struct Probe {
        releases: Cell<u32>,
        starts: Cell<u32>,
    }

    struct FakeCapture {
        probe: Rc<Probe>,
        deny: bool,
        supported: Vec<&'static str>,
        audio: Vec<u8>,
    }

    struct FakeRecording {
        probe: Rc<Probe>,
        audio: Vec<u8>,
        mime_type: String,
    }

    impl AudioCapture for FakeCapture {
        type Recording = FakeRecording;

        fn supports_mime_type(&self, mime_type: &str) -> bool {
            self.supported.iter().any(|m| *m == mime_type)
        }

        async fn start(&self, settings: &CaptureSettings) -> Result<FakeRecording, VoiceError> {
            assert!(settings.echo_cancellation && settings.noise_suppression);
            if self.deny {
                return Err(VoiceError::CaptureDenied("NotAllowedError".into()));
            }
            self.probe.starts.set(self.probe.starts.get() + 1);
            Ok(FakeRecording {
                probe: Rc::clone(&self.probe),
                audio: self.audio.clone(),
                mime_type: settings.mime_type.unwrap_or("audio/default").to_string(),
            })
        }
    }

    impl ActiveRecording for FakeRecording {
        async fn stop(&mut self) -> Result<AudioClip, VoiceError> {
            Ok(AudioClip { data: self.audio.clone(), mime_type: self.mime_type.clone() })
        }

        fn release(&mut self) {
            self.probe.releases.set(self.probe.releases.get() + 1);
        }
    }

    struct FakeSpeech {
        available: bool,
        spoken: RefCell<Vec<String>>,
    }

    impl SpeechOutput for FakeSpeech {
        fn is_available(&self) -> bool {
            self.available
        }

        async fn speak(&self, text: &str) -> Result<(), VoiceError> {
            self.spoken.borrow_mut().push(text.to_string());
            Ok(())
        }
    }

    type Pipeline = VoicePipeline<FakeCapture, FakeSpeech, ScriptedTransport>;

    fn pipeline(probe: &Rc<Probe>, speech: bool, replies: Vec<Scripted>) -> Pipeline {
        let capture = FakeCapture {
            probe: Rc::clone(probe),
            deny: false,
            supported: vec!["audio/mp4"],
            audio: vec![7; 16],
        };
        let speech = FakeSpeech { available: speech, spoken: RefCell::new(Vec::new()) };
        let client = BackendClient::new(ClientConfig::new("http://b"), ScriptedTransport::new(replies));
        VoicePipeline::new(capture, speech, client)
    }

    fn ctx() -> RequestContext {
        RequestContext::new(SessionId::from_parts(3, "voice"))
    }

    #[test]
    fn mime_type_falls_back_in_preference_order() {
        assert_eq!(choose_mime_type(|_| true), Some("audio/webm;codecs=opus"));
        assert_eq!(choose_mime_type(|m| m == "audio/mp4"), Some("audio/mp4"));
        assert_eq!(choose_mime_type(|_| false), None);
    }

    #[test]
    fn transitions_follow_the_happy_path() {
        let s = VoiceState::Idle;
        let s = s.on(VoiceEvent::Start).unwrap();
        let s = s.on(VoiceEvent::Stop).unwrap();
        let s = s.on(VoiceEvent::Submit).unwrap();
        let s = s.on(VoiceEvent::ReplyReady).unwrap();
        assert_eq!(s, VoiceState::Speaking);
        assert_eq!(s.on(VoiceEvent::PlaybackDone).unwrap(), VoiceState::Idle);
    }

    #[test]
    fn invalid_transitions_are_rejected_and_fail_always_applies() {
        let err = VoiceState::Idle.on(VoiceEvent::Stop).unwrap_err();
        assert_eq!(err.to_string(), "Cannot stop recording while idle");
        assert!(VoiceState::Recording.on(VoiceEvent::Start).is_err());
        assert!(VoiceState::AwaitingReply.on(VoiceEvent::Replay).is_err());

        for state in [VoiceState::Idle, VoiceState::Processing, VoiceState::Speaking] {
            assert_eq!(
                state.on(VoiceEvent::Fail("boom".into())).unwrap(),
                VoiceState::Error("boom".into())
            );
        }
        let recovered = VoiceState::Error("x".into()).on(VoiceEvent::Start).unwrap();
        assert_eq!(recovered, VoiceState::Recording);
    }

    #[tokio::test]
    async fn full_round_trip_speaks_reply() {
        let probe = Rc::new(Probe::default());
        let seen = Rc::new(RefCell::new(Vec::new()));
        let seen_states = Rc::clone(&seen);
        let voice = pipeline(
            &probe,
            true,
            vec![Scripted::ok(["data: {\"token\":\"Hi \"}\n", "data: {\"token\":\"there\"}\n"])],
        )
        .with_observer(move |s| seen_states.borrow_mut().push(s.clone()));

        voice.start().await.unwrap();
        let mut partials = Vec::new();
        let reply = voice
            .stop_and_send(&ctx(), |p| partials.push(p.to_string()))
            .await
            .unwrap();

        assert_eq!(reply, VoiceReply { text: "Hi there".into(), playback: PlaybackMode::Spoken });
        assert_eq!(partials, vec!["Hi ", "Hi there"]);
        assert_eq!(voice.speech.spoken.borrow().as_slice(), ["Hi there"]);
        assert_eq!(probe.releases.get(), 1);
        assert_eq!(
            *seen.borrow(),
            vec![
                VoiceState::Recording,
                VoiceState::Processing,
                VoiceState::AwaitingReply,
                VoiceState::Speaking,
                VoiceState::Idle,
            ]
        );

        let requests = voice.client.transport().requests.borrow();
        let body = requests[0].body.as_ref().unwrap();
        assert_eq!(requests[0].url, "http://b/mcp/voice");
        assert_eq!(body["params"]["sessionId"], "session_3_voice");
    }

    #[tokio::test]
    async fn failed_upload_still_releases_microphone_once() {
        let probe = Rc::new(Probe::default());
        let voice = pipeline(&probe, true, vec![Scripted::Fail(ClientError::network("offline"))]);

        voice.start().await.unwrap();
        let err = voice.stop_and_send(&ctx(), |_| {}).await.unwrap_err();

        assert_eq!(err, VoiceError::Client(ClientError::network("offline")));
        assert_eq!(probe.releases.get(), 1);
        assert_eq!(voice.state(), VoiceState::Error("Network error: offline".into()));

        drop(voice);
        assert_eq!(probe.releases.get(), 1);
    }

    #[tokio::test]
    async fn denied_microphone_moves_to_error() {
        let probe = Rc::new(Probe::default());
        let mut voice = pipeline(&probe, true, vec![]);
        voice.capture.deny = true;

        let err = voice.start().await.unwrap_err();

        assert!(err.is_capture_denied());
        assert!(matches!(voice.state(), VoiceState::Error(_)));
        assert_eq!(probe.releases.get(), 0);

        voice.reset().unwrap();
        assert_eq!(voice.state(), VoiceState::Idle);
    }

    #[tokio::test]
    async fn second_start_while_recording_is_rejected() {
        let probe = Rc::new(Probe::default());
        let voice = pipeline(&probe, true, vec![]);

        voice.start().await.unwrap();
        let err = voice.start().await.unwrap_err();

        assert!(matches!(err, VoiceError::InvalidTransition { .. }));
        assert_eq!(probe.starts.get(), 1);
        assert_eq!(voice.state(), VoiceState::Recording);

        drop(voice);
        assert_eq!(probe.releases.get(), 1);
    }

    #[tokio::test]
    async fn missing_speech_falls_back_to_text_and_replays() {
        let probe = Rc::new(Probe::default());
        let voice = pipeline(&probe, false, vec![Scripted::ok(["data: {\"token\":\"plain\"}\n"])]);

        assert_eq!(voice.replay().await.unwrap_err(), VoiceError::NothingToReplay);

        voice.start().await.unwrap();
        let reply = voice.stop_and_send(&ctx(), |_| {}).await.unwrap();

        assert_eq!(reply.playback, PlaybackMode::TextOnly);
        assert!(voice.speech.spoken.borrow().is_empty());
        assert!(voice.can_replay());
        assert_eq!(voice.replay().await.unwrap(), PlaybackMode::TextOnly);
        assert_eq!(voice.state(), VoiceState::Idle);
    }

    #[tokio::test]
    async fn empty_recording_is_an_error() {
        let probe = Rc::new(Probe::default());
        let mut voice = pipeline(&probe, true, vec![]);
        voice.capture.audio.clear();

        voice.start().await.unwrap();
        let err = voice.stop_and_send(&ctx(), |_| {}).await.unwrap_err();

        assert_eq!(err, VoiceError::Capture("no audio was captured".into()));
        assert_eq!(probe.releases.get(), 1);
        assert!(voice.client.transport().requests.borrow().is_empty());
    }

    #[tokio::test]
    async fn voice_send_waits_while_the_gate_is_held() {
        let probe = Rc::new(Probe::default());
        let gate = RequestGate::new();
        let voice = pipeline(&probe, true, vec![Scripted::ok(["data: {\"token\":\"ok\"}\n"])])
            .with_gate(gate.clone());

        voice.start().await.unwrap();
        let held = gate.try_begin();
        let err = voice.stop_and_send(&ctx(), |_| {}).await.unwrap_err();

        assert_eq!(err, VoiceError::Busy);
        assert_eq!(voice.state(), VoiceState::Recording);
        assert_eq!(probe.releases.get(), 0);
        assert!(voice.client.transport().requests.borrow().is_empty());

        drop(held);
        let reply = voice.stop_and_send(&ctx(), |_| {}).await.unwrap();
        assert_eq!(reply.text, "ok");
        assert_eq!(probe.releases.get(), 1);
        assert!(!gate.is_busy());
    }

    #[tokio::test]
    async fn chat_send_is_skipped_while_voice_send_runs() {
        let probe = Rc::new(Probe::default());
        let gate = RequestGate::new();
        let voice = pipeline(&probe, true, vec![Scripted::ok(["data: {\"token\":\"spoken\"}\n"])])
            .with_gate(gate.clone());
        let chat = ChatSession::with_gate(
            BackendClient::new(ClientConfig::new("http://b"), ScriptedTransport::new([])),
            gate.clone(),
        );

        voice.start().await.unwrap();
        // the voice send claims the gate before its first await point
        let (reply, outcome) = join(
            voice.stop_and_send(&ctx(), |_| {}),
            chat.send(&ctx(), AgentKind::QueryAssistant, "typed meanwhile", |_| {}),
        )
        .await;

        assert_eq!(reply.unwrap().text, "spoken");
        assert_eq!(outcome, SendOutcome::Skipped);
        assert!(chat.client().transport().requests.borrow().is_empty());
        assert!(!chat.is_sending());
    }
}
