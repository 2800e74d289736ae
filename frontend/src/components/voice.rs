use harness_core::voice::VoiceState;
use leptos::prelude::*;

use crate::state::AppState;

fn status_text(state: &VoiceState) -> String {
    match state {
        VoiceState::Idle => "Ready".to_string(),
        VoiceState::Recording => "Recording… click Stop to send".to_string(),
        VoiceState::Processing => "Processing audio…".to_string(),
        VoiceState::AwaitingReply => "Waiting for reply…".to_string(),
        VoiceState::Speaking => "Speaking…".to_string(),
        VoiceState::Error(message) => format!("Error: {message}"),
    }
}

/// Record, send and hear the reply.
#[component]
pub fn VoicePanel() -> impl IntoView {
    let state = expect_context::<AppState>();
    let voice = state.voice_state;

    view! {
        <div class="voice-panel">
            <div
                class="voice-status"
                class:recording=move || voice.get() == VoiceState::Recording
                class:error=move || matches!(voice.get(), VoiceState::Error(_))
            >
                {move || status_text(&voice.get())}
            </div>

            <div class="button-row">
                <button
                    class="record-btn"
                    on:click=move |_| state.start_recording()
                    disabled=move || !voice.get().is_ready()
                >
                    "Start Recording"
                </button>
                <button
                    class="stop-btn"
                    on:click=move |_| state.stop_recording()
                    disabled=move || voice.get() != VoiceState::Recording || state.is_streaming.get()
                >
                    "Stop & Send"
                </button>
                <button
                    on:click=move |_| state.replay_voice()
                    disabled=move || !state.can_replay.get()
                >
                    "Replay"
                </button>
            </div>

            {move || state.voice_notice.get().map(|notice| view! { <div class="voice-notice">{notice}</div> })}

            <div class="voice-reply">{move || state.voice_reply.get()}</div>
        </div>
    }
}
