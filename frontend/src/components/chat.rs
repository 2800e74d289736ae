use harness_core::{AgentKind, ChatTurn, Role};
use leptos::ev;
use leptos::prelude::*;

use crate::state::AppState;

/// Agent picker, transcript and input.
#[component]
pub fn ChatPanel() -> impl IntoView {
    let state = expect_context::<AppState>();

    view! {
        <div class="chat-area">
            <div class="chat-header">
                <label for="agent-select">"Agent"</label>
                <select
                    id="agent-select"
                    on:change=move |ev| state.agent.set(AgentKind::parse(&event_target_value(&ev)))
                >
                    {AgentKind::ALL
                        .into_iter()
                        .map(|agent| {
                            view! {
                                <option
                                    value=agent.as_str()
                                    selected=move || state.agent.get() == agent
                                >
                                    {agent.label()}
                                </option>
                            }
                        })
                        .collect_view()}
                </select>
            </div>

            <div class="messages-container">
                {move || {
                    let transcript = state.transcript.get();
                    if transcript.is_empty() {
                        view! {
                            <div class="empty-state">"Send a message to start chatting"</div>
                        }
                            .into_any()
                    } else {
                        transcript
                            .turns()
                            .iter()
                            .cloned()
                            .map(|turn| view! { <MessageBubble turn=turn /> })
                            .collect_view()
                            .into_any()
                    }
                }}
            </div>

            <ChatInput />
        </div>
    }
}

/// A single chat message bubble.
#[component]
fn MessageBubble(turn: ChatTurn) -> impl IntoView {
    let css_class = match (turn.role, turn.streaming) {
        (Role::User, _) => "message user",
        (Role::Assistant, true) => "message assistant streaming",
        (Role::Assistant, false) => "message assistant",
    };
    let thinking = turn.streaming && turn.content.is_empty();

    view! {
        <div class=css_class>
            <div class="role-label">{turn.role.as_str()}</div>
            {if thinking {
                view! {
                    <div class="thinking">
                        <span class="dot"></span>
                        <span class="dot"></span>
                        <span class="dot"></span>
                    </div>
                }
                    .into_any()
            } else {
                view! { <div class="message-content">{turn.content}</div> }.into_any()
            }}
        </div>
    }
}

/// Chat input form with textarea and send button.
#[component]
fn ChatInput() -> impl IntoView {
    let state = expect_context::<AppState>();
    let (input, set_input) = signal(String::new());

    let is_sending = move || state.request_in_flight();

    let send = move || {
        let text = input.get_untracked();
        if text.trim().is_empty() {
            return;
        }
        set_input.set(String::new());
        state.send_chat(text);
    };

    let on_keydown = move |ev: ev::KeyboardEvent| {
        if ev.key() == "Enter" && !ev.shift_key() {
            ev.prevent_default();
            send();
        }
    };

    view! {
        <div class="input-area">
            <div class="input-row">
                <textarea
                    rows="2"
                    placeholder="Type a message… (Enter to send, Shift+Enter for newline)"
                    prop:value=move || input.get()
                    on:input=move |ev| set_input.set(event_target_value(&ev))
                    on:keydown=on_keydown
                    disabled=is_sending
                />
                <button
                    class="send-btn"
                    on:click=move |_| send()
                    disabled=move || is_sending() || input.get().trim().is_empty()
                >
                    {move || if is_sending() { "Sending…" } else { "Send" }}
                </button>
            </div>
        </div>
    }
}
