use leptos::prelude::*;

use crate::state::AppState;

/// Connect/disconnect controls and the received event lines.
#[component]
pub fn PushPanel() -> impl IntoView {
    let state = expect_context::<AppState>();

    view! {
        <div class="api-panel">
            <div class="button-row">
                <button
                    on:click=move |_| state.connect_push()
                    disabled=move || state.push_connected.get()
                >
                    "Connect"
                </button>
                <button
                    on:click=move |_| state.disconnect_push()
                    disabled=move || !state.push_connected.get()
                >
                    "Disconnect"
                </button>
                <span
                    class="sse-status"
                    class:online=move || state.push_status.get().is_online()
                >
                    {move || state.push_status.get().label()}
                </span>
            </div>
            <pre class="result-box sse-messages">
                {move || state.push_messages.get().join("\n")}
            </pre>
        </div>
    }
}
