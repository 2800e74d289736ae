use leptos::prelude::*;

use crate::state::AppState;

/// A labelled text input bound to `value`.
#[component]
pub fn TextField(label: &'static str, value: RwSignal<String>) -> impl IntoView {
    view! {
        <label class="field">
            <span>{label}</span>
            <input
                type="text"
                prop:value=move || value.get()
                on:input=move |ev| value.set(event_target_value(&ev))
            />
        </label>
    }
}

/// Request context fields, session creation and the session list.
#[component]
pub fn SessionsPanel() -> impl IntoView {
    let state = expect_context::<AppState>();

    view! {
        <div class="api-panel">
            <fieldset>
                <legend>"Request context"</legend>
                <TextField label="Client ID" value=state.client_id />
                <TextField label="Employee ID" value=state.employee_id />
                <TextField label="Module" value=state.module />
                <button on:click=move |_| state.create_session()>"Create Session"</button>
            </fieldset>

            <fieldset>
                <legend>"List sessions"</legend>
                <TextField label="Client ID" value=state.filter_client_id />
                <TextField label="Employee ID" value=state.filter_employee_id />
                <button on:click=move |_| state.list_sessions()>"Get Sessions"</button>
            </fieldset>

            <pre class="result-box">{move || state.sessions_result.get()}</pre>
        </div>
    }
}
