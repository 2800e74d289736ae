use leptos::prelude::*;

use crate::state::AppState;

#[component]
pub fn GmailPanel() -> impl IntoView {
    let state = expect_context::<AppState>();

    view! {
        <div class="api-panel">
            <p>"Authorize the backend to read the operator's Gmail inbox."</p>
            <button on:click=move |_| state.gmail_auth()>"Authenticate Gmail"</button>
            <pre class="result-box">{move || state.gmail_result.get()}</pre>
        </div>
    }
}
