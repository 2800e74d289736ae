use leptos::prelude::*;

use crate::state::AppState;

#[component]
pub fn ActivityPanel() -> impl IntoView {
    let state = expect_context::<AppState>();

    view! {
        <section class="response-log">
            <div class="panel-header">
                <h3>"Response Log"</h3>
                <button on:click=move |_| state.clear_log()>"Clear"</button>
            </div>
            <pre class="log-output">{move || state.activity.get().text()}</pre>
        </section>
    }
}
