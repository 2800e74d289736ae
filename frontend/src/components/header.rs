use harness_core::BackendStatus;
use leptos::prelude::*;

use crate::models::Tab;
use crate::state::AppState;

/// Title bar with backend status and the current session.
#[component]
pub fn Header() -> impl IntoView {
    let state = expect_context::<AppState>();

    let status_label = move || match state.backend_status.get() {
        Some(status) => status.label(),
        None => "Checking…",
    };
    let online = move || state.backend_status.get() == Some(BackendStatus::Online);
    let offline = move || state.backend_status.get() == Some(BackendStatus::Offline);

    view! {
        <header class="app-header">
            <h1>"Agent Harness"</h1>
            <div class="status-indicator" class:online=online class:offline=offline>
                <span class="status-dot"></span>
                {status_label}
            </div>
            <div class="session-info">
                <span class="session-label">"Session"</span>
                <code class="session-id">{move || state.session_id.get().to_string()}</code>
                <button class="new-session-btn" on:click=move |_| state.new_session()>
                    "+ New Session"
                </button>
            </div>
        </header>
    }
}

/// One button per panel.
#[component]
pub fn TabBar() -> impl IntoView {
    let state = expect_context::<AppState>();

    view! {
        <nav class="tab-bar">
            {Tab::ALL
                .into_iter()
                .map(|tab| {
                    view! {
                        <button
                            class="tab-btn"
                            class:active=move || state.active_tab.get() == tab
                            on:click=move |_| state.active_tab.set(tab)
                        >
                            {tab.label()}
                        </button>
                    }
                })
                .collect_view()}
        </nav>
    }
}
