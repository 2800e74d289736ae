mod api;
mod components;
mod media;
mod models;
mod sse;
mod state;

use leptos::mount::mount_to_body;
use leptos::prelude::*;

use components::activity::ActivityPanel;
use components::chat::ChatPanel;
use components::gmail::GmailPanel;
use components::header::{Header, TabBar};
use components::mcp::McpPanel;
use components::push::PushPanel;
use components::sessions::SessionsPanel;
use components::voice::VoicePanel;
use models::Tab;
use state::AppState;

/// Panel content for `tab`, kept mounted so inputs survive tab switches.
#[component]
fn TabContent(tab: Tab, children: Children) -> impl IntoView {
    let state = expect_context::<AppState>();

    view! {
        <section class="tab-content" class:active=move || state.active_tab.get() == tab>
            {children()}
        </section>
    }
}

/// Root application component.
#[component]
fn App() -> impl IntoView {
    let state = AppState::provide();

    state.log("Frontend application initialized");
    state.new_session();
    state.check_backend();
    state.start_health_polling();

    view! {
        <div class="app-container">
            <Header />
            <TabBar />
            <main class="tab-panels">
                <TabContent tab=Tab::Chat><ChatPanel /></TabContent>
                <TabContent tab=Tab::Voice><VoicePanel /></TabContent>
                <TabContent tab=Tab::Sessions><SessionsPanel /></TabContent>
                <TabContent tab=Tab::Mcp><McpPanel /></TabContent>
                <TabContent tab=Tab::Gmail><GmailPanel /></TabContent>
                <TabContent tab=Tab::Push><PushPanel /></TabContent>
            </main>
            <ActivityPanel />
        </div>
    }
}

fn main() {
    console_log::init_with_level(log::Level::Debug).expect("Failed to init logger");
    mount_to_body(App);
}
