use harness_core::mcp::McpMethod;
use leptos::prelude::*;

use crate::components::sessions::TextField;
use crate::state::AppState;

/// Direct calls to the MCP dispatch endpoint. Only the inputs the selected
/// method accepts are shown.
#[component]
pub fn McpPanel() -> impl IntoView {
    let state = expect_context::<AppState>();
    let method = move || McpMethod::parse(&state.mcp_method.get());

    view! {
        <div class="api-panel">
            <label class="field">
                <span>"Method"</span>
                <select on:change=move |ev| state.mcp_method.set(event_target_value(&ev))>
                    {McpMethod::KNOWN
                        .into_iter()
                        .map(|m| {
                            let name = m.as_str().to_string();
                            let current = name.clone();
                            view! {
                                <option
                                    value=name.clone()
                                    selected=move || state.mcp_method.get() == current
                                >
                                    {name.clone()}
                                </option>
                            }
                        })
                        .collect_view()}
                </select>
            </label>

            <Show when=move || method().shows_query()>
                <label class="field">
                    <span>"Query"</span>
                    <textarea
                        rows="3"
                        prop:value=move || state.mcp_query.get()
                        on:input=move |ev| state.mcp_query.set(event_target_value(&ev))
                    />
                </label>
            </Show>
            <Show when=move || method().shows_module()>
                <TextField label="Module" value=state.mcp_module />
            </Show>

            <button on:click=move |_| state.send_mcp()>"Send MCP Request"</button>
            <pre class="result-box">{move || state.mcp_result.get()}</pre>
        </div>
    }
}
