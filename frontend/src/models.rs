/// Panels of the harness, in tab order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Tab {
    #[default]
    Chat,
    Voice,
    Sessions,
    Mcp,
    Gmail,
    Push,
}

impl Tab {
    pub const ALL: [Tab; 6] = [Tab::Chat, Tab::Voice, Tab::Sessions, Tab::Mcp, Tab::Gmail, Tab::Push];

    pub fn label(&self) -> &'static str {
        match self {
            Tab::Chat => "Chat",
            Tab::Voice => "Voice",
            Tab::Sessions => "Sessions",
            Tab::Mcp => "MCP",
            Tab::Gmail => "Gmail",
            Tab::Push => "SSE",
        }
    }
}
