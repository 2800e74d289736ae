pub mod activity;
pub mod chat;
pub mod gmail;
pub mod header;
pub mod mcp;
pub mod push;
pub mod sessions;
pub mod voice;
