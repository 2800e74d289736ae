//! Incremental consumer for the backend's `data: {"token": ...}` line stream.

use futures_util::StreamExt;
use log::trace;

use crate::errors::ClientError;
use crate::transport::TransportResponse;

const DATA_PREFIX: &str = "data: ";

/// Splits raw body bytes into lines and pulls the `token` out of every
/// well-formed `data: ` line.
///
/// Bytes are buffered until a newline arrives, so lines and multi-byte
/// characters split across chunks are reassembled before parsing.
#[derive(Debug, Default)]
pub struct TokenStreamDecoder {
    pending: Vec<u8>,
}

impl TokenStreamDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds one chunk and returns the tokens of every line it completed.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(chunk);

        let mut tokens = Vec::new();
        while let Some(pos) = self.pending.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=pos).collect();
            tokens.extend(parse_line(&line[..pos]));
        }
        tokens
    }

    /// Flushes a trailing line that was never newline-terminated.
    pub fn finish(&mut self) -> Vec<String> {
        let rest = std::mem::take(&mut self.pending);
        parse_line(&rest).into_iter().collect()
    }
}

/// Token carried by a single line, if any. Anything else is skipped.
fn parse_line(raw: &[u8]) -> Option<String> {
    let line = String::from_utf8_lossy(raw);
    let line = line.strip_suffix('\r').unwrap_or(&line);
    let payload = line.strip_prefix(DATA_PREFIX)?;

    let value: serde_json::Value = match serde_json::from_str(payload) {
        Ok(v) => v,
        Err(e) => {
            trace!("skipping non-JSON stream line ({e}): {payload}");
            return None;
        }
    };

    match value.get("token").and_then(serde_json::Value::as_str) {
        Some(token) if !token.is_empty() => Some(token.to_string()),
        _ => {
            trace!("skipping stream line without token: {payload}");
            None
        }
    }
}

/// Reads `response` to the end, calling `on_partial` with the accumulated
/// text after every token, and returns the final text.
///
/// A non-success status fails before any token is emitted.
pub async fn consume_token_stream(
    response: TransportResponse,
    mut on_partial: impl FnMut(&str),
) -> Result<String, ClientError> {
    if !response.is_success() {
        return Err(ClientError::http(response.status, response.status_text));
    }

    let mut body = response.body;
    let mut decoder = TokenStreamDecoder::new();
    let mut text = String::new();

    while let Some(chunk) = body.next().await {
        for token in decoder.feed(&chunk?) {
            text.push_str(&token);
            on_partial(&text);
        }
    }
    for token in decoder.finish() {
        text.push_str(&token);
        on_partial(&text);
    }

    Ok(text)
}
