use futures_util::StreamExt;
use futures_util::stream::LocalBoxStream;

use crate::errors::ClientError;

/// Response body as it arrives off the wire.
pub type ByteStream = LocalBoxStream<'static, Result<Vec<u8>, ClientError>>;

/// An HTTP response whose body has not been read yet.
pub struct TransportResponse {
    pub status: u16,
    pub status_text: String,
    pub body: ByteStream,
}

impl TransportResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Drains the body into memory.
    pub async fn bytes(mut self) -> Result<Vec<u8>, ClientError> {
        let mut out = Vec::new();
        while let Some(chunk) = self.body.next().await {
            out.extend_from_slice(&chunk?);
        }
        Ok(out)
    }
}

impl std::fmt::Debug for TransportResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransportResponse")
            .field("status", &self.status)
            .field("status_text", &self.status_text)
            .finish_non_exhaustive()
    }
}

/// Minimal HTTP surface the client needs. The browser implementation
/// wraps `fetch`; tests script responses.
#[allow(async_fn_in_trait)]
pub trait Transport {
    async fn get(&self, url: &str) -> Result<TransportResponse, ClientError>;

    /// POSTs `body` as `application/json`, or an empty body when `None`.
    async fn post(
        &self,
        url: &str,
        body: Option<&serde_json::Value>,
    ) -> Result<TransportResponse, ClientError>;
}
