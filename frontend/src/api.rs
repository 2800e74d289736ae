use futures::StreamExt;
use futures::stream;
use gloo_net::http::{Request, Response};
use harness_core::{ByteStream, ClientConfig, ClientError, Transport, TransportResponse};
use js_sys::{Reflect, Uint8Array};
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;
use web_sys::{ReadableStream, ReadableStreamDefaultReader};

/// Backend location, overridable at build time.
pub fn client_config() -> ClientConfig {
    ClientConfig::from_overrides(
        option_env!("HARNESS_BACKEND_URL"),
        option_env!("HARNESS_STATUS_URL"),
    )
}

/// `fetch`-backed transport. Response bodies are read chunk by chunk off
/// the underlying `ReadableStream`.
#[derive(Debug, Clone, Copy, Default)]
pub struct FetchTransport;

impl Transport for FetchTransport {
    async fn get(&self, url: &str) -> Result<TransportResponse, ClientError> {
        let resp = Request::get(url)
            .header("Content-Type", "application/json")
            .send()
            .await
            .map_err(|e| ClientError::network(e.to_string()))?;
        Ok(into_transport_response(resp))
    }

    async fn post(
        &self,
        url: &str,
        body: Option<&serde_json::Value>,
    ) -> Result<TransportResponse, ClientError> {
        let builder = Request::post(url).header("Content-Type", "application/json");
        let request = match body {
            Some(json) => builder.json(json),
            None => builder.build(),
        }
        .map_err(|e| ClientError::Encode(e.to_string()))?;

        let resp = request
            .send()
            .await
            .map_err(|e| ClientError::network(e.to_string()))?;
        Ok(into_transport_response(resp))
    }
}

fn into_transport_response(resp: Response) -> TransportResponse {
    TransportResponse {
        status: resp.status(),
        status_text: resp.status_text(),
        body: body_stream(resp.body()),
    }
}

fn body_stream(body: Option<ReadableStream>) -> ByteStream {
    let Some(body) = body else {
        return stream::empty().boxed_local();
    };
    let reader: ReadableStreamDefaultReader = body.get_reader().unchecked_into();

    stream::unfold(Some(reader), |reader| async move {
        let reader = reader?;
        match read_chunk(&reader).await {
            Ok(Some(bytes)) => Some((Ok(bytes), Some(reader))),
            Ok(None) => None,
            // the stream is unusable after a failed read
            Err(e) => Some((Err(e), None)),
        }
    })
    .boxed_local()
}

async fn read_chunk(reader: &ReadableStreamDefaultReader) -> Result<Option<Vec<u8>>, ClientError> {
    let result = JsFuture::from(reader.read()).await.map_err(js_network_error)?;

    let done = Reflect::get(&result, &JsValue::from_str("done"))
        .map_err(js_network_error)?
        .as_bool()
        .unwrap_or(true);
    if done {
        return Ok(None);
    }

    let value = Reflect::get(&result, &JsValue::from_str("value")).map_err(js_network_error)?;
    Ok(Some(Uint8Array::new(&value).to_vec()))
}

/// Best-effort text for a thrown JS value.
pub fn js_message(value: &JsValue) -> String {
    if let Some(err) = value.dyn_ref::<js_sys::Error>() {
        return String::from(err.message());
    }
    value.as_string().unwrap_or_else(|| format!("{value:?}"))
}

fn js_network_error(value: JsValue) -> ClientError {
    ClientError::network(js_message(&value))
}
