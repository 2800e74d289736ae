use harness_core::ClientError;
use harness_core::push::{PushConnection, PushConnector, PushEvent, PushEventKind, PushSignal, SignalHandler};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{Event, EventSource, MessageEvent};

use crate::api::js_message;

/// Opens `EventSource` connections.
#[derive(Debug, Clone, Copy, Default)]
pub struct EventSourceConnector;

/// A live `EventSource` plus the callbacks registered on it.
pub struct EventSourceConnection {
    source: EventSource,
    listeners: Vec<(PushEventKind, Closure<dyn FnMut(MessageEvent)>)>,
    _on_open: Closure<dyn FnMut()>,
    _on_error: Closure<dyn FnMut(Event)>,
    closed: bool,
}

impl PushConnector for EventSourceConnector {
    type Connection = EventSourceConnection;

    fn open(&self, url: &str, on_signal: SignalHandler) -> Result<EventSourceConnection, ClientError> {
        let source = EventSource::new(url).map_err(|e| ClientError::network(js_message(&e)))?;

        let handler = on_signal.clone();
        let on_open = Closure::<dyn FnMut()>::new(move || handler(PushSignal::Opened));
        source.set_onopen(Some(on_open.as_ref().unchecked_ref()));

        let handler = on_signal.clone();
        let on_error = Closure::<dyn FnMut(Event)>::new(move |ev: Event| {
            handler(PushSignal::Error(format!("{} on event stream", ev.type_())));
        });
        source.set_onerror(Some(on_error.as_ref().unchecked_ref()));

        let on_message = message_listener(PushEventKind::Message, on_signal.clone());
        source.set_onmessage(Some(on_message.as_ref().unchecked_ref()));

        let mut connection = EventSourceConnection {
            source,
            listeners: vec![(PushEventKind::Message, on_message)],
            _on_open: on_open,
            _on_error: on_error,
            closed: false,
        };

        for kind in PushEventKind::NAMED {
            let listener = message_listener(kind, on_signal.clone());
            if let Err(e) = connection
                .source
                .add_event_listener_with_callback(kind.event_name(), listener.as_ref().unchecked_ref())
            {
                connection.close();
                return Err(ClientError::network(js_message(&e)));
            }
            connection.listeners.push((kind, listener));
        }

        Ok(connection)
    }
}

fn message_listener(kind: PushEventKind, handler: SignalHandler) -> Closure<dyn FnMut(MessageEvent)> {
    Closure::new(move |ev: MessageEvent| {
        let data = ev.data().as_string().unwrap_or_default();
        handler(PushSignal::Event(PushEvent::new(kind, data)));
    })
}

impl PushConnection for EventSourceConnection {
    fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.source.close();
        self.source.set_onopen(None);
        self.source.set_onerror(None);
        self.source.set_onmessage(None);
        for (kind, listener) in &self.listeners {
            if *kind != PushEventKind::Message {
                let _ = self
                    .source
                    .remove_event_listener_with_callback(kind.event_name(), listener.as_ref().unchecked_ref());
            }
        }
    }
}

impl Drop for EventSourceConnection {
    fn drop(&mut self) {
        self.close();
    }
}
