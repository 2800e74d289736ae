//! The backend's server push channel (`GET /mcp/sse`).

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use log::{info, warn};

use crate::errors::ClientError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushEventKind {
    Connected,
    Result,
    Cancel,
    /// Unnamed `message` event.
    Message,
}

impl PushEventKind {
    /// Named events the channel subscribes to besides plain messages.
    pub const NAMED: [PushEventKind; 3] =
        [PushEventKind::Connected, PushEventKind::Result, PushEventKind::Cancel];

    pub fn event_name(&self) -> &'static str {
        match self {
            PushEventKind::Connected => "connected",
            PushEventKind::Result => "result",
            PushEventKind::Cancel => "cancel",
            PushEventKind::Message => "message",
        }
    }

    fn label(&self) -> Option<&'static str> {
        match self {
            PushEventKind::Connected => Some("Connected"),
            PushEventKind::Result => Some("Result"),
            PushEventKind::Cancel => Some("Cancel"),
            PushEventKind::Message => None,
        }
    }
}

/// One event off the channel. The payload is shown verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushEvent {
    pub kind: PushEventKind,
    pub data: String,
}

impl PushEvent {
    pub fn new(kind: PushEventKind, data: impl Into<String>) -> Self {
        Self { kind, data: data.into() }
    }

    /// `"<time>: <Label> - <data>"`, or `"<time>: <data>"` for plain messages.
    pub fn display_line(&self, time: &str) -> String {
        match self.kind.label() {
            Some(label) => format!("{time}: {label} - {}", self.data),
            None => format!("{time}: {}", self.data),
        }
    }

    pub fn log_line(&self) -> String {
        match self.kind {
            PushEventKind::Message => format!("SSE message: {}", self.data),
            kind => format!("SSE {} event: {}", kind.event_name(), self.data),
        }
    }
}

/// What a live connection reports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushSignal {
    Opened,
    Event(PushEvent),
    Error(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PushStatus {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Error,
}

impl PushStatus {
    pub fn label(&self) -> &'static str {
        match self {
            PushStatus::Disconnected => "Disconnected",
            PushStatus::Connecting => "Connecting",
            PushStatus::Connected => "Connected",
            PushStatus::Error => "Error",
        }
    }

    pub fn is_online(&self) -> bool {
        matches!(self, PushStatus::Connected)
    }
}

pub type SignalHandler = Rc<dyn Fn(PushSignal)>;

/// Opens push connections; the browser implementation wraps `EventSource`.
pub trait PushConnector {
    type Connection: PushConnection;

    fn open(&self, url: &str, on_signal: SignalHandler) -> Result<Self::Connection, ClientError>;
}

pub trait PushConnection {
    fn close(&mut self);
}

/// Owns the single shared push connection.
///
/// Connecting again closes the previous connection first, and anything a
/// stale connection still delivers afterwards is dropped.
pub struct PushChannel<C: PushConnector> {
    connector: C,
    url: String,
    current: RefCell<Option<C::Connection>>,
    generation: Rc<Cell<u64>>,
    status: Rc<Cell<PushStatus>>,
    handler: SignalHandler,
}

impl<C: PushConnector> PushChannel<C> {
    /// `handler` sees every signal of the live connection, after the
    /// channel status has been updated for it.
    pub fn new(connector: C, url: impl Into<String>, handler: impl Fn(PushSignal) + 'static) -> Self {
        Self {
            connector,
            url: url.into(),
            current: RefCell::new(None),
            generation: Rc::new(Cell::new(0)),
            status: Rc::new(Cell::new(PushStatus::Disconnected)),
            handler: Rc::new(handler),
        }
    }

    pub fn status(&self) -> PushStatus {
        self.status.get()
    }

    pub fn is_connected(&self) -> bool {
        self.current.borrow().is_some()
    }

    pub fn connect(&self) -> Result<(), ClientError> {
        self.close_current();
        info!("Connecting to SSE at {}", self.url);

        let generation = self.generation.get() + 1;
        self.generation.set(generation);
        self.status.set(PushStatus::Connecting);

        let live = Rc::clone(&self.generation);
        let status = Rc::clone(&self.status);
        let handler = Rc::clone(&self.handler);
        let on_signal: SignalHandler = Rc::new(move |signal: PushSignal| {
            if live.get() != generation {
                return;
            }
            match &signal {
                PushSignal::Opened => status.set(PushStatus::Connected),
                PushSignal::Error(message) => {
                    warn!("SSE error: {message}");
                    status.set(PushStatus::Error);
                }
                PushSignal::Event(_) => {}
            }
            handler(signal);
        });

        match self.connector.open(&self.url, on_signal) {
            Ok(connection) => {
                *self.current.borrow_mut() = Some(connection);
                Ok(())
            }
            Err(e) => {
                self.status.set(PushStatus::Error);
                Err(e)
            }
        }
    }

    pub fn disconnect(&self) {
        self.close_current();
        self.generation.set(self.generation.get() + 1);
        self.status.set(PushStatus::Disconnected);
        info!("SSE disconnected");
    }

    fn close_current(&self) {
        let previous = self.current.borrow_mut().take();
        if let Some(mut connection) = previous {
            connection.close();
        }
    }
}

impl<C: PushConnector> Drop for PushChannel<C> {
    fn drop(&mut self) {
        if let Some(mut connection) = self.current.get_mut().take() {
            connection.close();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Link {
        handler: SignalHandler,
        closes: Rc<Cell<u32>>,
    }

    #[derive(Default)]
    struct FakeConnector {
        links: Rc<RefCell<Vec<Link>>>,
        refuse: bool,
    }

    struct FakeConnection {
        closes: Rc<Cell<u32>>,
    }

    impl PushConnector for FakeConnector {
        type Connection = FakeConnection;

        fn open(&self, _url: &str, on_signal: SignalHandler) -> Result<FakeConnection, ClientError> {
            if self.refuse {
                return Err(ClientError::network("refused"));
            }
            let closes = Rc::new(Cell::new(0));
            self.links.borrow_mut().push(Link { handler: on_signal, closes: Rc::clone(&closes) });
            Ok(FakeConnection { closes })
        }
    }

    impl PushConnection for FakeConnection {
        fn close(&mut self) {
            self.closes.set(self.closes.get() + 1);
        }
    }

    fn channel() -> (PushChannel<FakeConnector>, Rc<RefCell<Vec<Link>>>, Rc<RefCell<Vec<PushSignal>>>) {
        let connector = FakeConnector::default();
        let links = Rc::clone(&connector.links);
        let received = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&received);
        let channel = PushChannel::new(connector, "http://b/mcp/sse", move |s| sink.borrow_mut().push(s));
        (channel, links, received)
    }

    /// Delivers `signal` through every handler ever handed out, stale or not.
    fn broadcast(links: &Rc<RefCell<Vec<Link>>>, signal: PushSignal) {
        let handlers: Vec<SignalHandler> = links.borrow().iter().map(|l| Rc::clone(&l.handler)).collect();
        for handler in handlers {
            handler(signal.clone());
        }
    }

    #[test]
    fn reconnect_closes_exactly_one_previous_connection() {
        let (channel, links, received) = channel();

        assert!(!channel.is_connected());
        channel.connect().unwrap();
        channel.connect().unwrap();
        assert!(channel.is_connected());

        {
            let links = links.borrow();
            assert_eq!(links.len(), 2);
            assert_eq!(links[0].closes.get(), 1);
            assert_eq!(links[1].closes.get(), 0);
        }

        let event = PushSignal::Event(PushEvent::new(PushEventKind::Result, "{\"id\":1}"));
        broadcast(&links, event.clone());
        assert_eq!(*received.borrow(), vec![event]);
    }

    #[test]
    fn status_follows_signals() {
        let (channel, links, _received) = channel();
        assert_eq!(channel.status(), PushStatus::Disconnected);

        channel.connect().unwrap();
        assert_eq!(channel.status(), PushStatus::Connecting);

        broadcast(&links, PushSignal::Opened);
        assert!(channel.status().is_online());

        broadcast(&links, PushSignal::Error("stream dropped".into()));
        assert_eq!(channel.status(), PushStatus::Error);
    }

    #[test]
    fn disconnect_closes_and_silences() {
        let (channel, links, received) = channel();
        channel.connect().unwrap();

        channel.disconnect();
        channel.disconnect();

        assert_eq!(links.borrow()[0].closes.get(), 1);
        assert!(!channel.is_connected());
        assert_eq!(channel.status(), PushStatus::Disconnected);

        broadcast(&links, PushSignal::Opened);
        assert!(received.borrow().is_empty());
        assert_eq!(channel.status(), PushStatus::Disconnected);
    }

    #[test]
    fn drop_closes_live_connection() {
        let (channel, links, _received) = channel();
        channel.connect().unwrap();
        drop(channel);
        assert_eq!(links.borrow()[0].closes.get(), 1);
    }

    #[test]
    fn refused_connection_reports_error() {
        let mut connector = FakeConnector::default();
        connector.refuse = true;
        let channel = PushChannel::new(connector, "http://b/mcp/sse", |_| {});

        assert!(channel.connect().is_err());
        assert_eq!(channel.status(), PushStatus::Error);
        assert!(!channel.is_connected());
    }

    #[test]
    fn display_lines_match_event_kind() {
        let named = PushEvent::new(PushEventKind::Cancel, "job 4");
        assert_eq!(named.display_line("10:00:00"), "10:00:00: Cancel - job 4");
        assert_eq!(named.log_line(), "SSE cancel event: job 4");

        let plain = PushEvent::new(PushEventKind::Message, "ping");
        assert_eq!(plain.display_line("10:00:01"), "10:00:01: ping");
        assert_eq!(plain.log_line(), "SSE message: ping");
    }
}
