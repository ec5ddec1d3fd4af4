//! Push-stream client and transports.
//!
//! A transport delivers `TransportEvent`s one at a time to the processing
//! thread; the `StreamClient` turns them into frame store updates.
//!
//! - `ChannelTransport`: in-process channel, fed through a `TransportFeed`.
//! - `HttpTransport`: one long-lived `text/event-stream` GET request.

pub mod client;
mod http;
pub mod sse;

use std::sync::mpsc::{channel, Receiver, Sender};

pub use client::{ConnectionState, Delivery, StreamClient, StreamStats};
pub use http::HttpTransport;
pub use sse::{LineTooLong, SseDecoder, SseEvent};

/// Something that happened on the push connection.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TransportEvent {
    /// The connection is established.
    Opened,
    /// One message body.
    Message(String),
    /// The connection failed or ended.
    Failed(String),
}

/// Source of transport events for a `StreamClient`.
pub trait Transport {
    /// Wait for the next event. `None` means the host interrupted the wait
    /// and no further events should be pulled.
    fn recv(&mut self) -> Option<TransportEvent>;

    /// Close the underlying connection. Must be safe to call more than once.
    fn close(&mut self);
}

enum Inbound {
    Event(TransportEvent),
    Interrupt,
}

/// Transport backed by an in-process channel.
pub struct ChannelTransport {
    rx: Option<Receiver<Inbound>>,
    tx: Sender<Inbound>,
}

/// Sending half of a `ChannelTransport`. Cheap to clone.
#[derive(Clone)]
pub struct TransportFeed {
    tx: Sender<Inbound>,
}

impl TransportFeed {
    /// Queue an event. Returns false once the transport is closed.
    pub fn push(&self, event: TransportEvent) -> bool {
        self.tx.send(Inbound::Event(event)).is_ok()
    }

    /// Wake the consumer and make its pending `recv` return `None`.
    pub fn interrupt(&self) -> bool {
        self.tx.send(Inbound::Interrupt).is_ok()
    }
}

impl ChannelTransport {
    pub fn new() -> (TransportFeed, Self) {
        let (tx, rx) = channel();
        let feed = TransportFeed { tx: tx.clone() };
        (feed, Self { rx: Some(rx), tx })
    }

    /// Another feed for the same channel, e.g. for a signal handler.
    pub fn feed(&self) -> TransportFeed {
        TransportFeed {
            tx: self.tx.clone(),
        }
    }

    pub fn is_closed(&self) -> bool {
        self.rx.is_none()
    }
}

impl Transport for ChannelTransport {
    fn recv(&mut self) -> Option<TransportEvent> {
        match self.rx.as_ref()?.recv() {
            Ok(Inbound::Event(event)) => Some(event),
            Ok(Inbound::Interrupt) | Err(_) => None,
        }
    }

    fn close(&mut self) {
        // Dropping the receiver makes every later push fail.
        self.rx = None;
    }
}
