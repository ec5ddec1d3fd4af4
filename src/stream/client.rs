//! Stream client state machine.
//!
//! ```text
//! Connecting --open/first message--> Open
//! Connecting | Open --transport failure--> ClosedError      (terminal)
//! Connecting | Open --teardown--> ClosedByRequest           (terminal)
//! ```
//!
//! Nothing leaves a terminal state. Events handed to a closed client are
//! discarded without touching the store or raising an error.

use crate::error::StreamError;
use crate::frame::Frame;
use crate::store::FrameStore;

use super::{Transport, TransportEvent};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Open,
    ClosedError,
    ClosedByRequest,
}

impl ConnectionState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            ConnectionState::ClosedError | ConnectionState::ClosedByRequest
        )
    }
}

/// What handling one transport event did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Delivery {
    /// A valid frame was installed in the store.
    Applied,
    /// The payload was malformed; the store is unchanged.
    Rejected,
    /// The event carried no frame (connection opened).
    Ignored,
    /// First transport failure; the client is now `ClosedError`.
    ConnectionLost,
    /// The client was already closed; the event had no effect.
    Discarded,
}

/// Counters for the lifetime of one client.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StreamStats {
    pub frames_applied: u64,
    pub frames_rejected: u64,
    pub events_discarded: u64,
}

pub struct StreamClient<T: Transport> {
    transport: T,
    state: ConnectionState,
    stats: StreamStats,
    last_error: Option<StreamError>,
}

impl<T: Transport> StreamClient<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            state: ConnectionState::Connecting,
            stats: StreamStats::default(),
            last_error: None,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn stats(&self) -> StreamStats {
        self.stats
    }

    /// Most recent malformed-frame or transport error.
    pub fn last_error(&self) -> Option<&StreamError> {
        self.last_error.as_ref()
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Pull the next event from the transport. Returns `None` without
    /// touching the transport once the client is closed.
    pub fn next_event(&mut self) -> Option<TransportEvent> {
        if self.state.is_terminal() {
            return None;
        }
        self.transport.recv()
    }

    /// Process one transport event to completion.
    pub fn handle(&mut self, event: TransportEvent, store: &mut FrameStore) -> Delivery {
        if self.state.is_terminal() {
            self.stats.events_discarded += 1;
            log::trace!("discarding {:?} in state {:?}", event, self.state);
            return Delivery::Discarded;
        }

        match event {
            TransportEvent::Opened => {
                self.mark_open();
                Delivery::Ignored
            }
            TransportEvent::Message(payload) => {
                self.mark_open();
                match Frame::parse(&payload) {
                    Ok(frame) => {
                        self.stats.frames_applied += 1;
                        store.replace(frame);
                        Delivery::Applied
                    }
                    Err(e) => {
                        self.stats.frames_rejected += 1;
                        let err = StreamError::MalformedFrame(e);
                        log::warn!("{}; keeping previous frame", err);
                        self.last_error = Some(err);
                        Delivery::Rejected
                    }
                }
            }
            TransportEvent::Failed(reason) => {
                let err = StreamError::Transport(reason);
                log::error!("connection lost: {}", err);
                self.transport.close();
                self.state = ConnectionState::ClosedError;
                self.last_error = Some(err);
                Delivery::ConnectionLost
            }
        }
    }

    /// Close the connection. Returns true if this call closed it.
    pub fn teardown(&mut self) -> bool {
        if self.state.is_terminal() {
            return false;
        }
        self.transport.close();
        self.state = ConnectionState::ClosedByRequest;
        log::info!("stream closed by request");
        true
    }

    fn mark_open(&mut self) {
        if self.state == ConnectionState::Connecting {
            self.state = ConnectionState::Open;
            log::info!("stream open");
        }
    }
}
