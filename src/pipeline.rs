//! Lifecycle coordinator.
//!
//! `activate` wires stream client -> frame store -> renderer and hands back a
//! `Pipeline`, which is the teardown handle. Teardown order:
//!
//! 1. close the stream client, so no further `replace` can happen
//! 2. unsubscribe the renderer
//! 3. release the surface reference
//!
//! Teardown is idempotent and also runs on drop.

use anyhow::Result;
use std::cell::RefCell;
use std::rc::Rc;

use crate::error::StreamError;
use crate::frame::Frame;
use crate::render::{self, Surface};
use crate::store::{FrameStore, SubscriptionId};
use crate::stream::{
    ConnectionState, Delivery, HttpTransport, StreamClient, Transport, TransportEvent,
    TransportFeed,
};

/// Why `Pipeline::pump` returned.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PumpExit {
    /// The transport failed; the client is in `ClosedError`.
    ConnectionLost,
    /// The host interrupted the transport.
    Interrupted,
    /// The pipeline was torn down.
    TornDown,
}

type ConnectionLostHook = Box<dyn FnMut(&StreamError)>;

pub struct Pipeline<T: Transport, S: Surface + 'static> {
    client: StreamClient<T>,
    store: FrameStore,
    renderer: Option<SubscriptionId>,
    surface: Option<Rc<RefCell<S>>>,
    on_connection_lost: Option<ConnectionLostHook>,
    torn_down: bool,
}

/// Connect to `endpoint` and render every frame it pushes onto `surface`.
pub fn activate<S: Surface + 'static>(
    endpoint: &str,
    surface: Rc<RefCell<S>>,
) -> Result<Pipeline<HttpTransport, S>> {
    let transport = HttpTransport::connect(endpoint)?;
    Ok(Pipeline::with_transport(transport, surface))
}

impl<S: Surface + 'static> Pipeline<HttpTransport, S> {
    /// Feed whose `interrupt()` makes a running `pump` return.
    pub fn interrupter(&self) -> TransportFeed {
        self.client.transport().feed()
    }
}

impl<T: Transport, S: Surface + 'static> Pipeline<T, S> {
    /// Wire an already-constructed transport.
    pub fn with_transport(transport: T, surface: Rc<RefCell<S>>) -> Self {
        let mut store = FrameStore::new();
        let target = Rc::clone(&surface);
        let renderer = store.subscribe(move |frame| match target.try_borrow_mut() {
            Ok(mut surface) => render::draw(frame, &mut *surface),
            Err(_) => log::warn!("surface is borrowed elsewhere; frame not drawn"),
        });

        Self {
            client: StreamClient::new(transport),
            store,
            renderer: Some(renderer),
            surface: Some(surface),
            on_connection_lost: None,
            torn_down: false,
        }
    }

    /// Called once, with the transport error, when the connection is lost.
    pub fn on_connection_lost<F>(&mut self, hook: F)
    where
        F: FnMut(&StreamError) + 'static,
    {
        self.on_connection_lost = Some(Box::new(hook));
    }

    /// Register an extra store subscriber; it runs after the renderer.
    pub fn subscribe<F>(&mut self, subscriber: F) -> SubscriptionId
    where
        F: FnMut(&Frame) + 'static,
    {
        self.store.subscribe(subscriber)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.store.unsubscribe(id)
    }

    pub fn current(&self) -> Rc<Frame> {
        self.store.current()
    }

    pub fn state(&self) -> ConnectionState {
        self.client.state()
    }

    pub fn client(&self) -> &StreamClient<T> {
        &self.client
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }

    /// Process exactly one transport event.
    pub fn deliver(&mut self, event: TransportEvent) -> Delivery {
        let delivery = self.client.handle(event, &mut self.store);
        if delivery == Delivery::ConnectionLost {
            if let (Some(hook), Some(err)) =
                (self.on_connection_lost.as_mut(), self.client.last_error())
            {
                hook(err);
            }
        }
        delivery
    }

    /// Process events one at a time until the stream ends or is interrupted.
    pub fn pump(&mut self) -> PumpExit {
        loop {
            if self.torn_down {
                return PumpExit::TornDown;
            }
            if self.client.state() == ConnectionState::ClosedError {
                return PumpExit::ConnectionLost;
            }
            let Some(event) = self.client.next_event() else {
                return PumpExit::Interrupted;
            };
            if self.deliver(event) == Delivery::ConnectionLost {
                return PumpExit::ConnectionLost;
            }
        }
    }

    /// Tear the pipeline down. Returns false if it was already torn down.
    pub fn teardown(&mut self) -> bool {
        if self.torn_down {
            return false;
        }
        self.torn_down = true;
        self.client.teardown();
        if let Some(id) = self.renderer.take() {
            self.store.unsubscribe(id);
        }
        self.surface = None;
        self.on_connection_lost = None;
        let stats = self.client.stats();
        log::info!(
            "pipeline torn down: {} frame(s) applied, {} rejected",
            stats.frames_applied,
            stats.frames_rejected
        );
        true
    }
}

impl<T: Transport, S: Surface + 'static> Drop for Pipeline<T, S> {
    fn drop(&mut self) {
        self.teardown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::ChannelTransport;
    use crate::surface::RecordingSurface;

    fn pipeline() -> (
        TransportFeed,
        Rc<RefCell<RecordingSurface>>,
        Pipeline<ChannelTransport, RecordingSurface>,
    ) {
        let (feed, transport) = ChannelTransport::new();
        let surface = Rc::new(RefCell::new(RecordingSurface::new(640, 480)));
        let pipeline = Pipeline::with_transport(transport, Rc::clone(&surface));
        (feed, surface, pipeline)
    }

    #[test]
    fn teardown_releases_surface_reference() {
        let (_feed, surface, mut pipeline) = pipeline();
        assert_eq!(Rc::strong_count(&surface), 3);
        assert!(pipeline.teardown());
        assert_eq!(Rc::strong_count(&surface), 1);
        assert!(!pipeline.teardown());
        assert_eq!(pipeline.state(), ConnectionState::ClosedByRequest);
    }

    #[test]
    fn drop_tears_down() {
        let (feed, surface, pipeline) = pipeline();
        drop(pipeline);
        assert_eq!(Rc::strong_count(&surface), 1);
        assert!(!feed.push(TransportEvent::Opened));
    }

    #[test]
    fn pump_stops_on_interrupt() {
        let (feed, surface, mut pipeline) = pipeline();
        feed.push(TransportEvent::Opened);
        feed.push(TransportEvent::Message("[]".into()));
        feed.interrupt();
        assert_eq!(pipeline.pump(), PumpExit::Interrupted);
        assert_eq!(surface.borrow().total_clears(), 1);
        assert_eq!(pipeline.state(), ConnectionState::Open);
    }

    #[test]
    fn pump_after_teardown_returns_immediately() {
        let (_feed, _surface, mut pipeline) = pipeline();
        pipeline.teardown();
        assert_eq!(pipeline.pump(), PumpExit::TornDown);
    }

    #[test]
    fn busy_surface_skips_draw_without_failing() {
        let (_feed, surface, mut pipeline) = pipeline();
        let guard = surface.borrow();
        assert_eq!(
            pipeline.deliver(TransportEvent::Message("[]".into())),
            Delivery::Applied
        );
        drop(guard);
        assert_eq!(surface.borrow().total_clears(), 0);
    }
}
