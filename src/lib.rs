//! Live detection overlay.
//!
//! This crate consumes a push stream of object-detection results, one frame
//! per message, and renders the latest frame onto a drawing surface.
//!
//! # Architecture
//!
//! ```text
//! transport -> StreamClient -> FrameStore -> Renderer (surface)
//!                                        \-> host subscribers
//! ```
//!
//! All processing happens on one thread: each transport event is handled to
//! completion (parse, validate, replace, notify, draw) before the next one is
//! pulled. The store has a single writer, so no locking is involved.
//!
//! # Module Structure
//!
//! - `frame`: Frame model and validation
//! - `stream`: Stream client state machine, SSE decoding, transports
//! - `store`: Single current frame with synchronous subscribers
//! - `render`: Clear-and-redraw renderer and the `Surface` trait
//! - `surface`: Recording and raster surfaces
//! - `pipeline`: Lifecycle coordinator (activate / teardown)
//! - `present`: Text listing for operators
//! - `config`: Host-side viewer configuration

pub mod config;
pub mod error;
pub mod frame;
pub mod pipeline;
pub mod present;
pub mod render;
pub mod store;
pub mod stream;
pub mod surface;

pub use error::{FrameError, StreamError};
pub use frame::{BoundingBox, Detection, DetectorResult, Frame, Point};
pub use pipeline::{activate, Pipeline, PumpExit};
pub use render::{draw, Surface, SURFACE_HEIGHT, SURFACE_WIDTH};
pub use store::{FrameStore, SubscriptionId};
pub use stream::{
    ChannelTransport, ConnectionState, Delivery, HttpTransport, StreamClient, Transport,
    TransportEvent, TransportFeed,
};
pub use surface::{DrawOp, RasterSurface, RecordingSurface};
