//! `text/event-stream` over HTTP.
//!
//! The request and all body reads happen on a dedicated reader thread, so
//! the processing thread never blocks on the network; it only waits on the
//! event channel. The reader decodes the body and forwards one
//! `TransportEvent` per message. Any connect error, a non-2xx status, a wrong
//! content type, a read error and end of body are all reported as
//! `TransportEvent::Failed`, as is an event-stream line over the decoder's
//! length limit. There is no reconnect.

use anyhow::{anyhow, Context, Result};
use std::io::Read;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use url::Url;

use super::sse::SseDecoder;
use super::{ChannelTransport, Transport, TransportEvent, TransportFeed};

const EVENT_STREAM: &str = "text/event-stream";
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const READ_CHUNK: usize = 8192;

pub struct HttpTransport {
    endpoint: String,
    channel: ChannelTransport,
    closed: Arc<AtomicBool>,
}

impl HttpTransport {
    /// Validate `endpoint` and start connecting in the background.
    ///
    /// Returns once the reader thread is running; the outcome of the
    /// connection attempt arrives as the first transport event.
    pub fn connect(endpoint: &str) -> Result<Self> {
        let url = Url::parse(endpoint).with_context(|| format!("parse stream url {endpoint}"))?;
        match url.scheme() {
            "http" | "https" => {}
            other => {
                return Err(anyhow!(
                    "unsupported stream scheme '{}'; expected http(s)",
                    other
                ))
            }
        }

        let (feed, channel) = ChannelTransport::new();
        let closed = Arc::new(AtomicBool::new(false));
        let reader_closed = Arc::clone(&closed);
        let reader_url = url.to_string();
        thread::Builder::new()
            .name("event-stream-reader".to_string())
            .spawn(move || run_reader(&reader_url, &feed, &reader_closed))
            .context("spawn event-stream reader")?;

        log::info!("connecting to {}", url);
        Ok(Self {
            endpoint: url.to_string(),
            channel,
            closed,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Feed for the same event channel; `interrupt()` on it stops a pump.
    pub fn feed(&self) -> TransportFeed {
        self.channel.feed()
    }
}

impl Transport for HttpTransport {
    fn recv(&mut self) -> Option<TransportEvent> {
        self.channel.recv()
    }

    fn close(&mut self) {
        if !self.closed.swap(true, Ordering::AcqRel) {
            log::debug!("closing event stream {}", self.endpoint);
        }
        self.channel.close();
    }
}

impl Drop for HttpTransport {
    fn drop(&mut self) {
        self.close();
    }
}

fn open_stream(url: &str) -> Result<ureq::Response> {
    let agent = ureq::AgentBuilder::new()
        .timeout_connect(CONNECT_TIMEOUT)
        .build();
    let response = agent
        .get(url)
        .set("Accept", EVENT_STREAM)
        .set("Cache-Control", "no-cache")
        .call()
        .context("connect to event stream")?;
    let content_type = response.content_type().to_lowercase();
    if content_type != EVENT_STREAM {
        return Err(anyhow!(
            "unexpected content type '{}'; expected {}",
            content_type,
            EVENT_STREAM
        ));
    }
    Ok(response)
}

fn run_reader(url: &str, feed: &TransportFeed, closed: &AtomicBool) {
    let response = match open_stream(url) {
        Ok(response) => response,
        Err(e) => {
            feed.push(TransportEvent::Failed(format!("{e:#}")));
            return;
        }
    };
    if !feed.push(TransportEvent::Opened) {
        return;
    }

    let mut body = response.into_reader();
    let mut decoder = SseDecoder::new();
    let mut chunk = vec![0u8; READ_CHUNK];
    loop {
        let read = match body.read(&mut chunk) {
            Ok(0) => {
                feed.push(TransportEvent::Failed("event stream ended".to_string()));
                return;
            }
            Ok(read) => read,
            Err(e) => {
                feed.push(TransportEvent::Failed(format!("read event stream: {e}")));
                return;
            }
        };
        if closed.load(Ordering::Acquire) {
            return;
        }

        let events = match decoder.feed(&chunk[..read]) {
            Ok(events) => events,
            Err(e) => {
                feed.push(TransportEvent::Failed(e.to_string()));
                return;
            }
        };
        for event in events {
            if !event.is_message() {
                log::debug!("skipping '{}' event", event.event);
                continue;
            }
            if !feed.push(TransportEvent::Message(event.data)) {
                return;
            }
        }
    }
}
